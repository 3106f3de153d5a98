use serde::{Deserialize, Serialize};

/// The authority relationship of a peer to a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// This peer owns the canonical state (the server).
    Authority,
    /// This peer owns the input and predicts locally.
    AutonomousProxy,
    /// This peer only observes and interpolates.
    SimulatedProxy,
    /// The vehicle does not exist on this peer.
    None,
}

/// What a peer should actually do for a vehicle each tick, derived from its
/// own role and the role its counterpart holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conduct {
    /// Feed local input straight into the simulator, buffer the move, send
    /// it to the server, replay on correction.
    PredictLocally,
    /// Generate moves from the local input source, simulate them, and
    /// republish canonical state (the server driving its own vehicle).
    DriveAndReplicate,
    /// Validate moves supplied by the input-owning client, simulate the
    /// accepted ones, and republish canonical state.
    ValidateAndReplicate,
    /// Smooth between the last two authoritative states; never simulate
    /// from input.
    Interpolate,
    /// Nothing to do.
    Idle,
}

pub fn conduct(role: Role, remote_role: Role) -> Conduct {
    match (role, remote_role) {
        (Role::Authority, Role::AutonomousProxy) => Conduct::ValidateAndReplicate,
        (Role::Authority, _) => Conduct::DriveAndReplicate,
        (Role::AutonomousProxy, _) => Conduct::PredictLocally,
        (Role::SimulatedProxy, _) => Conduct::Interpolate,
        (Role::None, _) => Conduct::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_validates_when_a_client_owns_the_input() {
        assert_eq!(
            conduct(Role::Authority, Role::AutonomousProxy),
            Conduct::ValidateAndReplicate
        );
    }

    #[test]
    fn authority_drives_when_no_remote_peer_owns_the_input() {
        assert_eq!(
            conduct(Role::Authority, Role::SimulatedProxy),
            Conduct::DriveAndReplicate
        );
        assert_eq!(conduct(Role::Authority, Role::None), Conduct::DriveAndReplicate);
    }

    #[test]
    fn input_owner_predicts_and_observer_interpolates() {
        assert_eq!(
            conduct(Role::AutonomousProxy, Role::Authority),
            Conduct::PredictLocally
        );
        assert_eq!(
            conduct(Role::SimulatedProxy, Role::Authority),
            Conduct::Interpolate
        );
    }
}
