use serde::{Deserialize, Serialize};

use crate::sim::{Move, VehicleState};

/// One atomic authoritative update: the canonical state together with the
/// move that produced it. Consumers must never observe the state without
/// its matching move, so the pair travels as a single message.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedState {
    pub state: VehicleState,
    pub last_move: Move,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpawn {
    pub vehicle_id: u64,
    pub state: VehicleState,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum ServerMessage {
    Welcome {
        vehicle_id: u64,
        spawn: VehicleState,
        roster: Vec<VehicleSpawn>,
    },
    VehicleJoined(VehicleSpawn),
    VehicleLeft {
        vehicle_id: u64,
    },
    State {
        vehicle_id: u64,
        update: ReplicatedState,
    },
    ServerTime(f64),
}

impl ServerMessage {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "Welcome",
            Self::VehicleJoined(_) => "VehicleJoined",
            Self::VehicleLeft { .. } => "VehicleLeft",
            Self::State { .. } => "State",
            Self::ServerTime(_) => "ServerTime",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum ClientMessage {
    Drive(Move),
}

pub fn version() -> u64 {
    env!("CARGO_PKG_VERSION")
        .split('.')
        .next()
        .expect("failed to get major version")
        .parse()
        .expect("failed to parse major version")
}
