use std::collections::HashMap;

use bincode::{config::standard, serde::encode_to_vec};
use glam::Vec3;

use crate::{authority::VehicleAuthority, net::ServerNetworkHandle};
use common::{
    constants::{ARENA_HALF_EXTENT, PACE_KART_ID, TICKS_PER_BROADCAST},
    motion::ArenaWalls,
    net::AppChannel,
    protocol::{ServerMessage, VehicleSpawn},
    role::{Conduct, Role, conduct},
    sim::{VehicleConfig, VehicleState, create_move},
    time::TICK_SECS,
};

pub struct ServerVehicle {
    pub authority: VehicleAuthority,
    /// What the owning peer is, seen from the server: AutonomousProxy for a
    /// player's kart, SimulatedProxy for the server-driven pace kart.
    pub remote_role: Role,
    pub over_cap_strikes: u8,
    /// Start-line slot, freed when the vehicle leaves. Server-driven karts
    /// park off the grid.
    lane: Option<usize>,
}

/// The whole authoritative world: one `VehicleAuthority` per vehicle, all
/// sharing the same tuning and the same arena walls. The server is the
/// single writer of everything in here.
pub struct Game {
    pub vehicles: HashMap<u64, ServerVehicle>,
    pub config: VehicleConfig,
    pub walls: ArenaWalls,
    pub current_tick: u64,
}

impl Game {
    pub fn new(now: f64) -> Self {
        let mut game = Self {
            vehicles: HashMap::new(),
            config: VehicleConfig::default(),
            walls: ArenaWalls::default(),
            current_tick: 0,
        };

        // The pace kart exists from the start and is driven by the server
        // itself; clients only ever interpolate it.
        game.vehicles.insert(
            PACE_KART_ID,
            ServerVehicle {
                authority: VehicleAuthority::new(VehicleState::at(Vec3::ZERO), now),
                remote_role: Role::SimulatedProxy,
                over_cap_strikes: 0,
                lane: None,
            },
        );

        game
    }

    /// Spawn a vehicle for a newly connected client: welcome them with the
    /// current roster, and announce the newcomer to everyone else.
    pub fn register_connection(
        &mut self,
        network: &mut dyn ServerNetworkHandle,
        client_id: u64,
        now: f64,
    ) {
        let lane = self.free_lane();
        let spawn = spawn_point(lane);

        let roster: Vec<VehicleSpawn> = self
            .vehicles
            .iter()
            .map(|(&vehicle_id, vehicle)| VehicleSpawn {
                vehicle_id,
                state: *vehicle.authority.state(),
            })
            .collect();

        self.vehicles.insert(
            client_id,
            ServerVehicle {
                authority: VehicleAuthority::new(spawn, now),
                remote_role: Role::AutonomousProxy,
                over_cap_strikes: 0,
                lane: Some(lane),
            },
        );

        let welcome = ServerMessage::Welcome {
            vehicle_id: client_id,
            spawn,
            roster,
        };
        let payload = encode_to_vec(&welcome, standard()).expect("failed to serialize Welcome");
        network.send_message(client_id, AppChannel::ReliableOrdered, payload);

        let joined = ServerMessage::VehicleJoined(VehicleSpawn {
            vehicle_id: client_id,
            state: spawn,
        });
        let payload = encode_to_vec(&joined, standard()).expect("failed to serialize VehicleJoined");
        network.broadcast_message_except(client_id, AppChannel::ReliableOrdered, payload);
    }

    pub fn remove_client(&mut self, network: &mut dyn ServerNetworkHandle, client_id: u64) {
        if self.vehicles.remove(&client_id).is_none() {
            return;
        }

        let message = ServerMessage::VehicleLeft {
            vehicle_id: client_id,
        };
        let payload = encode_to_vec(&message, standard()).expect("failed to serialize VehicleLeft");
        network.broadcast_message(AppChannel::ReliableOrdered, payload);
    }

    /// One fixed simulation step: drive the server-owned vehicles, then
    /// republish canonical state at the broadcast cadence. Client-owned
    /// vehicles advance only when their moves arrive (see `input`).
    pub fn tick(&mut self, network: &mut dyn ServerNetworkHandle, now: f64) {
        self.drive_server_vehicles(now);

        if self.current_tick % TICKS_PER_BROADCAST == 0 {
            self.broadcast_states(network);
        }

        self.current_tick += 1;
    }

    /// Advance the vehicles the server drives itself. Client-owned
    /// vehicles (ValidateAndReplicate) advance in `input` when their moves
    /// arrive instead.
    fn drive_server_vehicles(&mut self, now: f64) {
        // A gentle weave around the arena. Input is generated from the
        // server clock; the simulation step itself stays pure.
        let steering = (now * 0.25).sin() as f32 * 0.8;

        for vehicle in self.vehicles.values_mut() {
            if conduct(Role::Authority, vehicle.remote_role) != Conduct::DriveAndReplicate {
                continue;
            }
            let mv = create_move(TICK_SECS, 0.6, steering, now);
            vehicle.authority.drive_local(mv, &self.config, &self.walls);
        }
    }

    fn broadcast_states(&mut self, network: &mut dyn ServerNetworkHandle) {
        for (&vehicle_id, vehicle) in &self.vehicles {
            let Some(update) = vehicle.authority.replicated() else {
                continue;
            };

            let message = ServerMessage::State { vehicle_id, update };
            let payload = encode_to_vec(&message, standard()).expect("failed to serialize State");
            network.broadcast_message(AppChannel::Unreliable, payload);
        }
    }

    /// Lowest start-line slot no connected vehicle holds. Lanes free up on
    /// disconnect, so a rejoiner never lands on top of someone.
    fn free_lane(&self) -> usize {
        let mut lane = 0;
        while self.vehicles.values().any(|vehicle| vehicle.lane == Some(lane)) {
            lane += 1;
        }
        lane
    }
}

/// Spawn slots along the start line, spaced so karts don't overlap.
fn spawn_point(lane: usize) -> VehicleState {
    let offset = lane as f32 * 6.0 - ARENA_HALF_EXTENT * 0.5;
    VehicleState::at(Vec3::new(offset, 0.0, -ARENA_HALF_EXTENT * 0.5))
}

#[cfg(test)]
mod tests {
    use bincode::serde::decode_from_slice;

    use super::*;
    use crate::test_helpers::MockServerNetwork;

    #[test]
    fn register_connection_welcomes_and_announces() {
        let mut network = MockServerNetwork::new();
        network.add_client(7);
        let mut game = Game::new(10.0);

        game.register_connection(&mut network, 7, 10.0);

        let sent = network.get_sent_messages_data(7);
        assert_eq!(sent.len(), 1);
        let (message, _) =
            decode_from_slice::<ServerMessage, _>(&sent[0], standard()).expect("decode Welcome");
        match message {
            ServerMessage::Welcome {
                vehicle_id, roster, ..
            } => {
                assert_eq!(vehicle_id, 7);
                // The pace kart is already on the roster.
                assert_eq!(roster.len(), 1);
                assert_eq!(roster[0].vehicle_id, PACE_KART_ID);
            }
            other => panic!("expected Welcome, got {:?}", other.variant_name()),
        }
    }

    #[test]
    fn pace_kart_state_is_broadcast_on_cadence() {
        let mut network = MockServerNetwork::new();
        let mut game = Game::new(0.0);

        // Tick 0 broadcasts; the pace kart has a move by then.
        game.tick(&mut network, 1.0);

        let broadcasts = network.get_broadcast_messages_data();
        assert_eq!(broadcasts.len(), 1);
        let (message, _) =
            decode_from_slice::<ServerMessage, _>(&broadcasts[0], standard()).expect("decode");
        match message {
            ServerMessage::State { vehicle_id, update } => {
                assert_eq!(vehicle_id, PACE_KART_ID);
                assert_eq!(update.last_move.throttle, 0.6);
            }
            other => panic!("expected State, got {:?}", other.variant_name()),
        }
    }

    #[test]
    fn broadcast_skips_ticks_between_cadence_points() {
        let mut network = MockServerNetwork::new();
        let mut game = Game::new(0.0);

        for tick in 0..TICKS_PER_BROADCAST {
            game.tick(&mut network, 1.0 + tick as f64 * TICK_SECS as f64);
        }

        // Only tick 0 falls on the cadence within one broadcast window.
        assert_eq!(network.get_broadcast_messages_data().len(), 1);
    }

    #[test]
    fn server_drives_only_vehicles_without_an_input_owner() {
        let mut network = MockServerNetwork::new();
        network.add_client(7);
        let mut game = Game::new(0.0);
        game.register_connection(&mut network, 7, 0.0);
        let spawn = *game.vehicles[&7].authority.state();

        game.tick(&mut network, 1.0);

        // The pace kart moved; the client-owned kart waits for its moves.
        assert!(game.vehicles[&PACE_KART_ID].authority.replicated().is_some());
        assert_eq!(*game.vehicles[&7].authority.state(), spawn);
        assert!(game.vehicles[&7].authority.replicated().is_none());
    }

    #[test]
    fn freed_spawn_lane_is_reused_and_occupied_lanes_are_not() {
        let mut network = MockServerNetwork::new();
        network.add_client(7);
        network.add_client(8);
        network.add_client(9);
        let mut game = Game::new(0.0);
        game.register_connection(&mut network, 7, 0.0);
        game.register_connection(&mut network, 8, 0.0);
        let first_spawn = *game.vehicles[&7].authority.state();
        let second_spawn = *game.vehicles[&8].authority.state();

        game.remove_client(&mut network, 7);
        game.register_connection(&mut network, 9, 0.0);

        let third_spawn = *game.vehicles[&9].authority.state();
        assert_eq!(third_spawn.position, first_spawn.position);
        assert_ne!(third_spawn.position, second_spawn.position);
    }

    #[test]
    fn remove_client_announces_departure() {
        let mut network = MockServerNetwork::new();
        network.add_client(7);
        let mut game = Game::new(0.0);
        game.register_connection(&mut network, 7, 0.0);

        game.remove_client(&mut network, 7);

        let broadcasts = network.get_broadcast_messages_data();
        let (message, _) = decode_from_slice::<ServerMessage, _>(
            broadcasts.last().expect("a broadcast"),
            standard(),
        )
        .expect("decode");
        assert_eq!(message, ServerMessage::VehicleLeft { vehicle_id: 7 });
    }
}
