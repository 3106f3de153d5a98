use std::fmt;

use bincode::{config::standard, serde::decode_from_slice};
use rand::{rng, seq::SliceRandom};

use crate::{net::ServerNetworkHandle, state::Game};
use common::{net::AppChannel, protocol::ClientMessage};

const MAX_MOVES_PER_CLIENT_PER_TICK: u32 = 32;
const MAX_OVER_CAP_STRIKES: u8 = 8;

/// Drain every pending client move and feed it to that vehicle's authority.
/// Rejected moves are logged and dropped; the canonical state only advances
/// on acceptance.
pub fn receive_moves(network: &mut dyn ServerNetworkHandle, game: &mut Game, world_now: f64) {
    let mut client_ids = network.clients_id();

    // If the server is flooded, randomizing the order spreads the pain
    // instead of always starving the same player.
    client_ids.shuffle(&mut rng());

    for client_id in client_ids {
        if !game.vehicles.contains_key(&client_id) {
            eprintln!("client {client_id} connected but has no vehicle yet; skipping");
            continue;
        }

        let mut moves_this_client: u32 = 0;
        let mut disconnect = false;

        while let Some(data) = network.receive_message(client_id, AppChannel::ReliableOrdered) {
            moves_this_client += 1;

            if moves_this_client > MAX_MOVES_PER_CLIENT_PER_TICK {
                let vehicle = game
                    .vehicles
                    .get_mut(&client_id)
                    .expect("vehicle checked above");

                // One strike the first time the cap trips this tick.
                if moves_this_client == MAX_MOVES_PER_CLIENT_PER_TICK + 1 {
                    vehicle.over_cap_strikes += 1;
                    if vehicle.over_cap_strikes >= MAX_OVER_CAP_STRIKES {
                        eprintln!(
                            "client {client_id} repeatedly exceeded the move limit; disconnecting them"
                        );
                        disconnect = true;
                        break;
                    }
                    println!(
                        "client {client_id} exceeded the per-tick move limit; discarding the rest"
                    );
                }
                continue;
            }

            let mv = match decode_message(&data) {
                Ok(ClientMessage::Drive(mv)) => mv,
                Err(error) => {
                    eprintln!("client {client_id} {error}; disconnecting them");
                    disconnect = true;
                    break;
                }
            };

            let vehicle = game
                .vehicles
                .get_mut(&client_id)
                .expect("vehicle checked above");
            if let Err(rejection) =
                vehicle
                    .authority
                    .receive_move(mv, world_now, &game.config, &game.walls)
            {
                // Suspected cheat or bad clock; visible in the log but not
                // fatal on its own.
                println!("{}", rejection.message(client_id));
            }
        }

        if disconnect {
            network.disconnect(client_id);
            game.remove_client(network, client_id);
            continue;
        }

        // Forgive one strike for each tick spent under the cap.
        if moves_this_client <= MAX_MOVES_PER_CLIENT_PER_TICK {
            if let Some(vehicle) = game.vehicles.get_mut(&client_id) {
                if vehicle.over_cap_strikes > 0 {
                    vehicle.over_cap_strikes -= 1;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputError {
    Malformed,
}

impl fmt::Display for InputError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Malformed => formatter.write_str("sent malformed data"),
        }
    }
}

impl std::error::Error for InputError {}

fn decode_message(data: &[u8]) -> Result<ClientMessage, InputError> {
    decode_from_slice::<ClientMessage, _>(data, standard())
        .map(|(message, _)| message)
        .map_err(|_| InputError::Malformed)
}

#[cfg(test)]
mod tests {
    use bincode::serde::encode_to_vec;

    use super::*;
    use crate::test_helpers::MockServerNetwork;
    use common::sim::create_move;

    fn encoded_drive(dt: f32, throttle: f32, steering: f32, timestamp: f64) -> Vec<u8> {
        let message = ClientMessage::Drive(create_move(dt, throttle, steering, timestamp));
        encode_to_vec(&message, standard()).expect("encode Drive")
    }

    fn game_with_client(network: &mut MockServerNetwork, client_id: u64) -> Game {
        network.add_client(client_id);
        let mut game = Game::new(0.0);
        game.register_connection(network, client_id, 0.0);
        game
    }

    #[test]
    fn accepted_move_advances_the_vehicle() {
        let mut network = MockServerNetwork::new();
        let mut game = game_with_client(&mut network, 3);
        let spawn = *game.vehicles[&3].authority.state();

        network.queue_raw_message(3, encoded_drive(0.016, 1.0, 0.0, 0.016));
        receive_moves(&mut network, &mut game, 1.0);

        assert_ne!(*game.vehicles[&3].authority.state(), spawn);
    }

    #[test]
    fn rejected_move_leaves_the_vehicle_alone() {
        let mut network = MockServerNetwork::new();
        let mut game = game_with_client(&mut network, 3);
        let spawn = *game.vehicles[&3].authority.state();

        // Inflated delta time: more simulated time than has elapsed.
        network.queue_raw_message(3, encoded_drive(5.0, 1.0, 0.0, 5.0));
        receive_moves(&mut network, &mut game, 1.0);

        assert_eq!(*game.vehicles[&3].authority.state(), spawn);
        assert_eq!(game.vehicles[&3].authority.rejections(), 1);
    }

    #[test]
    fn malformed_payload_disconnects_the_client() {
        let mut network = MockServerNetwork::new();
        let mut game = game_with_client(&mut network, 3);

        network.queue_raw_message(3, vec![0xff, 0xff, 0xff]);
        receive_moves(&mut network, &mut game, 1.0);

        assert!(network.disconnected_clients.contains(&3));
        assert!(!game.vehicles.contains_key(&3));
    }

    #[test]
    fn moves_past_the_cap_are_discarded_not_simulated() {
        let mut network = MockServerNetwork::new();
        let mut game = game_with_client(&mut network, 3);
        let spawn = *game.vehicles[&3].authority.state();

        for i in 0..(MAX_MOVES_PER_CLIENT_PER_TICK + 20) {
            network.queue_raw_message(3, encoded_drive(0.001, 1.0, 0.0, 0.001 * i as f64));
        }
        receive_moves(&mut network, &mut game, 10.0);

        // Still connected (one strike is not enough), and the kart moved.
        assert!(!network.disconnected_clients.contains(&3));
        assert_ne!(*game.vehicles[&3].authority.state(), spawn);
        assert_eq!(game.vehicles[&3].over_cap_strikes, 1);
    }
}
