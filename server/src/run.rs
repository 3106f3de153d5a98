use std::{
    net::{SocketAddr, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use bincode::{config::standard, serde::encode_to_vec};
use renet::RenetServer;
use renet_netcode::NetcodeServerTransport;

use crate::{
    input,
    net::{self, RenetServerNetworkHandle, ServerNetworkEvent, ServerNetworkHandle},
    state::Game,
};
use common::{
    self,
    constants::CLOCK_SYNC_INTERVAL_MILLIS,
    net::AppChannel,
    protocol::ServerMessage,
    time::{self, TICK_MICROS},
};

pub fn run_server(socket: UdpSocket, server_addr: SocketAddr, private_key: [u8; 32]) {
    let current_time = time::now();
    let protocol_id = common::protocol::version();

    let server_config =
        net::build_server_config(current_time, protocol_id, server_addr, private_key);
    let mut transport =
        NetcodeServerTransport::new(server_config, socket).expect("failed to create transport");
    let connection_config = common::net::connection_config();
    let mut server = RenetServer::new(connection_config);
    let mut game = Game::new(time::now_as_secs_f64());

    print_server_banner(protocol_id, server_addr);
    server_loop(&mut server, &mut transport, &mut game);
}

fn print_server_banner(protocol_id: u64, server_addr: SocketAddr) {
    println!("  Game version:   {}", protocol_id);
    println!("  Server address: {}", server_addr);
}

fn server_loop(server: &mut RenetServer, transport: &mut NetcodeServerTransport, game: &mut Game) {
    let mut last_updated = Instant::now();
    let mut last_sync_time = Instant::now();
    let sync_interval = Duration::from_millis(CLOCK_SYNC_INTERVAL_MILLIS);

    loop {
        let now = Instant::now();
        let duration = now - last_updated;
        last_updated = now;

        transport
            .update(duration, server)
            .expect("failed to update transport");
        server.update(duration);

        let mut network_handle = RenetServerNetworkHandle { server };

        if now.duration_since(last_sync_time) > sync_interval {
            sync_clocks(&mut network_handle);
            last_sync_time = now;
        }

        update_game(&mut network_handle, game, time::now_as_secs_f64());

        transport.send_packets(server);
        thread::sleep(Duration::from_micros(TICK_MICROS));
    }
}

/// One server tick: connection events, then pending moves, then the fixed
/// simulation step with its broadcast cadence.
pub fn update_game(network: &mut dyn ServerNetworkHandle, game: &mut Game, world_now: f64) {
    process_events(network, game, world_now);
    input::receive_moves(network, game, world_now);
    game.tick(network, world_now);
}

pub fn process_events(network: &mut dyn ServerNetworkHandle, game: &mut Game, world_now: f64) {
    while let Some(event) = network.get_event() {
        match event {
            ServerNetworkEvent::ClientConnected { client_id } => {
                println!("Client {} connected.", client_id);
                game.register_connection(network, client_id, world_now);
            }
            ServerNetworkEvent::ClientDisconnected { client_id, reason } => {
                println!("Client {} disconnected: {}.", client_id, reason);
                game.remove_client(network, client_id);
            }
        }
    }
}

fn sync_clocks(network: &mut dyn ServerNetworkHandle) {
    let server_time = time::now_as_secs_f64();
    let message = ServerMessage::ServerTime(server_time);
    let payload = encode_to_vec(&message, standard()).expect("failed to serialize ServerTime");
    network.broadcast_message(AppChannel::ServerTime, payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockServerNetwork;
    use common::constants::PACE_KART_ID;

    #[test]
    fn connect_event_spawns_a_vehicle() {
        let mut network = MockServerNetwork::new();
        network.add_client(1);
        let mut game = Game::new(0.0);

        network.queue_event(ServerNetworkEvent::ClientConnected { client_id: 1 });
        process_events(&mut network, &mut game, 0.0);

        assert!(game.vehicles.contains_key(&1));
    }

    #[test]
    fn disconnect_event_removes_the_vehicle_but_not_the_pace_kart() {
        let mut network = MockServerNetwork::new();
        network.add_client(1);
        let mut game = Game::new(0.0);
        game.register_connection(&mut network, 1, 0.0);

        network.queue_event(ServerNetworkEvent::ClientDisconnected {
            client_id: 1,
            reason: "timeout".to_string(),
        });
        process_events(&mut network, &mut game, 0.1);

        assert!(!game.vehicles.contains_key(&1));
        assert!(game.vehicles.contains_key(&PACE_KART_ID));
    }
}
