use std::{
    net::{SocketAddr, UdpSocket},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use bincode::config::standard;
use renet::RenetClient;
use renet_netcode::{ClientAuthentication, NetcodeClientTransport};

use crate::{
    input::{DriverInput, Keyboard},
    net::{self, NetworkHandle, RenetNetworkHandle},
    session::ClientSession,
    time::estimate_server_clock,
};
use common::{
    self,
    net::AppChannel,
    protocol::{ClientMessage, ServerMessage},
    time::TICK_MICROS,
};

const STATUS_INTERVAL_TICKS: u64 = 120; // Roughly every two seconds.

pub struct ClientRunner {
    pub session: ClientSession,
    pub client: RenetClient,
    pub transport: NetcodeClientTransport,
    last_updated: Instant,
}

impl ClientRunner {
    pub fn new(
        socket: UdpSocket,
        server_addr: SocketAddr,
        private_key: [u8; 32],
        session: ClientSession,
    ) -> Result<Self, String> {
        let protocol_id = common::protocol::version();
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is before unix epoch");
        socket
            .set_nonblocking(true)
            .map_err(|e| format!("failed to set socket as non-blocking: {}", e))?;

        let connect_token = net::create_connect_token(
            current_time,
            protocol_id,
            session.client_id,
            server_addr,
            &private_key,
        );
        let authentication = ClientAuthentication::Secure { connect_token };
        let transport = NetcodeClientTransport::new(current_time, authentication, socket)
            .map_err(|e| {
                let error_msg = e.to_string();
                if error_msg.contains("invalid protocol id")
                    || error_msg.contains("invalid version info")
                {
                    "version mismatch: client and server versions do not match".to_string()
                } else if error_msg.contains("connection denied") {
                    "connection denied: server full or access restricted".to_string()
                } else if error_msg.contains("connection timed out") {
                    "connection timed out: server not responding".to_string()
                } else {
                    format!("failed to create network transport: {}", e)
                }
            })?;
        let client = RenetClient::new(common::net::connection_config());

        Ok(Self {
            session,
            client,
            transport,
            last_updated: Instant::now(),
        })
    }

    /// Pump renet, fold the latest clock sample into the estimate, and
    /// return the frame interval. Returns Err once the transport gives up.
    fn pump_network(&mut self) -> Result<Duration, String> {
        let now = Instant::now();
        let dt = now - self.last_updated;
        self.last_updated = now;

        self.transport
            .update(dt, &mut self.client)
            .map_err(|e| format!("transport update failed: {}", e))?;
        self.client.update(dt);

        {
            let mut network = RenetNetworkHandle::new(&mut self.client, &mut self.transport);
            estimate_server_clock(&mut self.session.clock, &mut network, dt);
        }

        self.transport
            .send_packets(&mut self.client)
            .map_err(|e| format!("packet send failed: {}", e))?;

        Ok(dt)
    }
}

pub fn run_client_loop(
    socket: UdpSocket,
    server_addr: SocketAddr,
    private_key: [u8; 32],
) -> Result<(), String> {
    let client_id = rand::random::<u64>();
    let session = ClientSession::new(client_id);
    let mut runner = ClientRunner::new(socket, server_addr, private_key, session)?;

    println!(
        "Client {} (protocol v{}) connecting to {}...",
        client_id,
        common::protocol::version(),
        server_addr
    );
    println!("Drive with WASD or the arrow keys. Esc or q quits.");

    let started = Instant::now();
    let mut keyboard = Keyboard::new();
    let mut tick: u64 = 0;

    loop {
        let frame_dt = runner.pump_network()?;
        let delta_time = frame_dt.as_secs_f32().min(0.25);

        if runner.client.is_disconnected() {
            return Err(match runner.transport.disconnect_reason() {
                Some(reason) => format!("disconnected: {:?}", reason),
                None => "disconnected by server".to_string(),
            });
        }

        let input = keyboard.poll(delta_time);
        if keyboard.quit_requested {
            println!("Quitting.");
            return Ok(());
        }

        {
            let mut network = RenetNetworkHandle::new(&mut runner.client, &mut runner.transport);
            update_session(
                &mut runner.session,
                &mut network,
                input,
                delta_time,
                started.elapsed().as_secs_f64(),
            );
        }

        tick += 1;
        if tick % STATUS_INTERVAL_TICKS == 0 {
            print_status(&runner.session);
        }

        thread::sleep(Duration::from_micros(TICK_MICROS));
    }
}

/// One tick of session logic: apply incoming messages, predict the local
/// vehicle from this tick's input, and advance the interpolators.
pub fn update_session(
    session: &mut ClientSession,
    network: &mut dyn NetworkHandle,
    input: DriverInput,
    delta_time: f32,
    local_now: f64,
) {
    receive_reliable_messages(session, network);
    receive_state_updates(session, network, local_now);

    if network.is_connected() {
        if let Some(predictor) = session.predictor.as_mut() {
            let mv = predictor.tick(
                input.throttle,
                input.steering,
                delta_time,
                session.clock.estimated_server_time,
                &session.walls,
            );
            match bincode::serde::encode_to_vec(ClientMessage::Drive(mv), standard()) {
                Ok(bytes) => network.send_message(AppChannel::ReliableOrdered, bytes),
                Err(e) => eprintln!("Failed to serialize move: {}.", e),
            }
        }
    }

    session.step_remotes(delta_time);
}

fn receive_reliable_messages(session: &mut ClientSession, network: &mut dyn NetworkHandle) {
    while let Some(message) = network.receive_message(AppChannel::ReliableOrdered) {
        match bincode::serde::decode_from_slice(&message, standard()) {
            Ok((ServerMessage::Welcome {
                vehicle_id,
                spawn,
                roster,
            }, _)) => {
                println!("Welcome: driving vehicle {}.", vehicle_id);
                session.on_welcome(vehicle_id, spawn, roster);
            }
            Ok((ServerMessage::VehicleJoined(spawn), _)) => session.on_vehicle_joined(spawn),
            Ok((ServerMessage::VehicleLeft { vehicle_id }, _)) => {
                session.on_vehicle_left(vehicle_id)
            }
            Ok((other, _)) => {
                eprintln!("Unexpected {} message on reliable channel.", other.variant_name());
            }
            Err(e) => eprintln!("Failed to deserialize server message: {}.", e),
        }
    }
}

fn receive_state_updates(
    session: &mut ClientSession,
    network: &mut dyn NetworkHandle,
    local_now: f64,
) {
    while let Some(message) = network.receive_message(AppChannel::Unreliable) {
        match bincode::serde::decode_from_slice(&message, standard()) {
            Ok((ServerMessage::State { vehicle_id, update }, _)) => {
                session.on_state(vehicle_id, &update, local_now);
            }
            Ok((other, _)) => {
                eprintln!("Unexpected {} message on state channel.", other.variant_name());
            }
            Err(e) => eprintln!("Failed to deserialize state update: {}.", e),
        }
    }
}

fn print_status(session: &ClientSession) {
    let Some(predictor) = session.predictor.as_ref() else {
        println!("Waiting for welcome from server...");
        return;
    };
    let state = predictor.state();
    println!(
        "pos ({:.1}, {:.1}) speed {:.1} m/s | {} moves in flight | {} remote vehicles | rtt {:.0}ms",
        state.position.x,
        state.position.z,
        state.velocity.length(),
        predictor.unacknowledged(),
        session.remotes.len(),
        session.clock.smoothed_rtt * 1000.0,
    );
}
