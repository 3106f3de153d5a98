use std::{
    env, io,
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

use dotenvy;

use renet::{ChannelConfig, ConnectionConfig, SendType};
use socket2::{Domain, Socket, Type};

/// Server address from the IP/PORT env vars (or a `.env` file), defaulting
/// to localhost:5000.
pub fn get_connectable_address() -> SocketAddr {
    dotenvy::dotenv().ok();

    let ip = env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

    let address_string = format!("{}:{}", ip, port);
    address_string.parse().expect("Invalid IP or Port format")
}

// Development key. A real deployment would hand out connect tokens from a
// matchmaker that keeps this secret server-side.
pub fn private_key() -> [u8; 32] {
    [
        148, 62, 205, 17, 93, 250, 41, 188, 76, 9, 133, 224, 57, 102, 211, 30, 84, 169, 7, 240,
        122, 35, 198, 61, 150, 14, 227, 89, 46, 173, 110, 5,
    ]
}

/// Channel assignments for the kart protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppChannel {
    /// Driver moves (client to server) and session messages like Welcome,
    /// VehicleJoined, VehicleLeft (server to client). Reliable and ordered;
    /// the server's timestamp monotonicity check assumes moves arrive in
    /// send order.
    ReliableOrdered,
    /// Authoritative state broadcasts. Best effort: a dropped or reordered
    /// update is superseded by the next one, and both reconciliation and
    /// interpolation tolerate that.
    Unreliable,
    /// Server clock samples feeding the client's server-time estimate.
    ServerTime,
}

impl From<AppChannel> for u8 {
    fn from(channel: AppChannel) -> Self {
        match channel {
            AppChannel::ReliableOrdered => 0,
            AppChannel::Unreliable => 1,
            AppChannel::ServerTime => 2,
        }
    }
}

pub fn connection_config() -> ConnectionConfig {
    let moves_and_session = ChannelConfig {
        channel_id: AppChannel::ReliableOrdered.into(),
        max_memory_usage_bytes: 10 * 1024 * 1024,
        send_type: SendType::ReliableOrdered {
            resend_time: Duration::from_millis(100),
        },
    };

    let state_broadcast = ChannelConfig {
        channel_id: AppChannel::Unreliable.into(),
        max_memory_usage_bytes: 10 * 1024 * 1024,
        send_type: SendType::Unreliable,
    };

    // Clock samples are tiny and superseded constantly; a small budget is
    // plenty.
    let clock_sync = ChannelConfig {
        channel_id: AppChannel::ServerTime.into(),
        max_memory_usage_bytes: 1024 * 1024,
        send_type: SendType::Unreliable,
    };

    // Only the server publishes clock samples, so the client side carries
    // two channels and the server side three.
    let client_channels_config = vec![moves_and_session.clone(), state_broadcast.clone()];
    let server_channels_config = vec![moves_and_session, state_broadcast, clock_sync];

    ConnectionConfig {
        client_channels_config,
        server_channels_config,
        ..Default::default()
    }
}

/// Reuse-address bind so a restarted server can take the port back
/// immediately.
pub fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
