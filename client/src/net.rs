use std::time::Duration;

use renet::RenetClient;
use renet_netcode::{ConnectToken, NetcodeClientTransport};

use common::net::AppChannel;

pub trait NetworkHandle {
    fn is_connected(&self) -> bool;
    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>);
    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>>;
    fn rtt(&self) -> f64;
}

pub struct RenetNetworkHandle<'a> {
    pub client: &'a mut RenetClient,
    pub transport: &'a mut NetcodeClientTransport,
}

impl<'a> RenetNetworkHandle<'a> {
    pub fn new(client: &'a mut RenetClient, transport: &'a mut NetcodeClientTransport) -> Self {
        Self { client, transport }
    }
}

impl NetworkHandle for RenetNetworkHandle<'_> {
    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>) {
        self.client.send_message(channel, message);
    }

    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>> {
        self.client.receive_message(channel).map(|bytes| bytes.to_vec())
    }

    fn rtt(&self) -> f64 {
        self.client.rtt()
    }
}

pub fn create_connect_token(
    current_time: Duration,
    protocol_id: u64,
    client_id: u64,
    server_addr: std::net::SocketAddr,
    private_key: &[u8; 32],
) -> ConnectToken {
    // TODO: In production, the client should receive this token from a
    // matchmaker instead of minting it with a shared dev key.
    ConnectToken::generate(
        current_time,
        protocol_id,
        3600,
        client_id,
        15,
        vec![server_addr],
        None,
        private_key,
    )
    .expect("failed to generate token")
}
