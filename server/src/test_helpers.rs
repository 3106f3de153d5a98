use std::collections::{HashMap, VecDeque};

use crate::net::{ServerNetworkEvent, ServerNetworkHandle};
use common::net::AppChannel;

/// An in-memory stand-in for the renet server, so handlers can be tested
/// without sockets. Tests queue events and client messages in, then read
/// the per-client and broadcast outboxes back out.
#[derive(Default)]
pub struct MockServerNetwork {
    events_to_process: VecDeque<ServerNetworkEvent>,
    client_messages: HashMap<u64, VecDeque<Vec<u8>>>,
    sent_messages: HashMap<u64, Vec<Vec<u8>>>,
    broadcast_messages: Vec<Vec<u8>>,
    pub disconnected_clients: Vec<u64>,
    client_ids: Vec<u64>,
}

impl MockServerNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&mut self, client_id: u64) {
        self.client_ids.push(client_id);
        self.client_messages.entry(client_id).or_default();
        self.sent_messages.entry(client_id).or_default();
    }

    pub fn queue_event(&mut self, event: ServerNetworkEvent) {
        self.events_to_process.push_back(event);
    }

    pub fn queue_raw_message(&mut self, client_id: u64, message: Vec<u8>) {
        self.client_messages
            .entry(client_id)
            .or_default()
            .push_back(message);
    }

    pub fn get_sent_messages_data(&mut self, client_id: u64) -> Vec<Vec<u8>> {
        self.sent_messages.entry(client_id).or_default().clone()
    }

    pub fn get_broadcast_messages_data(&self) -> Vec<Vec<u8>> {
        self.broadcast_messages.clone()
    }
}

impl ServerNetworkHandle for MockServerNetwork {
    fn get_event(&mut self) -> Option<ServerNetworkEvent> {
        self.events_to_process.pop_front()
    }

    fn clients_id(&self) -> Vec<u64> {
        self.client_ids.clone()
    }

    fn receive_message(&mut self, client_id: u64, _channel: AppChannel) -> Option<Vec<u8>> {
        self.client_messages
            .entry(client_id)
            .or_default()
            .pop_front()
    }

    fn send_message(&mut self, client_id: u64, _channel: AppChannel, message: Vec<u8>) {
        self.sent_messages
            .entry(client_id)
            .or_default()
            .push(message);
    }

    fn broadcast_message(&mut self, _channel: AppChannel, message: Vec<u8>) {
        self.broadcast_messages.push(message);
    }

    fn broadcast_message_except(
        &mut self,
        client_id_to_exclude: u64,
        _channel: AppChannel,
        message: Vec<u8>,
    ) {
        for &id in &self.client_ids {
            if id != client_id_to_exclude {
                self.sent_messages
                    .entry(id)
                    .or_default()
                    .push(message.clone());
            }
        }
    }

    fn disconnect(&mut self, client_id: u64) {
        self.disconnected_clients.push(client_id);
        self.client_ids.retain(|&id| id != client_id);
    }
}
