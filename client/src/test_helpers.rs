use std::collections::{HashMap, VecDeque};

use crate::net::NetworkHandle;
use common::net::AppChannel;

pub struct MockNetwork {
    pub connected: bool,
    pub rtt: f64,
    pub sent_messages: Vec<(AppChannel, Vec<u8>)>,
    messages_to_receive: HashMap<u8, VecDeque<Vec<u8>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            connected: true,
            rtt: 0.0,
            sent_messages: Vec::new(),
            messages_to_receive: HashMap::new(),
        }
    }

    pub fn queue_message(&mut self, channel: AppChannel, message: Vec<u8>) {
        self.messages_to_receive
            .entry(channel.into())
            .or_default()
            .push_back(message);
    }

    pub fn sent_on(&self, channel: AppChannel) -> Vec<&Vec<u8>> {
        self.sent_messages
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m)
            .collect()
    }
}

impl NetworkHandle for MockNetwork {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>) {
        self.sent_messages.push((channel, message));
    }

    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>> {
        self.messages_to_receive
            .get_mut(&u8::from(channel))
            .and_then(|queue| queue.pop_front())
    }

    fn rtt(&self) -> f64 {
        self.rtt
    }
}
