use std::collections::HashMap;

use crate::{predict::Predictor, proxy::RemoteVehicle};
use common::{
    motion::ArenaWalls,
    protocol::{ReplicatedState, VehicleSpawn},
    role::{Conduct, Role, conduct},
    sim::{VehicleConfig, VehicleState},
};

/// Local estimate of the server's clock, kept in sync by `time`.
#[derive(Default)]
pub struct Clock {
    pub estimated_server_time: f64,
    pub smoothed_rtt: f64,
}

/// Everything this client knows about the session: its own predicted
/// vehicle plus an interpolated stand-in for every other vehicle the
/// server has told it about.
pub struct ClientSession {
    pub client_id: u64,
    pub clock: Clock,
    pub vehicle_id: Option<u64>,
    pub predictor: Option<Predictor>,
    pub remotes: HashMap<u64, RemoteVehicle>,
    pub config: VehicleConfig,
    pub walls: ArenaWalls,
}

impl ClientSession {
    pub fn new(client_id: u64) -> Self {
        Self {
            client_id,
            clock: Clock::default(),
            vehicle_id: None,
            predictor: None,
            remotes: HashMap::new(),
            config: VehicleConfig::default(),
            walls: ArenaWalls::default(),
        }
    }

    /// What to do with a state update for the given vehicle. Our own
    /// vehicle is predicted and reconciled; everyone else's is
    /// interpolated.
    pub fn conduct_for(&self, vehicle_id: u64) -> Conduct {
        if Some(vehicle_id) == self.vehicle_id {
            conduct(Role::AutonomousProxy, Role::Authority)
        } else {
            conduct(Role::SimulatedProxy, Role::Authority)
        }
    }

    pub fn on_welcome(&mut self, vehicle_id: u64, spawn: VehicleState, roster: Vec<VehicleSpawn>) {
        self.vehicle_id = Some(vehicle_id);
        self.predictor = Some(Predictor::new(spawn, self.config));
        for other in roster {
            if other.vehicle_id != vehicle_id {
                self.remotes.insert(other.vehicle_id, RemoteVehicle::new());
            }
        }
    }

    pub fn on_vehicle_joined(&mut self, spawn: VehicleSpawn) {
        if Some(spawn.vehicle_id) == self.vehicle_id {
            return;
        }
        self.remotes.insert(spawn.vehicle_id, RemoteVehicle::new());
        println!("Vehicle {} joined.", spawn.vehicle_id);
    }

    pub fn on_vehicle_left(&mut self, vehicle_id: u64) {
        self.remotes.remove(&vehicle_id);
        println!("Vehicle {} left.", vehicle_id);
    }

    /// Route an authoritative state update by conduct.
    pub fn on_state(&mut self, vehicle_id: u64, update: &ReplicatedState, now: f64) {
        match self.conduct_for(vehicle_id) {
            Conduct::PredictLocally => {
                if let Some(predictor) = self.predictor.as_mut() {
                    predictor.reconcile(update, &self.walls);
                }
            }
            Conduct::Interpolate => {
                self.remotes
                    .entry(vehicle_id)
                    .or_insert_with(RemoteVehicle::new)
                    .on_state_received(update, now);
            }
            Conduct::DriveAndReplicate | Conduct::ValidateAndReplicate | Conduct::Idle => {}
        }
    }

    pub fn step_remotes(&mut self, delta_time: f32) {
        for remote in self.remotes.values_mut() {
            remote.step(delta_time);
        }
    }
}
