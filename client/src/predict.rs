use common::{
    motion::MotionHost,
    moves::MoveLog,
    protocol::ReplicatedState,
    sim::{Move, VehicleConfig, VehicleState, create_move},
};

/// Client-side prediction for the vehicle this peer owns input for.
///
/// Every tick the local input is simulated immediately, without waiting for
/// the server; the move is buffered until the server acknowledges it. When
/// a correction arrives, the predicted state snaps to the authoritative one
/// and the still-unacknowledged moves are replayed on top, so the displayed
/// kart keeps the input the server has not seen yet.
pub struct Predictor {
    state: VehicleState,
    log: MoveLog,
    config: VehicleConfig,
    acknowledged: Option<f64>,
}

impl Predictor {
    pub fn new(spawn: VehicleState, config: VehicleConfig) -> Self {
        Self {
            state: spawn,
            log: MoveLog::new(),
            config,
            acknowledged: None,
        }
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn unacknowledged(&self) -> usize {
        self.log.len()
    }

    /// Build this tick's move, simulate it locally, and buffer it. The
    /// returned move is what the caller sends to the server; timestamps
    /// come from the estimated server clock so the server's monotonicity
    /// check sees them in order.
    pub fn tick(
        &mut self,
        throttle: f32,
        steering: f32,
        delta_time: f32,
        estimated_server_time: f64,
        host: &dyn MotionHost,
    ) -> Move {
        let mv = create_move(delta_time, throttle, steering, estimated_server_time);

        self.state = self.config.simulate(&self.state, &mv, host);
        self.log.push(mv);

        mv
    }

    /// Apply an authoritative correction: snap to the server's state, drop
    /// every move it has processed, and replay the rest in order. Because
    /// the simulation is deterministic, the replayed result is exactly what
    /// the server will compute for those moves.
    pub fn reconcile(&mut self, update: &ReplicatedState, host: &dyn MotionHost) {
        // The broadcast channel may drop or reorder. An update older than
        // one already applied would rewind the kart to a superseded state,
        // and the moves the newer update pruned are gone and could never be
        // replayed on top of it.
        if self
            .acknowledged
            .is_some_and(|acked| update.last_move.timestamp <= acked)
        {
            return;
        }
        self.acknowledged = Some(update.last_move.timestamp);

        self.state = update.state;
        self.log.prune(update.last_move.timestamp);

        for mv in self.log.iter() {
            self.state = self.config.simulate(&self.state, mv, host);
        }
    }
}
