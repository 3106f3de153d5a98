use common::{interpolate::{Pose, ProxyInterpolator}, protocol::ReplicatedState};

/// A vehicle some other peer drives. We never simulate it from input; we
/// only smooth between the authoritative states the server broadcasts.
#[derive(Default)]
pub struct RemoteVehicle {
    interpolator: ProxyInterpolator,
    pub pose: Option<Pose>,
}

impl RemoteVehicle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a freshly received authoritative update. `now` is the local
    /// wall clock; the gap between receptions becomes the interpolation
    /// window for the next segment.
    pub fn on_state_received(&mut self, update: &ReplicatedState, now: f64) {
        self.interpolator.record(&update.state, now);
    }

    pub fn step(&mut self, delta_time: f32) {
        if let Some(pose) = self.interpolator.step(delta_time) {
            self.pose = Some(pose);
        }
    }
}
