use glam::{Quat, Vec3};

use crate::sim::VehicleState;

/// Below this update period there is not enough information to interpolate;
/// the proxy holds its last pose rather than dividing by near-zero.
const MIN_UPDATE_PERIOD: f32 = 1e-3;

/// What an observing peer displays for a remote vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl From<VehicleState> for Pose {
    fn from(state: VehicleState) -> Self {
        Self {
            position: state.position,
            rotation: state.rotation,
            velocity: state.velocity,
        }
    }
}

/// Smooths a remote vehicle between the last two authoritative states.
///
/// Linear interpolation alone snaps velocity at every update boundary. A
/// cubic Hermite segment matches both endpoint positions and endpoint
/// velocities, so the displayed motion keeps its first derivative
/// continuous. The cost is possible overshoot between samples when velocity
/// changes sharply; smoothness is preferred over physical accuracy here.
#[derive(Clone, Debug, Default)]
pub struct ProxyInterpolator {
    previous: Option<Pose>,
    target: Option<Pose>,
    displayed: Option<Pose>,
    elapsed: f32,
    update_period: f32,
    last_arrival: Option<f64>,
}

impl ProxyInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly received authoritative state. The pose currently on
    /// display becomes the segment start, the received state the segment
    /// end, and the wall-clock gap since the previous reception the segment
    /// duration.
    pub fn record(&mut self, state: &VehicleState, now: f64) {
        let target = Pose::from(*state);

        self.update_period = match self.last_arrival {
            Some(previous_arrival) => (now - previous_arrival) as f32,
            None => 0.0,
        };
        self.last_arrival = Some(now);

        // First reception: nothing to interpolate from, snap directly.
        self.previous = Some(self.displayed.unwrap_or(target));
        self.target = Some(target);
        self.elapsed = 0.0;

        if self.displayed.is_none() {
            self.displayed = Some(target);
        }
    }

    /// Advance the segment by one tick and return the pose to display, or
    /// None if no state has been received yet.
    pub fn step(&mut self, delta_time: f32) -> Option<Pose> {
        let previous = self.previous?;
        let target = self.target?;

        self.elapsed += delta_time;

        if self.update_period < MIN_UPDATE_PERIOD {
            // Degenerate segment: hold position until real data arrives.
            let pose = self.displayed.unwrap_or(target);
            return Some(pose);
        }

        let alpha = (self.elapsed / self.update_period).clamp(0.0, 1.0);
        let pose = evaluate(&previous, &target, alpha, self.update_period);
        self.displayed = Some(pose);

        Some(pose)
    }
}

fn evaluate(previous: &Pose, target: &Pose, alpha: f32, period: f32) -> Pose {
    Pose {
        position: hermite_position(
            previous.position,
            target.position,
            previous.velocity,
            target.velocity,
            alpha,
            period,
        ),
        rotation: previous.rotation.slerp(target.rotation, alpha),
        velocity: hermite_velocity(
            previous.position,
            target.position,
            previous.velocity,
            target.velocity,
            alpha,
            period,
        ),
    }
}

/// Cubic Hermite basis evaluated at `alpha`. Velocities are per-second
/// rates; multiplying by the segment duration converts them into the
/// per-segment derivatives the basis expects.
fn hermite_position(p0: Vec3, p1: Vec3, v0: Vec3, v1: Vec3, alpha: f32, period: f32) -> Vec3 {
    let tangent_from = v0 * period;
    let tangent_to = v1 * period;

    let t2 = alpha * alpha;
    let t3 = t2 * alpha;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + alpha;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    p0 * h00 + tangent_from * h10 + p1 * h01 + tangent_to * h11
}

/// Derivative of the Hermite basis, divided back by the segment duration so
/// the result is again a per-second velocity.
fn hermite_velocity(p0: Vec3, p1: Vec3, v0: Vec3, v1: Vec3, alpha: f32, period: f32) -> Vec3 {
    let tangent_from = v0 * period;
    let tangent_to = v1 * period;

    let t2 = alpha * alpha;

    let d00 = 6.0 * t2 - 6.0 * alpha;
    let d10 = 3.0 * t2 - 4.0 * alpha + 1.0;
    let d01 = -6.0 * t2 + 6.0 * alpha;
    let d11 = 3.0 * t2 - 2.0 * alpha;

    (p0 * d00 + tangent_from * d10 + p1 * d01 + tangent_to * d11) / period
}
