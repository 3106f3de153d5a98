use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::motion::MotionHost;

/// One sample of driver input, stamped with server world time at creation.
/// The timestamp is the move's identity: the server acknowledges moves by
/// echoing the last one it processed, and the client prunes its log by
/// comparing timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub throttle: f32,
    pub steering: f32,
    pub delta_time: f32,
    pub timestamp: f64,
}

pub fn create_move(delta_time: f32, throttle: f32, steering: f32, timestamp: f64) -> Move {
    Move {
        throttle,
        steering,
        delta_time,
        timestamp,
    }
}

/// The minimal physical state needed to resume simulation or interpolate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl VehicleState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Vehicle tuning. Both peers must agree on these values exactly, or the
/// client's replayed prediction will not match the server's simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleConfig {
    /// Mass of the kart (kg).
    pub mass: f32,
    /// Force applied at full throttle (N).
    pub max_driving_force: f32,
    /// Radius of the turning circle at full steering lock (m).
    pub min_turning_radius: f32,
    /// AirResistance = -Speed^2 * DragCoefficient.
    /// 16 = 10000 / 25^2, so terminal velocity at full throttle is 25 m/s.
    pub drag_coefficient: f32,
    /// RollingResistance = RollingResistanceCoefficient * NormalForce.
    pub rolling_resistance_coefficient: f32,
    /// Gravity magnitude (m/s^2), used only for the normal force.
    pub gravity: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass: 1000.0,
            max_driving_force: 10000.0,
            min_turning_radius: 10.0,
            drag_coefficient: 16.0,
            rolling_resistance_coefficient: 0.015,
            gravity: 9.81,
        }
    }
}

impl VehicleConfig {
    /// Advance `state` by one move. Deterministic: identical inputs produce
    /// bit-identical results on every machine, which is what makes replaying
    /// unacknowledged moves after a correction exact rather than approximate.
    pub fn simulate(
        &self,
        state: &VehicleState,
        mv: &Move,
        host: &dyn MotionHost,
    ) -> VehicleState {
        let mut next = *state;

        let mut force = next.forward() * self.max_driving_force * mv.throttle;
        force += self.air_resistance(next.velocity);
        force += self.rolling_resistance(next.velocity);

        let acceleration = force / self.mass;
        next.velocity += acceleration * mv.delta_time;

        self.apply_rotation(&mut next, mv.delta_time, mv.steering);
        self.apply_translation(&mut next, mv.delta_time, host);

        next
    }

    fn air_resistance(&self, velocity: Vec3) -> Vec3 {
        // normalize_or_zero keeps a stationary kart NaN-free.
        -(velocity.normalize_or_zero() * velocity.length_squared() * self.drag_coefficient)
    }

    fn rolling_resistance(&self, velocity: Vec3) -> Vec3 {
        let normal_force = self.mass * self.gravity;
        -(velocity.normalize_or_zero() * self.rolling_resistance_coefficient * normal_force)
    }

    /// Turn rate grows with forward speed and shrinks with the turning
    /// radius: dTheta = dx / r, where dx is the distance travelled along the
    /// turning circle this step. A stationary kart cannot turn.
    fn apply_rotation(&self, state: &mut VehicleState, delta_time: f32, steering: f32) {
        let delta_location = state.forward().dot(state.velocity) * delta_time;
        let rotation_angle = (delta_location / self.min_turning_radius) * steering;
        let rotation_delta = Quat::from_axis_angle(state.up(), rotation_angle);

        state.velocity = rotation_delta * state.velocity;
        state.rotation = (rotation_delta * state.rotation).normalize();
    }

    fn apply_translation(&self, state: &mut VehicleState, delta_time: f32, host: &dyn MotionHost) {
        let translation = state.velocity * delta_time;
        let outcome = host.apply_motion(state.position, translation);
        state.position = outcome.position;
        if outcome.blocked {
            // Full inelastic stop; no partial restitution.
            state.velocity = Vec3::ZERO;
        }
    }
}
