use glam::Vec3;

use crate::constants::ARENA_HALF_EXTENT;

/// Result of pushing a translation through a motion host.
pub struct MotionOutcome {
    pub position: Vec3,
    pub blocked: bool,
}

/// The collision-aware integrator that actually moves a vehicle in world
/// space. The simulator never inspects geometry itself; it hands the host a
/// desired translation and reacts to whether the host reported a blocking
/// hit. Both peers must use the same host for a vehicle or replay diverges.
pub trait MotionHost {
    fn apply_motion(&self, from: Vec3, translation: Vec3) -> MotionOutcome;
}

/// A host with nothing to hit. Useful in tests and for free-roam vehicles.
pub struct OpenRoad;

impl MotionHost for OpenRoad {
    fn apply_motion(&self, from: Vec3, translation: Vec3) -> MotionOutcome {
        MotionOutcome {
            position: from + translation,
            blocked: false,
        }
    }
}

/// Axis-aligned walls around the arena. A translation that would carry the
/// vehicle past a wall is clamped to the wall and reported as blocking.
pub struct ArenaWalls {
    pub half_extent: f32,
}

impl Default for ArenaWalls {
    fn default() -> Self {
        Self {
            half_extent: ARENA_HALF_EXTENT,
        }
    }
}

impl MotionHost for ArenaWalls {
    fn apply_motion(&self, from: Vec3, translation: Vec3) -> MotionOutcome {
        let wanted = from + translation;
        let clamped = Vec3::new(
            wanted.x.clamp(-self.half_extent, self.half_extent),
            wanted.y,
            wanted.z.clamp(-self.half_extent, self.half_extent),
        );

        MotionOutcome {
            position: clamped,
            blocked: clamped != wanted,
        }
    }
}
