use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

/// Normalized driver input for one tick, both axes in [-1, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriverInput {
    pub throttle: f32,
    pub steering: f32,
}

/// Turns terminal key events into throttle/steering scalars. Terminals
/// without key-release reporting only deliver presses, so each axis decays
/// back to neutral when its keys go quiet instead of waiting for a release
/// event.
#[derive(Default)]
pub struct Keyboard {
    throttle_axis: f32,
    steering_axis: f32,
    pub quit_requested: bool,
}

const AXIS_DECAY: f32 = 4.0; // Axis returns to neutral in ~0.25s without input.

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending terminal events and decay idle axes. Call once per
    /// tick; never blocks.
    pub fn poll(&mut self, delta_time: f32) -> DriverInput {
        let mut throttle_held = false;
        let mut steering_held = false;

        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            self.apply_key(key, &mut throttle_held, &mut steering_held);
        }

        if !throttle_held {
            self.throttle_axis = decay(self.throttle_axis, delta_time);
        }
        if !steering_held {
            self.steering_axis = decay(self.steering_axis, delta_time);
        }

        DriverInput {
            throttle: self.throttle_axis.clamp(-1.0, 1.0),
            steering: self.steering_axis.clamp(-1.0, 1.0),
        }
    }

    fn apply_key(&mut self, key: KeyEvent, throttle_held: &mut bool, steering_held: &mut bool) {
        match key.code {
            KeyCode::Up | KeyCode::Char('w') => {
                self.throttle_axis = 1.0;
                *throttle_held = true;
            }
            KeyCode::Down | KeyCode::Char('s') => {
                self.throttle_axis = -1.0;
                *throttle_held = true;
            }
            KeyCode::Left | KeyCode::Char('a') => {
                self.steering_axis = -1.0;
                *steering_held = true;
            }
            KeyCode::Right | KeyCode::Char('d') => {
                self.steering_axis = 1.0;
                *steering_held = true;
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.quit_requested = true;
            }
            _ => {}
        }
    }
}

fn decay(axis: f32, delta_time: f32) -> f32 {
    let dropped = axis.abs() - AXIS_DECAY * delta_time;
    dropped.max(0.0) * axis.signum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_pulls_axis_toward_neutral_from_both_sides() {
        assert!(decay(1.0, 0.1) < 1.0);
        assert!(decay(-1.0, 0.1) > -1.0);
        assert_eq!(decay(0.0, 0.1), 0.0);
    }

    #[test]
    fn decay_never_overshoots_neutral() {
        assert_eq!(decay(0.01, 1.0), 0.0);
        assert_eq!(decay(-0.01, 1.0), -0.0);
    }
}
