use std::time::Duration;

use bincode::config::standard;

use crate::{net::NetworkHandle, session::Clock};
use common::{net::AppChannel, protocol::ServerMessage};

// The server publishes its clock every 50ms; between messages we advance
// the estimate locally and nudge it toward the server whenever a fresh
// sample arrives, so move timestamps stay monotonic instead of jumping.

const HARD_SNAP_THRESHOLD: f64 = 1.0; // Off by more than a second: just teleport the clock.
const FAST_CATCHUP_THRESHOLD: f64 = 0.25;
const MODERATE_DRIFT_THRESHOLD: f64 = 0.05;

const ALPHA_FAST: f64 = 0.3;
const ALPHA_NORMAL: f64 = 0.1;
const ALPHA_JITTER: f64 = 0.03; // Heavy damping once we are close, to absorb jitter.

const BASE_CORRECTION_LIMIT: f64 = 0.01;
const MAX_CORRECTION_LIMIT: f64 = 0.05;
const CORRECTION_RATIO: f64 = 0.25;

const MAX_REASONABLE_RTT: f64 = 1.0;
const RTT_ALPHA: f64 = 0.1;

/// Advance the estimated server clock by the frame interval and fold in the
/// latest ServerTime sample, if one arrived.
pub fn estimate_server_clock(
    clock: &mut Clock,
    network: &mut dyn NetworkHandle,
    interval: Duration,
) {
    clock.estimated_server_time += interval.as_secs_f64();

    // Older samples are superseded; only the newest matters.
    let mut latest_message = None;
    while let Some(message) = network.receive_message(AppChannel::ServerTime) {
        latest_message = Some(message);
    }
    let Some(message) = latest_message else {
        return;
    };

    match bincode::serde::decode_from_slice(&message, standard()) {
        Ok((ServerMessage::ServerTime(server_sent_time), _)) => {
            let rtt = network.rtt();
            if rtt > MAX_REASONABLE_RTT {
                // Timing info this stale would drag the estimate backwards.
                return;
            }
            clock.smoothed_rtt += (rtt - clock.smoothed_rtt) * RTT_ALPHA;

            // The sample left the server half an RTT ago.
            let target_time = server_sent_time + rtt / 2.0;
            let delta = target_time - clock.estimated_server_time;

            if clock.estimated_server_time == 0.0 || delta.abs() > HARD_SNAP_THRESHOLD {
                clock.estimated_server_time = target_time;
                println!("Hard sync: clock snapped to {:.3}.", target_time);
                return;
            }

            clock.estimated_server_time += correction(delta);
        }
        Err(e) => {
            eprintln!("Failed to deserialize ServerTime message: {}.", e);
        }
        _ => {}
    }
}

/// How far to move the clock toward the target this frame. Large errors are
/// chased aggressively; small ones are damped so the timestamp stream the
/// predictor stamps onto moves does not wobble.
fn correction(delta: f64) -> f64 {
    let alpha = if delta.abs() > FAST_CATCHUP_THRESHOLD {
        ALPHA_FAST
    } else if delta.abs() > MODERATE_DRIFT_THRESHOLD {
        ALPHA_NORMAL
    } else {
        ALPHA_JITTER
    };

    let raw = delta * alpha;
    let limit =
        (delta.abs() * CORRECTION_RATIO).clamp(BASE_CORRECTION_LIMIT, MAX_CORRECTION_LIMIT);

    raw.clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockNetwork;

    fn server_time_message(time: f64) -> Vec<u8> {
        bincode::serde::encode_to_vec(ServerMessage::ServerTime(time), standard())
            .expect("failed to serialize")
    }

    #[test]
    fn correction_is_bounded_and_signed() {
        assert!(correction(10.0) <= MAX_CORRECTION_LIMIT);
        assert!(correction(-10.0) >= -MAX_CORRECTION_LIMIT);
        assert!(correction(0.5) > 0.0);
        assert!(correction(-0.5) < 0.0);
    }

    #[test]
    fn small_drift_gets_a_gentle_nudge() {
        let small = correction(0.02);
        let large = correction(0.5);
        assert!(small > 0.0);
        assert!(small < large);
    }

    #[test]
    fn uninitialized_clock_snaps_to_first_sample() {
        let mut clock = Clock::default();
        let mut network = MockNetwork::new();
        network.queue_message(AppChannel::ServerTime, server_time_message(100.0));

        estimate_server_clock(&mut clock, &mut network, Duration::ZERO);

        assert_eq!(clock.estimated_server_time, 100.0);
    }

    #[test]
    fn nearby_clock_is_nudged_not_snapped() {
        let mut clock = Clock {
            estimated_server_time: 100.0,
            ..Clock::default()
        };
        let mut network = MockNetwork::new();
        network.queue_message(AppChannel::ServerTime, server_time_message(100.1));

        estimate_server_clock(&mut clock, &mut network, Duration::ZERO);

        assert!(clock.estimated_server_time > 100.0);
        assert!(clock.estimated_server_time < 100.1);
    }

    #[test]
    fn only_the_newest_sample_is_used() {
        let mut clock = Clock::default();
        let mut network = MockNetwork::new();
        network.queue_message(AppChannel::ServerTime, server_time_message(50.0));
        network.queue_message(AppChannel::ServerTime, server_time_message(60.0));

        estimate_server_clock(&mut clock, &mut network, Duration::ZERO);

        assert_eq!(clock.estimated_server_time, 60.0);
    }
}
