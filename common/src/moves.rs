use crate::constants::MAX_UNACKNOWLEDGED_MOVES;
use crate::sim::Move;

/// The client's "still in flight" input: every move simulated locally that
/// the server has not yet acknowledged. Appended at the tail each tick and
/// pruned from the head whenever an authoritative state arrives.
#[derive(Clone, Debug, Default)]
pub struct MoveLog {
    moves: Vec<Move>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a move. If the server has gone quiet long enough for the log
    /// to hit its cap, the oldest move is dropped; prediction for it can no
    /// longer be corrected anyway once the server is that far behind.
    pub fn push(&mut self, mv: Move) {
        if self.moves.len() >= MAX_UNACKNOWLEDGED_MOVES {
            self.moves.remove(0);
            eprintln!("move log full; dropping oldest unacknowledged move");
        }
        self.moves.push(mv);
    }

    /// Discard every move the server has already processed. Keyed off the
    /// acknowledged timestamp rather than arrival order, so late or
    /// reordered state broadcasts prune correctly.
    pub fn prune(&mut self, acknowledged_timestamp: f64) {
        self.moves.retain(|mv| mv.timestamp > acknowledged_timestamp);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::create_move;

    #[test]
    fn prune_discards_acknowledged_and_keeps_rest_in_order() {
        let mut log = MoveLog::new();
        for t in 0..5 {
            log.push(create_move(0.016, 1.0, 0.0, t as f64));
        }

        log.prune(2.0);

        let remaining: Vec<f64> = log.iter().map(|mv| mv.timestamp).collect();
        assert_eq!(remaining, vec![3.0, 4.0]);
    }

    #[test]
    fn prune_with_two_moves_keeps_only_the_later() {
        let mut log = MoveLog::new();
        log.push(create_move(1.0, 1.0, 0.0, 0.0));
        log.push(create_move(1.0, 1.0, 0.0, 1.0));

        log.prune(0.0);

        assert_eq!(log.len(), 1);
        assert_eq!(log.iter().next().unwrap().timestamp, 1.0);
    }

    #[test]
    fn push_past_cap_drops_oldest() {
        let mut log = MoveLog::new();
        for t in 0..=MAX_UNACKNOWLEDGED_MOVES {
            log.push(create_move(0.016, 0.0, 0.0, t as f64));
        }

        assert_eq!(log.len(), MAX_UNACKNOWLEDGED_MOVES);
        assert_eq!(log.iter().next().unwrap().timestamp, 1.0);
    }
}
