use serde::{Deserialize, Serialize};

/// Point-in-time view of a session, derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// 1-indexed cursor for display. Equals `total_cards + 1` once exhausted.
    pub current_position: usize,
    pub total_cards: usize,
    pub completed_count: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub accuracy_percent: f64,
}

impl ProgressSnapshot {
    /// Builds a snapshot from the cursor, sequence length and answer outcomes.
    #[must_use]
    pub fn compute(
        cursor: usize,
        total_cards: usize,
        outcomes: impl IntoIterator<Item = bool>,
    ) -> Self {
        let (mut correct, mut incorrect) = (0_usize, 0_usize);
        for is_correct in outcomes {
            if is_correct {
                correct += 1;
            } else {
                incorrect += 1;
            }
        }
        let completed = correct + incorrect;

        #[allow(clippy::cast_precision_loss)]
        let accuracy_percent = if completed == 0 {
            0.0
        } else {
            correct as f64 / completed as f64 * 100.0
        };

        Self {
            current_position: cursor + 1,
            total_cards,
            completed_count: completed,
            correct_count: correct,
            incorrect_count: incorrect,
            accuracy_percent,
        }
    }

    /// Cards from the cursor to the end of the sequence.
    #[must_use]
    pub fn remaining(&self) -> usize {
        let cursor = self.current_position.saturating_sub(1);
        self.total_cards.saturating_sub(cursor)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_outcomes_have_zero_accuracy() {
        let p = ProgressSnapshot::compute(0, 3, []);
        assert_eq!(p.current_position, 1);
        assert_eq!(p.completed_count, 0);
        assert_eq!(p.accuracy_percent, 0.0);
        assert_eq!(p.remaining(), 3);
        assert!(!p.is_exhausted());
    }

    #[test]
    fn mixed_outcomes() {
        let p = ProgressSnapshot::compute(3, 3, [true, false, true]);
        assert_eq!(p.correct_count, 2);
        assert_eq!(p.incorrect_count, 1);
        assert!((p.accuracy_percent - 200.0 / 3.0).abs() < 1e-9);
        assert!(p.is_exhausted());
    }
}
