//! Cold-tape regime detector: a rolling window of the last N runs' gate-stage
//! counts, modeled as a fixed-size `VecDeque` — a consecutive-run count, not
//! a wall-clock window (see DESIGN.md for the rationale).

use squeeze_core::GateStageCounts;
use std::collections::VecDeque;

pub struct ColdTapeDetector {
    recent_runs: VecDeque<GateStageCounts>,
    consecutive_runs_required: usize,
    stage_count_ceiling: usize,
}

impl ColdTapeDetector {
    pub fn new(consecutive_runs_required: usize, stage_count_ceiling: usize) -> Self {
        Self { recent_runs: VecDeque::new(), consecutive_runs_required, stage_count_ceiling }
    }

    fn is_cold_run(&self, counts: &GateStageCounts) -> bool {
        counts.trade_ready <= self.stage_count_ceiling
            && counts.technical <= self.stage_count_ceiling
            && counts.squeeze <= self.stage_count_ceiling
            && counts.catalyst <= self.stage_count_ceiling
    }

    /// Whether relaxation should be active for the *next* run, based on every run
    /// recorded so far. Called before gating the current run.
    pub fn is_relaxation_active(&self) -> bool {
        if self.recent_runs.len() < self.consecutive_runs_required {
            return false;
        }
        self.recent_runs.iter().rev().take(self.consecutive_runs_required).all(|c| self.is_cold_run(c))
    }

    /// Append this run's gate-stage counts to the rolling window, evicting the
    /// oldest entry once the window exceeds the configured length.
    pub fn record_run(&mut self, counts: GateStageCounts) {
        self.recent_runs.push_back(counts);
        while self.recent_runs.len() > self.consecutive_runs_required {
            self.recent_runs.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cold_counts() -> GateStageCounts {
        GateStageCounts { trade_ready: 1, technical: 2, squeeze: 0, catalyst: 1 }
    }

    fn hot_counts() -> GateStageCounts {
        GateStageCounts { trade_ready: 10, technical: 10, squeeze: 10, catalyst: 10 }
    }

    #[test]
    fn inactive_before_enough_history() {
        let mut detector = ColdTapeDetector::new(3, 2);
        assert!(!detector.is_relaxation_active());
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        assert!(!detector.is_relaxation_active());
    }

    #[test]
    fn activates_after_three_consecutive_cold_runs() {
        let mut detector = ColdTapeDetector::new(3, 2);
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        assert!(detector.is_relaxation_active());
    }

    #[test]
    fn a_single_hot_run_resets_the_window() {
        let mut detector = ColdTapeDetector::new(3, 2);
        detector.record_run(cold_counts());
        detector.record_run(hot_counts());
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        assert!(!detector.is_relaxation_active());
    }

    #[test]
    fn window_only_keeps_the_most_recent_n_runs() {
        let mut detector = ColdTapeDetector::new(3, 2);
        detector.record_run(hot_counts());
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        detector.record_run(cold_counts());
        assert!(detector.is_relaxation_active());
    }
}
