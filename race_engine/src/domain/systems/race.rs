// Race session state machine: countdown, run clock, checkpoint sequencing and split bookkeeping.

use crate::domain::entities::BestTimes;
use crate::domain::state::{RacePhase, RaceState};
use tracing::{debug, info};

pub const COUNTDOWN_MS: f64 = 3000.0;
pub const GO_FLASH_MS: f64 = 800.0;

/// Outcome of checking one incoming checkpoint order against the current progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointAdvance {
    pub valid: bool,
    pub finished: bool,
    pub next_order: u32,
}

/// Pure sequencing rule: only the current order is accepted, the last one finishes the run.
pub fn advance_checkpoint(current: u32, incoming: u32, total: u32) -> CheckpointAdvance {
    let rejected = CheckpointAdvance {
        valid: false,
        finished: false,
        next_order: current,
    };
    if total == 0 || incoming != current {
        return rejected;
    }

    let finished = incoming == total - 1;
    CheckpointAdvance {
        valid: true,
        finished,
        next_order: if finished { total } else { current + 1 },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointResult {
    pub valid: bool,
    pub finished: bool,
    pub next_order: u32,
    pub split_ms: Option<f64>,
    pub split_delta_ms: Option<f64>,
    pub improved_best: bool,
}

impl CheckpointResult {
    fn rejected(next_order: u32) -> Self {
        Self {
            valid: false,
            finished: false,
            next_order,
            split_ms: None,
            split_delta_ms: None,
            improved_best: false,
        }
    }
}

pub struct RaceSession {
    state: RaceState,
}

impl RaceSession {
    pub fn new(total_checkpoints: u32, best: Option<BestTimes>) -> Self {
        let best = best.map(BestTimes::sanitized).unwrap_or_default();
        Self {
            state: RaceState {
                phase: RacePhase::Idle,
                elapsed_ms: 0.0,
                countdown_remaining_ms: COUNTDOWN_MS,
                go_flash_remaining_ms: 0.0,
                current_checkpoint_order: 0,
                total_checkpoints,
                best_splits_ms: best.splits(),
                best_ms: best.best_ms,
                current_splits_ms: vec![None; total_checkpoints as usize],
                last_split_ms: None,
                last_split_delta_ms: None,
            },
        }
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn phase(&self) -> RacePhase {
        self.state.phase
    }

    pub fn best_times(&self) -> BestTimes {
        BestTimes {
            best_ms: self.state.best_ms,
            best_splits_ms: self.state.best_splits_ms.clone().unwrap_or_default(),
        }
    }

    /// Advances the clocks by `delta_ms`.
    ///
    /// The countdown hands whatever time overshoots zero to the run clock, so the run starts
    /// after exactly [`COUNTDOWN_MS`] of accumulated time however the deltas are sliced.
    pub fn update(&mut self, delta_ms: f64, start_intent: bool) {
        let delta_ms = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };

        match self.state.phase {
            RacePhase::Idle => {
                if start_intent {
                    self.state.phase = RacePhase::Countdown;
                    self.state.countdown_remaining_ms = COUNTDOWN_MS;
                    debug!("countdown started");
                    self.tick_countdown(delta_ms);
                }
            }
            RacePhase::Countdown => self.tick_countdown(delta_ms),
            RacePhase::Running => {
                self.state.elapsed_ms += delta_ms;
                self.decay_go_flash(delta_ms);
            }
            RacePhase::Finished => self.decay_go_flash(delta_ms),
        }
    }

    fn decay_go_flash(&mut self, delta_ms: f64) {
        self.state.go_flash_remaining_ms = (self.state.go_flash_remaining_ms - delta_ms).max(0.0);
    }

    fn tick_countdown(&mut self, delta_ms: f64) {
        let state = &mut self.state;
        let remaining = state.countdown_remaining_ms - delta_ms;
        if remaining > 0.0 {
            state.countdown_remaining_ms = remaining;
            return;
        }

        state.countdown_remaining_ms = 0.0;
        state.phase = RacePhase::Running;
        state.elapsed_ms = -remaining;
        state.go_flash_remaining_ms = GO_FLASH_MS;
        info!("race started");
    }

    pub fn register_checkpoint(&mut self, order: u32) -> CheckpointResult {
        let state = &mut self.state;
        if state.phase != RacePhase::Running {
            return CheckpointResult::rejected(state.current_checkpoint_order);
        }

        let advance = advance_checkpoint(
            state.current_checkpoint_order,
            order,
            state.total_checkpoints,
        );
        if !advance.valid {
            debug!(order, expected = state.current_checkpoint_order, "checkpoint rejected");
            return CheckpointResult::rejected(advance.next_order);
        }

        let split_ms = state.elapsed_ms;
        let index = order as usize;
        if let Some(slot) = state.current_splits_ms.get_mut(index) {
            *slot = Some(split_ms);
        }
        let split_delta_ms = state
            .best_splits_ms
            .as_ref()
            .and_then(|splits| splits.get(index))
            .map(|best| split_ms - best);

        state.current_checkpoint_order = advance.next_order;
        state.last_split_ms = Some(split_ms);
        state.last_split_delta_ms = split_delta_ms;
        info!(order, split_ms, ?split_delta_ms, "checkpoint passed");

        let mut improved_best = false;
        if advance.finished {
            state.phase = RacePhase::Finished;
            improved_best = state.best_ms.is_none_or(|best| split_ms < best);
            if improved_best {
                state.best_ms = Some(split_ms);
                state.best_splits_ms =
                    Some(state.current_splits_ms.iter().flatten().copied().collect());
            }
            info!(elapsed_ms = split_ms, improved_best, "race finished");
        }

        CheckpointResult {
            valid: true,
            finished: advance.finished,
            next_order: advance.next_order,
            split_ms: Some(split_ms),
            split_delta_ms,
            improved_best,
        }
    }

    /// Back to idle from any phase. Best time and best splits survive.
    pub fn restart_run(&mut self) {
        let state = &mut self.state;
        state.phase = RacePhase::Idle;
        state.elapsed_ms = 0.0;
        state.countdown_remaining_ms = COUNTDOWN_MS;
        state.go_flash_remaining_ms = 0.0;
        state.current_checkpoint_order = 0;
        state.current_splits_ms = vec![None; state.total_checkpoints as usize];
        state.last_split_ms = None;
        state.last_split_delta_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_session(total: u32, best: Option<BestTimes>) -> RaceSession {
        let mut session = RaceSession::new(total, best);
        session.update(1.0, true);
        session.update(COUNTDOWN_MS, false);
        assert_eq!(session.phase(), RacePhase::Running);
        session
    }

    #[test]
    fn when_checkpoints_arrive_out_of_order_then_they_are_rejected() {
        let mut session = running_session(3, None);

        let skipped = session.register_checkpoint(1);
        assert!(!skipped.valid);
        assert_eq!(session.state().current_checkpoint_order, 0);

        assert!(session.register_checkpoint(0).valid);
        let repeated = session.register_checkpoint(0);
        assert!(!repeated.valid);
        assert_eq!(session.state().current_checkpoint_order, 1);
    }

    #[test]
    fn when_last_checkpoint_is_passed_then_run_finishes_in_the_same_call() {
        let mut session = running_session(3, None);
        session.register_checkpoint(0);
        session.register_checkpoint(1);

        let finish = session.register_checkpoint(2);

        assert!(finish.valid && finish.finished);
        assert!(finish.improved_best);
        assert_eq!(session.phase(), RacePhase::Finished);
        assert_eq!(session.state().current_checkpoint_order, 3);
        assert!(!session.register_checkpoint(3).valid);
    }

    #[test]
    fn when_not_running_then_checkpoints_are_rejected() {
        let mut session = RaceSession::new(2, None);
        assert!(!session.register_checkpoint(0).valid);

        session.update(10.0, true);
        assert_eq!(session.phase(), RacePhase::Countdown);
        assert!(!session.register_checkpoint(0).valid);
    }

    #[test]
    fn when_session_has_no_checkpoints_then_every_registration_is_rejected() {
        let mut session = running_session(0, None);

        assert!(!session.register_checkpoint(0).valid);
        assert!(!advance_checkpoint(0, 0, 0).valid);
    }

    #[test]
    fn when_restarting_from_any_phase_then_progress_resets() {
        for steps in 0..4 {
            let mut session = RaceSession::new(1, None);
            if steps >= 1 {
                session.update(1.0, true);
            }
            if steps >= 2 {
                session.update(COUNTDOWN_MS + 250.0, false);
            }
            if steps >= 3 {
                session.register_checkpoint(0);
            }

            session.restart_run();

            let state = session.state();
            assert_eq!(state.phase, RacePhase::Idle);
            assert_eq!(state.elapsed_ms, 0.0);
            assert_eq!(state.current_checkpoint_order, 0);
            assert_eq!(state.countdown_remaining_ms, COUNTDOWN_MS);
        }
    }

    #[test]
    fn when_restarting_after_a_finish_then_best_time_survives() {
        let mut session = running_session(1, None);
        session.update(4200.0, false);
        session.register_checkpoint(0);

        session.restart_run();

        assert!(session.state().best_ms.is_some());
        assert_eq!(session.best_times().best_splits_ms.len(), 1);
    }

    #[test]
    fn when_countdown_is_sliced_differently_then_run_starts_after_exactly_three_seconds() {
        for slice in [1.0, 7.0, 16.0, 100.0, 999.0] {
            let mut session = RaceSession::new(2, None);
            session.update(0.0, true);
            let mut total = 0.0;
            while session.phase() == RacePhase::Countdown {
                session.update(slice, false);
                total += slice;
            }

            let overflow = session.state().elapsed_ms;
            assert!((total - overflow - COUNTDOWN_MS).abs() < 1e-9, "slice {slice}");
        }
    }

    #[test]
    fn when_countdown_ends_then_go_flash_shows_and_then_expires() {
        let mut session = RaceSession::new(2, None);

        session.update(100.0, true);
        assert_eq!(session.phase(), RacePhase::Countdown);
        assert!(session.state().countdown_remaining_ms < COUNTDOWN_MS);
        assert_eq!(session.state().go_flash_remaining_ms, 0.0);

        session.update(4000.0, false);
        assert_eq!(session.phase(), RacePhase::Running);
        assert!(session.state().go_flash_remaining_ms > 0.0);

        session.update(1000.0, false);
        assert_eq!(session.state().go_flash_remaining_ms, 0.0);
    }

    #[test]
    fn when_slower_than_best_split_then_delta_is_positive() {
        let best = BestTimes {
            best_ms: Some(15_000.0),
            best_splits_ms: vec![5_000.0, 12_000.0],
        };
        let mut session = running_session(2, Some(best));
        session.update(5_200.0, false);

        let result = session.register_checkpoint(0);

        let state = session.state();
        assert_eq!(state.last_split_ms, Some(state.elapsed_ms));
        assert!(state.last_split_ms.is_some_and(|split| split > 5_000.0));
        assert!(state.last_split_delta_ms.is_some_and(|delta| delta > 0.0));
        assert_eq!(result.split_delta_ms, state.last_split_delta_ms);
    }

    #[test]
    fn when_finish_is_slower_than_best_then_best_is_kept() {
        let best = BestTimes {
            best_ms: Some(2_000.0),
            best_splits_ms: vec![2_000.0],
        };
        let mut session = running_session(1, Some(best));
        session.update(3_000.0, false);

        let result = session.register_checkpoint(0);

        assert!(result.finished);
        assert!(!result.improved_best);
        assert_eq!(session.state().best_ms, Some(2_000.0));
        assert_eq!(session.state().best_splits_ms, Some(vec![2_000.0]));
    }

    #[test]
    fn when_no_best_split_is_stored_then_delta_is_none() {
        let mut session = running_session(2, None);

        let result = session.register_checkpoint(0);

        assert_eq!(result.split_delta_ms, None);
    }
}
