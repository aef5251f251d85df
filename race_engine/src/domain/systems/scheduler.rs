// Fixed-step accumulator turning variable frame deltas into whole simulation ticks.

use tracing::warn;

pub const DEFAULT_FIXED_STEP: f32 = 1.0 / 120.0;
pub const MAX_SUBSTEPS: u32 = 6;

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    step: f32,
    accumulator: f32,
}

impl FixedStepScheduler {
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            warn!(step, fallback = DEFAULT_FIXED_STEP, "invalid fixed step, using default");
            DEFAULT_FIXED_STEP
        };
        Self {
            step,
            accumulator: 0.0,
        }
    }

    pub fn from_hz(hz: f32) -> Self {
        Self::new(1.0 / hz)
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Adds a frame's worth of wall-clock time. Non-finite or negative deltas add nothing.
    pub fn accumulate(&mut self, frame_delta: f32) {
        if frame_delta.is_finite() && frame_delta > 0.0 {
            self.accumulator += frame_delta;
        }
    }

    /// Takes one whole step out of the accumulator, or `None` when the frame is done.
    ///
    /// The step is removed before the caller ticks, so a [`reset`](Self::reset) from inside the
    /// tick ends the frame with an empty accumulator. Once `ticks_run` reaches [`MAX_SUBSTEPS`]
    /// the leftover time is discarded so a long stall never turns into a burst of catch-up ticks.
    pub fn next_step(&mut self, ticks_run: u32) -> Option<f32> {
        if ticks_run >= MAX_SUBSTEPS {
            self.accumulator = 0.0;
            return None;
        }
        if self.accumulator < self.step {
            return None;
        }
        self.accumulator -= self.step;
        Some(self.step)
    }

    /// Runs `tick` once per whole step contained in the accumulated time and returns how many
    /// ticks ran.
    pub fn advance<F>(&mut self, frame_delta: f32, mut tick: F) -> u32
    where
        F: FnMut(f32),
    {
        self.accumulate(frame_delta);

        let mut substeps = 0;
        while let Some(step) = self.next_step(substeps) {
            tick(step);
            substeps += 1;
        }
        substeps
    }
}

impl Default for FixedStepScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_frame_covers_two_steps_then_two_ticks_of_exact_step_run() {
        let mut scheduler = FixedStepScheduler::new(0.01);
        let mut steps = Vec::new();

        let ran = scheduler.advance(0.025, |dt| steps.push(dt));

        assert_eq!(ran, 2);
        assert_eq!(steps, vec![0.01, 0.01]);
        assert!((scheduler.accumulator() - 0.005).abs() < 1e-6);
    }

    #[test]
    fn when_delta_is_huge_then_at_most_six_ticks_run_and_accumulator_resets() {
        let mut scheduler = FixedStepScheduler::default();
        let mut count = 0;

        let ran = scheduler.advance(10.0, |_| count += 1);

        assert_eq!(ran, MAX_SUBSTEPS);
        assert_eq!(count, 6);
        assert_eq!(scheduler.accumulator(), 0.0);
    }

    #[test]
    fn when_delta_is_negative_or_nan_then_nothing_accumulates() {
        let mut scheduler = FixedStepScheduler::default();

        assert_eq!(scheduler.advance(-1.0, |_| {}), 0);
        assert_eq!(scheduler.advance(f32::NAN, |_| {}), 0);
        assert_eq!(scheduler.accumulator(), 0.0);
    }

    #[test]
    fn when_step_is_not_positive_then_default_step_is_used() {
        assert_eq!(FixedStepScheduler::new(0.0).step(), DEFAULT_FIXED_STEP);
        assert_eq!(FixedStepScheduler::new(f32::INFINITY).step(), DEFAULT_FIXED_STEP);
    }

    #[test]
    fn when_small_frames_accumulate_then_a_tick_runs_once_enough_time_passed() {
        let mut scheduler = FixedStepScheduler::new(0.01);

        assert_eq!(scheduler.advance(0.004, |_| {}), 0);
        assert_eq!(scheduler.advance(0.004, |_| {}), 0);
        assert_eq!(scheduler.advance(0.004, |_| {}), 1);
    }

    #[test]
    fn when_reset_between_steps_then_the_frame_ends_with_an_empty_accumulator() {
        let mut scheduler = FixedStepScheduler::new(0.01);
        scheduler.accumulate(0.035);

        assert_eq!(scheduler.next_step(0), Some(0.01));
        scheduler.reset();

        assert_eq!(scheduler.next_step(1), None);
        assert_eq!(scheduler.accumulator(), 0.0);
    }
}
