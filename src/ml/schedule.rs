// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// With --do_warmup the rate climbs linearly from 0 to the base rate
// over the first warmup_ratio of all optimizer updates, then decays
// linearly back to 0 at the last update:
//
//   lr
//    │    ╱╲
//    │   ╱  ╲
//    │  ╱    ╲
//    │ ╱      ╲
//    └─────────────► update
//      warmup  total
//
// Without it the base rate is used throughout.
//
// `step` is the number of updates already applied, so the very
// first update of a warmed-up run uses a rate of 0.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrSchedule {
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
    decay:        bool,
}

impl LrSchedule {
    pub fn constant(base_lr: f64) -> Self {
        Self { base_lr, warmup_steps: 0, total_steps: 0, decay: false }
    }

    pub fn linear_warmup(base_lr: f64, warmup_ratio: f64, total_steps: usize) -> Self {
        let warmup_steps = (total_steps as f64 * warmup_ratio) as usize;
        Self { base_lr, warmup_steps, total_steps, decay: true }
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        if !self.decay {
            return self.base_lr;
        }
        let factor = if step < self.warmup_steps {
            step as f64 / self.warmup_steps as f64
        } else {
            let remaining = self.total_steps.saturating_sub(step) as f64;
            let span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
            remaining / span
        };
        self.base_lr * factor
    }
}

/// Optimizer updates for a whole run; a partial accumulation window
/// at the end of each epoch still counts as one update.
pub fn total_updates(num_examples: usize, batch_size: usize, accumulation: usize, epochs: usize) -> usize {
    let batches = num_examples.div_ceil(batch_size);
    batches.div_ceil(accumulation) * epochs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn constant_ignores_step() {
        let s = LrSchedule::constant(1e-3);
        assert!(close(s.lr_at(0), 1e-3));
        assert!(close(s.lr_at(10_000), 1e-3));
    }

    #[test]
    fn warmup_then_decay() {
        // 100 updates, 10 of warmup
        let s = LrSchedule::linear_warmup(1.0, 0.1, 100);
        assert_eq!(s.warmup_steps(), 10);
        assert!(close(s.lr_at(0), 0.0));
        assert!(close(s.lr_at(5), 0.5));
        assert!(close(s.lr_at(10), 1.0));
        assert!(close(s.lr_at(55), 0.5));
        assert!(close(s.lr_at(100), 0.0));
        assert!(close(s.lr_at(150), 0.0));
    }

    #[test]
    fn zero_warmup_decays_from_base() {
        let s = LrSchedule::linear_warmup(2.0, 0.0, 4);
        assert!(close(s.lr_at(0), 2.0));
        assert!(close(s.lr_at(2), 1.0));
    }

    #[test]
    fn total_updates_rounds_up() {
        // 10 examples / batch 3 → 4 batches; / accumulation 3 → 2 updates
        assert_eq!(total_updates(10, 3, 3, 5), 10);
        assert_eq!(total_updates(8, 8, 1, 2), 2);
        assert_eq!(total_updates(0, 8, 1, 2), 0);
    }
}
