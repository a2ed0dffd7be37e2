//! Ad insertion schedule
//!
//! A cycle of 100 message steps, `round(frequency * 100)` of them marked at
//! random. Every message advances the cycle by one step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Steps in one schedule cycle
pub const SCHEDULE_STEPS: usize = 100;

#[derive(Debug, Clone)]
pub struct InsertionSchedule {
    marks: [bool; SCHEDULE_STEPS],
    step: usize,
}

impl InsertionSchedule {
    /// Build a schedule for `frequency` in `[0, 1]` using `rng`
    pub fn new<R: Rng + ?Sized>(frequency: f64, rng: &mut R) -> Self {
        let count = (frequency.clamp(0.0, 1.0) * SCHEDULE_STEPS as f64).round() as usize;

        let mut marks = [false; SCHEDULE_STEPS];
        for idx in rand::seq::index::sample(rng, SCHEDULE_STEPS, count) {
            marks[idx] = true;
        }
        Self { marks, step: 0 }
    }

    /// Build a schedule from OS entropy
    pub fn random(frequency: f64) -> Self {
        Self::new(frequency, &mut StdRng::from_entropy())
    }

    /// Deterministic schedule for a seed
    pub fn seeded(frequency: f64, seed: u64) -> Self {
        Self::new(frequency, &mut StdRng::seed_from_u64(seed))
    }

    /// Number of marked steps per cycle
    pub fn marked(&self) -> usize {
        self.marks.iter().filter(|&&m| m).count()
    }

    /// Messages seen so far
    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether the next message gets an ad; advances the cycle
    pub fn should_insert(&mut self) -> bool {
        let insert = self.marks[self.step % SCHEDULE_STEPS];
        self.step += 1;
        insert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.5, 50)]
    #[case(0.333, 33)]
    #[case(1.0, 100)]
    fn test_marked_count(#[case] frequency: f64, #[case] expected: usize) {
        assert_eq!(InsertionSchedule::seeded(frequency, 7).marked(), expected);
    }

    #[test]
    fn test_cycle_matches_marks() {
        let mut schedule = InsertionSchedule::seeded(0.25, 42);
        let first: Vec<bool> = (0..SCHEDULE_STEPS).map(|_| schedule.should_insert()).collect();
        let second: Vec<bool> = (0..SCHEDULE_STEPS).map(|_| schedule.should_insert()).collect();

        assert_eq!(first.iter().filter(|&&b| b).count(), 25);
        assert_eq!(first, second);
        assert_eq!(schedule.step(), 200);
    }

    #[test]
    fn test_every_message_advances() {
        let mut schedule = InsertionSchedule::seeded(0.0, 1);
        for _ in 0..5 {
            assert!(!schedule.should_insert());
        }
        assert_eq!(schedule.step(), 5);
    }

    #[test]
    fn test_full_frequency_always_inserts() {
        let mut schedule = InsertionSchedule::random(1.0);
        assert!((0..150).all(|_| schedule.should_insert()));
    }
}
