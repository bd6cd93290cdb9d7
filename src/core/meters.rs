// File: src/core/meters.rs
use crate::core::edit_distance::EditDistanceMeter;
use std::time::{Duration, Instant};

/// Elapsed-time accumulator that can be paused and resumed.
#[derive(Debug, Clone, Default)]
pub struct TimeMeter {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl TimeMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(start) = self.running_since.take() {
            self.accumulated += start.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(start) => self.accumulated + start.elapsed(),
            None => self.accumulated,
        }
    }

    /// Elapsed seconds.
    pub fn value(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The meters of one test run. The `*_slice` meters cover the whole run, the
/// plain ones are reset before every reported sample.
#[derive(Debug, Clone, Default)]
pub struct TestMeters {
    pub timer: TimeMeter,
    pub wer: EditDistanceMeter,
    pub ler: EditDistanceMeter,
    pub wer_slice: EditDistanceMeter,
    pub ler_slice: EditDistanceMeter,
}

impl TestMeters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores one utterance into both the run totals and the per-sample meters.
    pub fn score(
        &mut self,
        letter_prediction: &[String],
        letter_target: &[String],
        word_prediction: &[String],
        word_target: &[String],
    ) {
        self.ler_slice.add(letter_prediction, letter_target);
        self.wer_slice.add(word_prediction, word_target);

        self.ler.reset();
        self.wer.reset();
        self.ler.add(letter_prediction, letter_target);
        self.wer.add(word_prediction, word_target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn timer_accumulates_only_while_running() {
        let mut timer = TimeMeter::new();
        assert_eq!(timer.elapsed(), Duration::ZERO);
        timer.resume();
        assert!(timer.is_running());
        std::thread::sleep(Duration::from_millis(5));
        timer.stop();
        let first = timer.elapsed();
        assert!(first >= Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.elapsed(), first);
        timer.reset();
        assert_eq!(timer.value(), 0.0);
    }

    #[test]
    fn resume_twice_keeps_original_start() {
        let mut timer = TimeMeter::new();
        timer.resume();
        std::thread::sleep(Duration::from_millis(5));
        timer.resume();
        timer.stop();
        assert!(timer.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn score_keeps_slice_and_resets_display() {
        let mut meters = TestMeters::new();
        meters.score(&strings("a b"), &strings("a b"), &strings("ab"), &strings("ab"));
        meters.score(&strings("a c"), &strings("a b"), &strings("ac"), &strings("ab"));
        assert_eq!(meters.ler.value(), 50.0);
        assert_eq!(meters.wer.value(), 100.0);
        assert_eq!(meters.ler_slice.value(), 25.0);
        assert_eq!(meters.wer_slice.value(), 50.0);
    }
}
