//! Accuracy and revision-effect metrics.

use serde::{Deserialize, Serialize};

/// Correctness pair for one instance: the unrevised first-pass answer and the
/// revised answer, both scored against gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correctness {
    pub default_correct: bool,
    pub revised_correct: bool,
}

/// Aggregate over all scored instances.
///
/// `improve_rate` is the fraction of initially-wrong instances the revision
/// fixed; `worse_rate` the fraction of initially-right instances it broke.
/// Both are `None` when their denominator is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub instances: usize,
    pub acc_default: f64,
    pub acc_revised: f64,
    pub improve_rate: Option<f64>,
    pub worse_rate: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Metrics {
    pairs: Vec<Correctness>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, pair: Correctness) {
        self.pairs.push(pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn report(&self) -> MetricsReport {
        let total = self.pairs.len();
        let rate = |count: usize, denom: usize| count as f64 / denom as f64;

        let default_right = self.pairs.iter().filter(|p| p.default_correct).count();
        let revised_right = self.pairs.iter().filter(|p| p.revised_correct).count();

        let initially_wrong = total - default_right;
        let fixed = self
            .pairs
            .iter()
            .filter(|p| !p.default_correct && p.revised_correct)
            .count();
        let broken = self
            .pairs
            .iter()
            .filter(|p| p.default_correct && !p.revised_correct)
            .count();

        MetricsReport {
            instances: total,
            acc_default: if total > 0 { rate(default_right, total) } else { 0.0 },
            acc_revised: if total > 0 { rate(revised_right, total) } else { 0.0 },
            improve_rate: (initially_wrong > 0).then(|| rate(fixed, initially_wrong)),
            worse_rate: (default_right > 0).then(|| rate(broken, default_right)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(default_correct: bool, revised_correct: bool) -> Correctness {
        Correctness {
            default_correct,
            revised_correct,
        }
    }

    #[test]
    fn rates_are_conditioned_on_the_initial_outcome() {
        let mut metrics = Metrics::new();
        metrics.update(pair(false, true)); // fixed
        metrics.update(pair(false, false)); // still wrong
        metrics.update(pair(true, true)); // kept
        metrics.update(pair(true, false)); // broken

        let report = metrics.report();
        assert_eq!(report.instances, 4);
        assert!((report.acc_default - 0.5).abs() < 1e-9);
        assert!((report.acc_revised - 0.5).abs() < 1e-9);
        assert!((report.improve_rate.expect("rate") - 0.5).abs() < 1e-9);
        assert!((report.worse_rate.expect("rate") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_denominators_yield_no_rate() {
        let mut metrics = Metrics::new();
        metrics.update(pair(true, true));
        let report = metrics.report();
        assert_eq!(report.improve_rate, None);
        assert_eq!(report.worse_rate, Some(0.0));

        let report = Metrics::new().report();
        assert_eq!(report.instances, 0);
        assert_eq!(report.improve_rate, None);
        assert_eq!(report.worse_rate, None);
    }
}
