/// Fragment-length distribution of unambiguous read pairs
///
/// The interval between the two mates' starts is tallied for every pair
/// that resolved to a single locus per mate. Its mean and spread are used
/// afterwards to pick the most plausible locus combination of pairs that hit
/// a transcript more than once.
use log::info;

/// Intervals at or above this are not tallied
pub const MAX_FRAGMENT_LENGTH: usize = 20_000;

/// Reject combinations deviating from the mean by this many standard deviations
const MAX_STDDEV: f64 = 2.0;

/// Tally of start-to-start intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentLengthHistogram {
    counts: Vec<u64>,
}

impl Default for FragmentLengthHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentLengthHistogram {
    pub fn new() -> Self {
        Self {
            counts: vec![0; MAX_FRAGMENT_LENGTH],
        }
    }

    /// Tally one interval; returns `false` when it is too long to keep
    pub fn record(&mut self, interval: usize) -> bool {
        match self.counts.get_mut(interval) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean and population standard deviation, or `None` when nothing was tallied
    pub fn stats(&self) -> Option<FragmentLengthStats> {
        let count = self.total();
        if count == 0 {
            return None;
        }

        let sum: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(interval, &c)| interval as f64 * c as f64)
            .sum();
        let mean = sum / count as f64;

        let variance: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(interval, &c)| {
                let d = interval as f64 - mean;
                d * d * c as f64
            })
            .sum::<f64>()
            / count as f64;

        let stats = FragmentLengthStats {
            mean,
            sd: variance.sqrt(),
            count,
        };
        info!(
            "[PE] fragment length from {} unambiguous pairs: mean {:.2}, sd {:.2}",
            stats.count, stats.mean, stats.sd
        );
        Some(stats)
    }
}

/// Summary of the fragment-length distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentLengthStats {
    pub mean: f64,
    pub sd: f64,
    pub count: u64,
}

impl FragmentLengthStats {
    /// Distance of an interval from the mean when it lies strictly within
    /// the accepted spread, `None` otherwise
    pub fn deviation(&self, interval: usize) -> Option<f64> {
        let deviation = (interval as f64 - self.mean).abs();
        (deviation < MAX_STDDEV * self.sd).then_some(deviation)
    }
}
