//! Interquartile-range outlier trimming
//!
//! Percentiles use linear interpolation between the two closest ranks of
//! the sorted samples, the same definition as numpy's default `percentile`.

/// Percentile `p` (0–100) of already sorted data, `None` when empty
pub fn percentile(sorted: &[i64], p: f64) -> Option<f64> {
    match sorted {
        [] => None,
        [only] => Some(*only as f64),
        _ => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let low = sorted[lower] as f64;
            if lower == upper {
                Some(low)
            } else {
                let weight = rank - lower as f64;
                Some(low + (sorted[upper] as f64 - low) * weight)
            }
        }
    }
}

/// Inclusive bounds outside of which a sample is an outlier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    pub p25: f64,
    pub p75: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// Fences for `samples`, `None` when there are no samples
    pub fn compute(samples: &[i64], factor: f64) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let p25 = percentile(&sorted, 25.0)?;
        let p75 = percentile(&sorted, 75.0)?;
        let cut_off = (p75 - p25) * factor;
        Some(Self {
            p25,
            p75,
            lower: p25 - cut_off,
            upper: p75 + cut_off,
        })
    }

    pub fn contains(&self, sample: i64) -> bool {
        let x = sample as f64;
        x >= self.lower && x <= self.upper
    }
}

/// Drop samples outside `[p25 - iqr * factor, p75 + iqr * factor]`
///
/// Kept samples stay in input order. An empty input gives an empty output.
pub fn filter_outliers(samples: &[i64], factor: f64) -> Vec<i64> {
    match Fences::compute(samples, factor) {
        Some(fences) => samples
            .iter()
            .copied()
            .filter(|&x| fences.contains(x))
            .collect(),
        None => Vec::new(),
    }
}
