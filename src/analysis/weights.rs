/// Evidence weighting shared by every aggregation level.
///
/// The heuristic is the same at species, zone-rollup, and statewide level:
/// more years of baseline (or more zones) and more observations earn more
/// trust, with each factor floored at one.

/// `max(1, a) * max(1, b)` as a float weight.
pub fn evidence_weight(a: usize, b: usize) -> f64 {
    (a.max(1) * b.max(1)) as f64
}

/// Running weighted mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedMean {
    numer: f64,
    denom: f64,
    count: usize,
}

impl WeightedMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64, weight: f64) {
        self.numer += value * weight;
        self.denom += weight;
        self.count += 1;
    }

    /// Number of contributions so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Weighted mean, or 0.0 when nothing with weight has been added.
    pub fn mean(&self) -> f64 {
        if self.denom == 0.0 {
            0.0
        } else {
            self.numer / self.denom
        }
    }
}
