/// Multi-year onset trend across indicator species.
///
/// Consumes the per-species, per-year baseline onsets, normalizes each
/// species against its own median so that early and late bloomers can be
/// averaged, and fits an ordinary least-squares line through the yearly
/// means. An optional herbarium comparison places a historical (pre-2000)
/// onset on the same anomaly scale.

use crate::analysis::baseline::yearly_onsets;
use crate::analysis::onset::{median, onset_estimate, round_to, sample_stdev};
use crate::config::AnalysisConfig;
use crate::model::{Observation, PhenologyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-species onsets keyed by scientific name, then year.
pub type OnsetTable = BTreeMap<String, BTreeMap<i32, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOnset {
    pub species: String,
    pub year: i32,
    pub onset_doy: f64,
    pub species_median_doy: f64,
    pub anomaly_days: f64,
    pub zscore: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearAggregate {
    pub year: i32,
    pub species_count: usize,
    pub mean_normalized_anomaly_days: f64,
    pub mean_zscore: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope_days_per_year: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HerbariumComparison {
    pub species: String,
    pub herbarium_flowering_obs: usize,
    pub herbarium_onset_doy: f64,
    pub recent_median_onset_doy: f64,
    pub comparable_anomaly_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub baseline_start: i32,
    pub baseline_end: i32,
    pub species_used: usize,
    pub normalized: Vec<NormalizedOnset>,
    pub yearly_aggregate: Vec<YearAggregate>,
    pub linear_trend: LinearFit,
    pub herbarium: Vec<HerbariumComparison>,
    /// Mean comparable anomaly across herbarium species, if any qualified.
    pub herbarium_mean_anomaly_days: Option<f64>,
    /// Trend refit with the herbarium mean as zero.
    pub herbarium_zero_trend: Option<LinearFit>,
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Ordinary least squares `y = slope * x + intercept`.
///
/// Fewer than two points gives a flat line through the single value (or 0);
/// zero spread in x gives a flat line through the mean of y.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> LinearFit {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return LinearFit {
            slope_days_per_year: 0.0,
            intercept: ys.first().copied().unwrap_or(0.0),
        };
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let xbar = xs.iter().sum::<f64>() / n as f64;
    let ybar = ys.iter().sum::<f64>() / n as f64;
    let num: f64 = xs.iter().zip(ys).map(|(x, y)| (x - xbar) * (y - ybar)).sum();
    let den: f64 = xs.iter().map(|x| (x - xbar).powi(2)).sum();
    if den == 0.0 {
        return LinearFit { slope_days_per_year: 0.0, intercept: ybar };
    }
    let slope = num / den;
    LinearFit {
        slope_days_per_year: slope,
        intercept: ybar - slope * xbar,
    }
}

/// Statewide baseline onsets for one species, or `None` if it has too few
/// qualifying years to take part in the trend.
pub fn species_onsets(
    observations: &[Observation],
    cfg: &AnalysisConfig,
) -> Result<Option<BTreeMap<i32, f64>>, PhenologyError> {
    let mut by_year: BTreeMap<i32, Vec<u32>> = BTreeMap::new();
    for obs in observations {
        by_year.entry(obs.year()).or_default().push(obs.day_of_year());
    }
    let onsets = yearly_onsets(
        &by_year,
        cfg.baseline_years(),
        cfg.trend_min_obs_per_year,
        cfg.onset_percentile,
    )?;
    if onsets.len() >= cfg.trend_min_years && !onsets.is_empty() {
        Ok(Some(onsets))
    } else {
        Ok(None)
    }
}

/// Subtracts each species' median onset and scales by its sample deviation.
pub fn normalize(table: &OnsetTable) -> Result<Vec<NormalizedOnset>, PhenologyError> {
    let mut rows = Vec::new();
    for (species, yearly) in table {
        let values: Vec<f64> = yearly.values().copied().collect();
        let med = median(&values)?;
        let sd = sample_stdev(&values).unwrap_or(0.0);
        for (&year, &onset) in yearly {
            let anomaly = onset - med;
            let z = if sd > 0.0 { anomaly / sd } else { 0.0 };
            rows.push(NormalizedOnset {
                species: species.clone(),
                year,
                onset_doy: round_to(onset, 3),
                species_median_doy: round_to(med, 3),
                anomaly_days: round_to(anomaly, 3),
                zscore: round_to(z, 3),
            });
        }
    }
    Ok(rows)
}

/// Mean normalized anomaly per year; years with no species are omitted.
pub fn aggregate_by_year(rows: &[NormalizedOnset]) -> Vec<YearAggregate> {
    let mut by_year: BTreeMap<i32, Vec<&NormalizedOnset>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }
    by_year
        .into_iter()
        .map(|(year, rs)| {
            let n = rs.len() as f64;
            YearAggregate {
                year,
                species_count: rs.len(),
                mean_normalized_anomaly_days: round_to(rs.iter().map(|r| r.anomaly_days).sum::<f64>() / n, 3),
                mean_zscore: round_to(rs.iter().map(|r| r.zscore).sum::<f64>() / n, 3),
            }
        })
        .collect()
}

/// Herbarium onset minus recent median onset, for one species.
///
/// Returns `None` when there are fewer than `cfg.herbarium_min_doys` records.
pub fn compare_herbarium(
    species: &str,
    herbarium_doys: &[u32],
    recent_onsets: &BTreeMap<i32, f64>,
    cfg: &AnalysisConfig,
) -> Result<Option<HerbariumComparison>, PhenologyError> {
    if herbarium_doys.len() < cfg.herbarium_min_doys || herbarium_doys.is_empty() {
        return Ok(None);
    }
    let herb_onset = onset_estimate(herbarium_doys, cfg.onset_percentile)?;
    let values: Vec<f64> = recent_onsets.values().copied().collect();
    let recent_median = median(&values)?;
    Ok(Some(HerbariumComparison {
        species: species.to_string(),
        herbarium_flowering_obs: herbarium_doys.len(),
        herbarium_onset_doy: round_to(herb_onset, 3),
        recent_median_onset_doy: round_to(recent_median, 3),
        comparable_anomaly_days: round_to(herb_onset - recent_median, 3),
    }))
}

// ---------------------------------------------------------------------------
// Full trend
// ---------------------------------------------------------------------------

/// Builds the trend summary from an onset table and any herbarium records.
///
/// `herbarium` maps species to their historical flowering days of year;
/// species absent from `table` are ignored.
pub fn build_trend(
    table: &OnsetTable,
    herbarium: &BTreeMap<String, Vec<u32>>,
    cfg: &AnalysisConfig,
) -> Result<TrendSummary, PhenologyError> {
    let normalized = normalize(table)?;
    let yearly = aggregate_by_year(&normalized);
    let xs: Vec<f64> = yearly.iter().map(|y| y.year as f64).collect();
    let ys: Vec<f64> = yearly.iter().map(|y| y.mean_normalized_anomaly_days).collect();
    let fit = linear_regression(&xs, &ys);

    let mut comparisons = Vec::new();
    for (species, onsets) in table {
        let Some(doys) = herbarium.get(species) else {
            continue;
        };
        if let Some(c) = compare_herbarium(species, doys, onsets, cfg)? {
            comparisons.push(c);
        }
    }
    let herbarium_mean = if comparisons.is_empty() {
        None
    } else {
        Some(
            comparisons.iter().map(|c| c.comparable_anomaly_days).sum::<f64>()
                / comparisons.len() as f64,
        )
    };
    let herbarium_zero_trend = herbarium_mean.map(|shift| {
        let shifted: Vec<f64> = ys.iter().map(|y| y - shift).collect();
        linear_regression(&xs, &shifted)
    });

    Ok(TrendSummary {
        baseline_start: cfg.baseline_start,
        baseline_end: cfg.baseline_end,
        species_used: table.len(),
        normalized,
        yearly_aggregate: yearly,
        linear_trend: LinearFit {
            slope_days_per_year: round_to(fit.slope_days_per_year, 4),
            intercept: round_to(fit.intercept, 4),
        },
        herbarium: comparisons,
        herbarium_mean_anomaly_days: herbarium_mean.map(|m| round_to(m, 4)),
        herbarium_zero_trend,
    })
}
