/// Baseline and anomaly evaluation with granularity fallback.
///
/// One evaluator handles every granularity; the schemes differ only in
/// which groups they read and how many observations they require. The
/// fallback chain runs zone → side → state and stops at the first scheme
/// that admits at least one group.
///
/// # Clock injection
/// The analysis date is always a parameter. For groups with no sighting
/// this year, the anomaly is measured against the analysis date's day of
/// year, so results depend on it; reading the system clock here would make
/// the engine non-deterministic.

use crate::analysis::groupings::{GroupView, GroupedObservations, YearMap};
use crate::analysis::onset::{median, onset_estimate, round_to};
use crate::config::{AnalysisConfig, SchemeThresholds};
use crate::model::{Granularity, PhenologyError, ZoneResult};
use crate::status::{classify_status_with, status_without_sighting};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Grouping schemes
// ---------------------------------------------------------------------------

/// A granularity paired with the admission thresholds it is evaluated under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupingScheme {
    Zone(SchemeThresholds),
    Side(SchemeThresholds),
    State(SchemeThresholds),
}

impl GroupingScheme {
    /// Fallback order, finest first.
    pub fn fallback_chain(cfg: &AnalysisConfig) -> [GroupingScheme; 3] {
        [
            GroupingScheme::Zone(cfg.zone),
            GroupingScheme::Side(cfg.side),
            GroupingScheme::State(cfg.state),
        ]
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            GroupingScheme::Zone(_) => Granularity::Zone,
            GroupingScheme::Side(_) => Granularity::Side,
            GroupingScheme::State(_) => Granularity::State,
        }
    }

    pub fn thresholds(&self) -> SchemeThresholds {
        match *self {
            GroupingScheme::Zone(t) | GroupingScheme::Side(t) | GroupingScheme::State(t) => t,
        }
    }
}

/// Admitted groups for a species plus the granularity that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineOutcome {
    pub granularity: Granularity,
    pub results: Vec<ZoneResult>,
    /// Granularities tried, in order, including the successful one.
    pub attempted: Vec<Granularity>,
}

// ---------------------------------------------------------------------------
// Per-year onsets
// ---------------------------------------------------------------------------

/// Onset for every baseline year with at least `min_year_obs` observations.
///
/// This is the per-year intermediate the trend analysis consumes. Years
/// below the minimum are simply absent from the map.
pub fn yearly_onsets(
    years: &YearMap,
    baseline: impl Iterator<Item = i32>,
    min_year_obs: usize,
    percentile: f64,
) -> Result<BTreeMap<i32, f64>, PhenologyError> {
    let mut onsets = BTreeMap::new();
    for year in baseline {
        let doys = match years.get(&year) {
            Some(d) if d.len() >= min_year_obs => d,
            _ => continue,
        };
        onsets.insert(year, onset_estimate(doys, percentile)?);
    }
    Ok(onsets)
}

// ---------------------------------------------------------------------------
// Single-scheme evaluation
// ---------------------------------------------------------------------------

/// Evaluates one group. Returns `None` if it is not admitted.
pub fn evaluate_group(
    group: &GroupView<'_>,
    thresholds: SchemeThresholds,
    cfg: &AnalysisConfig,
    today_doy: u32,
) -> Result<Option<ZoneResult>, PhenologyError> {
    let onsets = yearly_onsets(
        group.years,
        cfg.baseline_years(),
        thresholds.min_year_obs,
        cfg.onset_percentile,
    )?;
    if onsets.len() < thresholds.min_baseline_years || onsets.is_empty() {
        return Ok(None);
    }
    let baseline_values: Vec<f64> = onsets.values().copied().collect();
    let baseline_doy = median(&baseline_values)?;

    let current_doys = group
        .years
        .get(&cfg.current_year)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let has_current = !current_doys.is_empty();

    let (current_doy, anomaly, status) = if has_current {
        let current = onset_estimate(current_doys, cfg.onset_percentile)?;
        let anomaly = current - baseline_doy;
        (
            Some(current),
            anomaly,
            classify_status_with(anomaly, cfg.status_threshold_days),
        )
    } else {
        let anomaly = today_doy as f64 - baseline_doy;
        (None, anomaly, status_without_sighting(anomaly, cfg.status_threshold_days))
    };

    Ok(Some(ZoneResult {
        zone: group.name.to_string(),
        baseline_doy: round_to(baseline_doy, 1),
        current_doy: current_doy.map(|d| round_to(d, 1)),
        anomaly_days: round_to(anomaly, 1),
        status,
        baseline_years: onsets.len(),
        current_obs: group.current_obs,
        has_current,
    }))
}

/// Evaluates every group under one scheme and keeps the admitted ones.
pub fn evaluate_scheme(
    grouped: &GroupedObservations<'_>,
    scheme: GroupingScheme,
    cfg: &AnalysisConfig,
    today_doy: u32,
) -> Result<Vec<ZoneResult>, PhenologyError> {
    let thresholds = scheme.thresholds();
    let mut rows = Vec::new();
    for group in grouped.groups(scheme.granularity()) {
        if let Some(row) = evaluate_group(&group, thresholds, cfg, today_doy)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Runs the fallback chain and returns the first non-empty result.
///
/// Returns `Ok(None)` when no scheme admits any group; the species then has
/// insufficient coverage and produces no summary.
pub fn evaluate_with_fallback(
    grouped: &GroupedObservations<'_>,
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> Result<Option<BaselineOutcome>, PhenologyError> {
    let today_doy = analysis_date.ordinal();
    let mut attempted = Vec::with_capacity(3);
    for scheme in GroupingScheme::fallback_chain(cfg) {
        attempted.push(scheme.granularity());
        let results = evaluate_scheme(grouped, scheme, cfg, today_doy)?;
        if !results.is_empty() {
            return Ok(Some(BaselineOutcome {
                granularity: scheme.granularity(),
                results,
                attempted,
            }));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BloomStatus, Observation};

    const WEST_LOW: (f64, f64, Option<f64>) = (47.6, -122.3, Some(50.0));
    const WEST_MID: (f64, f64, Option<f64>) = (47.6, -122.3, Some(700.0));
    const EAST_LOW: (f64, f64, Option<f64>) = (46.6, -120.5, Some(300.0));

    fn obs_on(year: i32, doy: u32, at: (f64, f64, Option<f64>)) -> Observation {
        Observation {
            species: "Ribes sanguineum".to_string(),
            taxon_id: 48000,
            observed_on: NaiveDate::from_yo_opt(year, doy).unwrap(),
            latitude: at.0,
            longitude: at.1,
            elevation_m: at.2,
            uri: String::new(),
            photo_url: None,
            place_guess: None,
        }
    }

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap() // doy 100
    }

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::for_year(2026)
    }

    #[test]
    fn test_yearly_onsets_skip_thin_years() {
        let mut years = YearMap::new();
        years.insert(2017, vec![70, 72, 75]);
        years.insert(2018, vec![68, 70]);
        years.insert(2016, vec![1, 2, 3]); // outside window
        let onsets = yearly_onsets(&years, 2017..=2025, 3, 0.2).unwrap();
        assert_eq!(onsets.len(), 1);
        assert!((onsets[&2017] - 70.8).abs() < 1e-9);
    }

    #[test]
    fn test_zone_granularity_used_when_dense() {
        let mut data = Vec::new();
        for year in 2018..=2022 {
            for doy in [80, 82, 84] {
                data.push(obs_on(year, doy, WEST_LOW));
            }
        }
        data.push(obs_on(2026, 70, WEST_LOW));
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let outcome = evaluate_with_fallback(&g, &cfg(), fixed_today()).unwrap().unwrap();

        assert_eq!(outcome.granularity, Granularity::Zone);
        assert_eq!(outcome.attempted, vec![Granularity::Zone]);
        assert_eq!(outcome.results.len(), 1);
        let row = &outcome.results[0];
        assert_eq!(row.zone, "west-low");
        assert_eq!(row.baseline_years, 5);
        assert_eq!(row.baseline_doy, 80.8);
        assert_eq!(row.current_doy, Some(70.0));
        assert_eq!(row.anomaly_days, -10.8);
        assert_eq!(row.status, BloomStatus::Early);
        assert!(row.has_current);
        assert_eq!(row.current_obs, 1);
    }

    #[test]
    fn test_falls_back_to_side_when_no_zone_is_admitted() {
        // Two observations a year per zone: below the zone minimum of 3,
        // but two zones on the same side give 4 per side-year.
        let mut data = Vec::new();
        for year in 2019..=2023 {
            data.push(obs_on(year, 90, WEST_LOW));
            data.push(obs_on(year, 92, WEST_LOW));
            data.push(obs_on(year, 95, WEST_MID));
            data.push(obs_on(year, 97, WEST_MID));
        }
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let outcome = evaluate_with_fallback(&g, &cfg(), fixed_today()).unwrap().unwrap();

        assert_eq!(outcome.granularity, Granularity::Side);
        assert_eq!(outcome.attempted, vec![Granularity::Zone, Granularity::Side]);
        assert_eq!(outcome.results[0].zone, "west");
    }

    #[test]
    fn test_falls_back_to_state_when_sides_are_thin() {
        // One per side per year: only the statewide bucket reaches 2.
        let mut data = Vec::new();
        for year in 2017..=2020 {
            data.push(obs_on(year, 100, WEST_LOW));
            data.push(obs_on(year, 110, EAST_LOW));
        }
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let outcome = evaluate_with_fallback(&g, &cfg(), fixed_today()).unwrap().unwrap();

        assert_eq!(outcome.granularity, Granularity::State);
        assert_eq!(outcome.attempted.len(), 3);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].zone, "statewide");
        assert_eq!(outcome.results[0].baseline_years, 4);
    }

    #[test]
    fn test_no_admitted_group_at_any_level_yields_none() {
        let data = vec![obs_on(2018, 90, WEST_LOW), obs_on(2019, 91, WEST_LOW)];
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let outcome = evaluate_with_fallback(&g, &cfg(), fixed_today()).unwrap();
        assert!(outcome.is_none(), "sparse species must not produce a baseline");
    }

    #[test]
    fn test_no_current_sighting_uses_today_and_may_be_late() {
        let mut data = Vec::new();
        for year in 2018..=2022 {
            for doy in [71, 71, 71] {
                data.push(obs_on(year, doy, WEST_LOW));
            }
        }
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let rows = evaluate_scheme(&g, GroupingScheme::Zone(cfg().zone), &cfg(), 100).unwrap();
        assert_eq!(rows[0].anomaly_days, 29.0);
        assert_eq!(rows[0].status, BloomStatus::Late);
        assert_eq!(rows[0].current_doy, None);
        assert!(!rows[0].has_current);

        let rows = evaluate_scheme(&g, GroupingScheme::Zone(cfg().zone), &cfg(), 60).unwrap();
        assert_eq!(rows[0].anomaly_days, -11.0);
        assert_eq!(rows[0].status, BloomStatus::Pending);
    }

    #[test]
    fn test_baseline_is_median_not_mean() {
        let mut data = Vec::new();
        for (year, doy) in [(2018, 80), (2019, 81), (2020, 82), (2021, 83), (2022, 160)] {
            for _ in 0..3 {
                data.push(obs_on(year, doy, WEST_LOW));
            }
        }
        let g = GroupedObservations::build(&data, 2026, fixed_today());
        let rows = evaluate_scheme(&g, GroupingScheme::Zone(cfg().zone), &cfg(), 100).unwrap();
        assert_eq!(rows[0].baseline_doy, 82.0, "outlier year must not drag the baseline");
    }
}
