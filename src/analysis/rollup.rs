/// Indicator selection and regional rollups.
///
/// Species are ranked by data quality, the top N become indicators, and the
/// indicators are combined per zone and statewide.

use crate::analysis::onset::round_to;
use crate::analysis::weights::{evidence_weight, WeightedMean};
use crate::config::AnalysisConfig;
use crate::model::{BloomStatus, IndicatorSet, OverallStatus, SpeciesSummary, ZoneRollup};
use crate::status::{classify_status_with, interpretation};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Ordering for indicator ranking, best first.
///
/// Keys, each descending: granularity rank, zones used, current-year
/// observation total, then absolute anomaly as the final tie-break.
pub fn compare_indicators(a: &SpeciesSummary, b: &SpeciesSummary) -> Ordering {
    b.granularity
        .rank()
        .cmp(&a.granularity.rank())
        .then_with(|| b.zones_used.cmp(&a.zones_used))
        .then_with(|| b.current_obs_total.cmp(&a.current_obs_total))
        .then_with(|| b.anomaly_days.abs().total_cmp(&a.anomaly_days.abs()))
}

/// Ranks summaries and keeps the top `limit`. Full ties keep input order.
pub fn pick_indicator_species(mut summaries: Vec<SpeciesSummary>, limit: usize) -> Vec<SpeciesSummary> {
    summaries.sort_by(compare_indicators);
    summaries.truncate(limit);
    summaries
}

// ---------------------------------------------------------------------------
// Rollups
// ---------------------------------------------------------------------------

/// Weighted anomaly per zone across all indicators, sorted by zone name.
pub fn build_zone_summary(indicators: &[SpeciesSummary], threshold_days: f64) -> Vec<ZoneRollup> {
    let mut by_zone: BTreeMap<&str, WeightedMean> = BTreeMap::new();
    for species in indicators {
        for zone in &species.zones {
            by_zone
                .entry(zone.zone.as_str())
                .or_default()
                .add(zone.anomaly_days, evidence_weight(zone.baseline_years, zone.current_obs));
        }
    }
    by_zone
        .into_iter()
        .map(|(zone, mean)| {
            let anomaly = mean.mean();
            ZoneRollup {
                zone: zone.to_string(),
                anomaly_days: round_to(anomaly, 2),
                status: classify_status_with(anomaly, threshold_days),
                species_count: mean.count(),
            }
        })
        .collect()
}

/// Statewide status. Pending species carry no signal and are skipped.
pub fn overall_status(indicators: &[SpeciesSummary], cfg: &AnalysisConfig) -> OverallStatus {
    let mut mean = WeightedMean::new();
    for species in indicators.iter().filter(|s| s.status != BloomStatus::Pending) {
        mean.add(
            species.anomaly_days,
            evidence_weight(species.zones_used, species.current_obs_total),
        );
    }
    let anomaly = mean.mean();
    OverallStatus {
        status: classify_status_with(anomaly, cfg.status_threshold_days),
        anomaly_days: round_to(anomaly, 2),
        species_count: indicators.len(),
        species_with_signal: mean.count(),
        interpretation: interpretation(
            anomaly,
            cfg.status_threshold_days,
            cfg.baseline_start,
            cfg.baseline_end,
        ),
    }
}

/// Selection plus both rollups.
pub fn build_indicator_set(summaries: Vec<SpeciesSummary>, cfg: &AnalysisConfig) -> IndicatorSet {
    let indicators = pick_indicator_species(summaries, cfg.indicator_limit);
    let zones = build_zone_summary(&indicators, cfg.status_threshold_days);
    let overall = overall_status(&indicators, cfg);
    IndicatorSet { indicators, zones, overall }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Granularity, ZoneResult};

    fn zone(name: &str, anomaly: f64, years: usize, obs: usize) -> ZoneResult {
        ZoneResult {
            zone: name.to_string(),
            baseline_doy: 90.0,
            current_doy: Some(90.0 + anomaly),
            anomaly_days: anomaly,
            status: classify_status_with(anomaly, 7.0),
            baseline_years: years,
            current_obs: obs,
            has_current: true,
        }
    }

    fn summary(
        name: &str,
        granularity: Granularity,
        zones: Vec<ZoneResult>,
        current_obs_total: usize,
        anomaly: f64,
        status: BloomStatus,
    ) -> SpeciesSummary {
        SpeciesSummary {
            species: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            common_name: name.to_string(),
            taxon_id: 1,
            taxon_url: String::new(),
            photo_url: None,
            status,
            anomaly_days: anomaly,
            zones_used: zones.len(),
            granularity,
            zones,
            current_obs_total,
            has_current_data: status != BloomStatus::Pending,
            observation_count: 100,
            current_year_observations: Vec::new(),
        }
    }

    #[test]
    fn test_granularity_outranks_evidence() {
        let fine = summary("Fine", Granularity::Zone, vec![zone("west-low", 0.0, 4, 1)], 1, 0.0, BloomStatus::Normal);
        let coarse = summary(
            "Coarse",
            Granularity::Side,
            vec![zone("west", 0.0, 9, 50), zone("east", 0.0, 9, 50)],
            100,
            0.0,
            BloomStatus::Normal,
        );
        let ranked = pick_indicator_species(vec![coarse, fine], 20);
        assert_eq!(ranked[0].species, "Fine");
    }

    #[test]
    fn test_ties_break_by_descending_absolute_anomaly() {
        let z = || vec![zone("west-low", 0.0, 4, 2)];
        let a = summary("Small", Granularity::Zone, z(), 2, 1.5, BloomStatus::Normal);
        let b = summary("Large negative", Granularity::Zone, z(), 2, -9.0, BloomStatus::Early);
        let c = summary("Medium", Granularity::Zone, z(), 2, 4.0, BloomStatus::Normal);
        let ranked = pick_indicator_species(vec![a, b, c], 20);
        let names: Vec<_> = ranked.iter().map(|s| s.species.as_str()).collect();
        assert_eq!(names, vec!["Large negative", "Medium", "Small"]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let z = || vec![zone("west-low", 0.0, 4, 2)];
        let a = summary("First", Granularity::Zone, z(), 2, 3.0, BloomStatus::Normal);
        let b = summary("Second", Granularity::Zone, z(), 2, -3.0, BloomStatus::Normal);
        let ranked = pick_indicator_species(vec![a, b], 20);
        assert_eq!(ranked[0].species, "First");
        assert_eq!(ranked[1].species, "Second");
    }

    #[test]
    fn test_selection_truncates_to_limit() {
        let all: Vec<_> = (0..30)
            .map(|i| summary(&format!("S{}", i), Granularity::State, vec![zone("statewide", 0.0, 4, i)], i, 0.0, BloomStatus::Normal))
            .collect();
        let ranked = pick_indicator_species(all, 20);
        assert_eq!(ranked.len(), 20);
        assert_eq!(ranked[0].species, "S29");
    }

    #[test]
    fn test_zone_rollup_equal_weights_cancel_out() {
        let a = summary("A", Granularity::Zone, vec![zone("west-low", 10.0, 4, 2)], 2, 10.0, BloomStatus::Late);
        let b = summary("B", Granularity::Zone, vec![zone("west-low", -10.0, 2, 4)], 4, -10.0, BloomStatus::Early);
        let rows = build_zone_summary(&[a, b], 7.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].anomaly_days, 0.0);
        assert_eq!(rows[0].status, BloomStatus::Normal);
        assert_eq!(rows[0].species_count, 2);
    }

    #[test]
    fn test_zone_rollup_sorted_by_name() {
        let a = summary(
            "A",
            Granularity::Zone,
            vec![zone("west-mid", -20.0, 4, 1), zone("east-low", 1.0, 4, 1)],
            2,
            -9.5,
            BloomStatus::Early,
        );
        let rows = build_zone_summary(&[a], 7.0);
        let names: Vec<_> = rows.iter().map(|r| r.zone.as_str()).collect();
        assert_eq!(names, vec!["east-low", "west-mid"]);
    }

    #[test]
    fn test_overall_skips_pending_species() {
        let cfg = AnalysisConfig::for_year(2026);
        let early = summary("Early", Granularity::Zone, vec![zone("west-low", -10.0, 4, 3)], 3, -10.0, BloomStatus::Early);
        let pending = summary("Pending", Granularity::Zone, vec![zone("east-low", 50.0, 4, 0)], 0, 50.0, BloomStatus::Pending);
        let overall = overall_status(&[early, pending], &cfg);
        assert_eq!(overall.anomaly_days, -10.0);
        assert_eq!(overall.status, BloomStatus::Early);
        assert_eq!(overall.species_count, 2);
        assert_eq!(overall.species_with_signal, 1);
        assert_eq!(
            overall.interpretation,
            "Flowering is trending earlier than the 2017-2025 baseline."
        );
    }

    #[test]
    fn test_overall_with_no_signal_is_neutral() {
        let cfg = AnalysisConfig::for_year(2026);
        let overall = overall_status(&[], &cfg);
        assert_eq!(overall.anomaly_days, 0.0);
        assert_eq!(overall.status, BloomStatus::Normal);
        assert_eq!(overall.species_with_signal, 0);
    }
}
