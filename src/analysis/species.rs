/// Species-level aggregation.
///
/// Combines a species' admitted zone results into one anomaly and status,
/// weighting each zone by how much evidence stands behind it.

use crate::analysis::baseline::evaluate_with_fallback;
use crate::analysis::groupings::GroupedObservations;
use crate::analysis::onset::round_to;
use crate::analysis::weights::{evidence_weight, WeightedMean};
use crate::candidates::slugify;
use crate::config::AnalysisConfig;
use crate::logging::{self, Stage};
use crate::model::{
    BloomStatus, Observation, ObservationRef, PhenologyError, SpeciesSummary, TaxonRecord,
    ZoneResult,
};
use crate::status::classify_status_with;
use chrono::NaiveDate;

/// Species anomaly and status derived from zone results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesSignal {
    pub anomaly_days: f64,
    pub status: BloomStatus,
    pub has_current_data: bool,
}

/// Weighted combination of zone results.
///
/// - zones with current data weigh `max(1, baseline_years) * max(1, current_obs)`
/// - zones without current data but already late weigh `max(1, baseline_years)`
/// - other zones carry no signal
///
/// Status is classified from the anomaly if any zone had current data,
/// otherwise late if any zone was late, otherwise pending.
pub fn aggregate_zones(zones: &[ZoneResult], threshold_days: f64) -> SpeciesSignal {
    let mut mean = WeightedMean::new();
    let mut has_current = false;
    let mut has_late_without_current = false;

    for zone in zones {
        if zone.has_current {
            has_current = true;
            mean.add(zone.anomaly_days, evidence_weight(zone.baseline_years, zone.current_obs));
        } else if zone.status == BloomStatus::Late {
            has_late_without_current = true;
            mean.add(zone.anomaly_days, evidence_weight(zone.baseline_years, 1));
        }
    }

    let anomaly = mean.mean();
    let status = if has_current {
        classify_status_with(anomaly, threshold_days)
    } else if has_late_without_current {
        BloomStatus::Late
    } else {
        BloomStatus::Pending
    };

    SpeciesSignal {
        anomaly_days: round_to(anomaly, 2),
        status,
        has_current_data: has_current,
    }
}

/// Orders zone results by descending absolute anomaly; ties keep their order.
pub fn sort_by_deviation(zones: &mut [ZoneResult]) {
    zones.sort_by(|a, b| b.anomaly_days.abs().total_cmp(&a.anomaly_days.abs()));
}

/// Full per-species analysis: grouping, baseline fallback, aggregation.
///
/// Returns `Ok(None)` when no granularity admits a group.
pub fn summarize_species(
    species: &str,
    taxon: &TaxonRecord,
    observations: &[Observation],
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> Result<Option<SpeciesSummary>, PhenologyError> {
    let grouped = GroupedObservations::build(observations, cfg.current_year, analysis_date);

    let outcome = match evaluate_with_fallback(&grouped, cfg, analysis_date)? {
        Some(o) => o,
        None => {
            logging::info(
                Stage::Analysis,
                Some(species),
                &format!(
                    "skipped: insufficient usable zone/year coverage ({} observations)",
                    observations.len()
                ),
            );
            return Ok(None);
        }
    };

    let signal = aggregate_zones(&outcome.results, cfg.status_threshold_days);
    let mut zones = outcome.results;
    sort_by_deviation(&mut zones);

    logging::debug(
        Stage::Analysis,
        Some(species),
        &format!(
            "{} groups at {} granularity, anomaly {} days ({})",
            zones.len(),
            outcome.granularity,
            signal.anomaly_days,
            signal.status
        ),
    );

    Ok(Some(SpeciesSummary {
        species: species.to_string(),
        slug: slugify(species),
        common_name: taxon.common_name.clone(),
        taxon_id: taxon.taxon_id,
        taxon_url: taxon.taxon_url.clone(),
        photo_url: taxon.photo_url.clone(),
        status: signal.status,
        anomaly_days: signal.anomaly_days,
        zones_used: zones.len(),
        granularity: outcome.granularity,
        zones,
        current_obs_total: grouped.current_total(),
        has_current_data: signal.has_current_data,
        observation_count: observations.len(),
        current_year_observations: grouped
            .recent_current(cfg.recent_observation_limit)
            .into_iter()
            .map(ObservationRef::from)
            .collect(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
