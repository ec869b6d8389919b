/// Statistical aggregation engine for bloom timing.
///
/// The engine is a pure function of (observations, configuration, analysis
/// date): no I/O, no clock reads, no shared state between runs.
///
/// Submodules:
/// - `onset`     — percentile/median order statistics.
/// - `groupings` — organizes a species' observations by zone, side, state.
/// - `baseline`  — per-group baseline vs. current year, with fallback.
/// - `weights`   — evidence weighting shared by every aggregation level.
/// - `species`   — zone results → species status.
/// - `rollup`    — indicator selection, zone and statewide rollups.
/// - `trend`     — multi-year trend over baseline onsets.

pub mod baseline;
pub mod groupings;
pub mod onset;
pub mod rollup;
pub mod species;
pub mod trend;
pub mod weights;

use crate::config::AnalysisConfig;
use crate::model::{IndicatorSet, Observation, PhenologyError, SpeciesSummary, TaxonRecord};
use chrono::NaiveDate;

/// Everything the engine needs about one resolved species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesInput {
    pub species: String,
    pub taxon: TaxonRecord,
    pub observations: Vec<Observation>,
}

/// Summaries for every species with enough coverage, in input order.
pub fn summarize_all(
    inputs: &[SpeciesInput],
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> Result<Vec<SpeciesSummary>, PhenologyError> {
    let mut summaries = Vec::new();
    for input in inputs {
        if let Some(summary) = species::summarize_species(
            &input.species,
            &input.taxon,
            &input.observations,
            cfg,
            analysis_date,
        )? {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}

/// Runs the whole engine: per-species summaries, selection, rollups.
pub fn run(
    inputs: &[SpeciesInput],
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> Result<IndicatorSet, PhenologyError> {
    let summaries = summarize_all(inputs, cfg, analysis_date)?;
    Ok(rollup::build_indicator_set(summaries, cfg))
}
