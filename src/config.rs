/// Run configuration
///
/// All tunables of the engine live in one immutable `AnalysisConfig` value
/// that is passed explicitly into every analysis function. Defaults are
/// derived from the analysis year; a TOML file may override any of them.
///
/// ```toml
/// onset_percentile = 0.2
/// indicator_limit = 20
///
/// [zone]
/// min_year_obs = 3
/// min_baseline_years = 4
///
/// [ingest]
/// max_records_per_species = 1400
/// trend_max_records = 2000
/// ```

use crate::model::PhenologyError;
use crate::status::STATUS_THRESHOLD_DAYS;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of calendar years in the baseline window.
pub const BASELINE_YEARS: i32 = 9;

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// Admission thresholds for one grouping granularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchemeThresholds {
    /// Observations a group-year needs before its onset counts.
    pub min_year_obs: usize,
    /// Qualifying baseline years a group needs to be admitted.
    pub min_baseline_years: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub current_year: i32,
    pub baseline_start: i32,
    pub baseline_end: i32,
    pub onset_percentile: f64,
    pub status_threshold_days: f64,
    pub zone: SchemeThresholds,
    pub side: SchemeThresholds,
    pub state: SchemeThresholds,
    pub indicator_limit: usize,
    pub recent_observation_limit: usize,
    pub trend_min_obs_per_year: usize,
    pub trend_min_years: usize,
    pub herbarium_start_year: i32,
    pub herbarium_end_year: i32,
    pub herbarium_min_doys: usize,
}

impl AnalysisConfig {
    /// Defaults for a run whose current year is `current_year`.
    pub fn for_year(current_year: i32) -> Self {
        AnalysisConfig {
            current_year,
            baseline_start: current_year - BASELINE_YEARS,
            baseline_end: current_year - 1,
            onset_percentile: 0.2,
            status_threshold_days: STATUS_THRESHOLD_DAYS,
            zone: SchemeThresholds { min_year_obs: 3, min_baseline_years: 4 },
            side: SchemeThresholds { min_year_obs: 2, min_baseline_years: 4 },
            state: SchemeThresholds { min_year_obs: 2, min_baseline_years: 4 },
            indicator_limit: 20,
            recent_observation_limit: 15,
            trend_min_obs_per_year: 3,
            trend_min_years: 5,
            herbarium_start_year: 1950,
            herbarium_end_year: 2000,
            herbarium_min_doys: 5,
        }
    }

    /// Defaults for a run on `date`.
    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_year(date.year())
    }

    /// Baseline years in ascending order.
    pub fn baseline_years(&self) -> impl Iterator<Item = i32> {
        self.baseline_start..=self.baseline_end
    }

    /// Checks internal consistency. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), PhenologyError> {
        if self.baseline_start > self.baseline_end {
            return Err(PhenologyError::Config(format!(
                "baseline_start {} is after baseline_end {}",
                self.baseline_start, self.baseline_end
            )));
        }
        if self.baseline_end >= self.current_year {
            return Err(PhenologyError::Config(format!(
                "baseline_end {} must precede current_year {}",
                self.baseline_end, self.current_year
            )));
        }
        if !(0.0..=1.0).contains(&self.onset_percentile) {
            return Err(PhenologyError::Config(format!(
                "onset_percentile {} must be within [0, 1]",
                self.onset_percentile
            )));
        }
        if self.status_threshold_days <= 0.0 {
            return Err(PhenologyError::Config(
                "status_threshold_days must be positive".to_string(),
            ));
        }
        for (name, t) in [("zone", self.zone), ("side", self.side), ("state", self.state)] {
            if t.min_year_obs == 0 {
                return Err(PhenologyError::Config(format!(
                    "{}.min_year_obs must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ingestion configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub api_base: String,
    /// iNaturalist place id for Washington State.
    pub place_id: u32,
    /// Annotation term "Plant Phenology".
    pub flowering_term_id: u32,
    /// Annotation value "Flowering".
    pub flowering_value_id: u32,
    pub per_page: usize,
    pub max_records_per_species: usize,
    /// Record cap per indicator when the trend run fetches baseline years.
    pub trend_max_records: usize,
    pub user_agent: String,
    /// Pause after every successful request, in milliseconds.
    pub pause_ms: u64,
    pub timeout_secs: u64,
    pub herbarium_base: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            api_base: "https://api.inaturalist.org/v1".to_string(),
            place_id: 46,
            flowering_term_id: 12,
            flowering_value_id: 13,
            per_page: 200,
            max_records_per_species: 1400,
            trend_max_records: 2000,
            user_agent: "wa-spring-indicator/1.0".to_string(),
            pause_ms: 120,
            timeout_secs: 45,
            herbarium_base: "https://www.pnwherbaria.org/data/results.php".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// TOML overrides
// ---------------------------------------------------------------------------

fn config_error(e: impl std::fmt::Display) -> PhenologyError {
    PhenologyError::Config(e.to_string())
}

/// Parses TOML text on top of the defaults for `date`.
///
/// The defaults are built for the file's `current_year` (or the year of
/// `date`), so overriding `current_year` alone shifts the baseline window
/// with it unless the window bounds are also given explicitly. A scheme
/// table such as `[zone]` replaces both of its thresholds.
pub fn parse_config(
    text: &str,
    date: NaiveDate,
) -> Result<(AnalysisConfig, IngestConfig), PhenologyError> {
    let mut file: toml::Table = toml::from_str(text).map_err(config_error)?;

    let ingest = match file.remove("ingest") {
        Some(section) => section.try_into::<IngestConfig>().map_err(config_error)?,
        None => IngestConfig::default(),
    };

    let current_year = match file.get("current_year") {
        Some(toml::Value::Integer(y)) => i32::try_from(*y)
            .map_err(|_| PhenologyError::Config(format!("current_year {} is out of range", y)))?,
        _ => date.year(),
    };
    let mut merged = match toml::Value::try_from(AnalysisConfig::for_year(current_year)).map_err(config_error)? {
        toml::Value::Table(table) => table,
        other => return Err(PhenologyError::Config(format!("unexpected default layout: {}", other.type_str()))),
    };
    for (key, value) in file {
        merged.insert(key, value);
    }
    let cfg: AnalysisConfig = toml::Value::Table(merged).try_into().map_err(config_error)?;
    cfg.validate()?;

    Ok((cfg, ingest))
}

/// Loads a TOML config file, or the defaults when `path` is `None`.
pub fn load_config(
    path: Option<&Path>,
    date: NaiveDate,
) -> Result<(AnalysisConfig, IngestConfig), PhenologyError> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .map_err(|e| PhenologyError::Io(format!("{}: {}", p.display(), e)))?;
            parse_config(&text, date)
        }
        None => Ok((AnalysisConfig::for_date(date), IngestConfig::default())),
    }
}
