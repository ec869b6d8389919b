/// Core data types for the Washington spring bloom watch.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond small conversions and no I/O.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single research-grade flowering observation.
///
/// Produced by `ingest::inat::parse_observation`; records missing a date or
/// coordinates never become an `Observation`. Consumed read-only by the
/// analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub species: String,
    pub taxon_id: u64,
    pub observed_on: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: Option<f64>,
    pub uri: String,
    pub photo_url: Option<String>,
    pub place_guess: Option<String>,
}

impl Observation {
    /// Day of year of the observation date (1–366).
    pub fn day_of_year(&self) -> u32 {
        self.observed_on.ordinal()
    }

    pub fn year(&self) -> i32 {
        self.observed_on.year()
    }
}

/// Outcome of resolving a scientific name against the taxon API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub taxon_id: u64,
    pub common_name: String,
    pub taxon_url: String,
    pub photo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Classification types
// ---------------------------------------------------------------------------

/// Bloom timing status, shared by zone, species, and statewide levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomStatus {
    Early,
    Normal,
    Late,
    /// No current-year evidence and no lateness signal yet.
    Pending,
}

impl fmt::Display for BloomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BloomStatus::Early => write!(f, "early"),
            BloomStatus::Normal => write!(f, "normal"),
            BloomStatus::Late => write!(f, "late"),
            BloomStatus::Pending => write!(f, "pending"),
        }
    }
}

/// Geographic grouping actually used for a species after fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Zone,
    Side,
    State,
}

impl Granularity {
    /// Ranking weight used by indicator selection: finer is better.
    pub fn rank(self) -> u8 {
        match self {
            Granularity::Zone => 2,
            Granularity::Side => 1,
            Granularity::State => 0,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Zone => write!(f, "zone"),
            Granularity::Side => write!(f, "side"),
            Granularity::State => write!(f, "state"),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Baseline versus current-year evaluation of one group for one species.
///
/// `zone` holds the group key at whichever granularity produced it:
/// `"west-low"`, `"east"`, or `"statewide"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneResult {
    pub zone: String,
    pub baseline_doy: f64,
    pub current_doy: Option<f64>,
    pub anomaly_days: f64,
    pub status: BloomStatus,
    pub baseline_years: usize,
    pub current_obs: usize,
    pub has_current: bool,
}

/// Link to a current-year observation, kept for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRef {
    pub observed_on: NaiveDate,
    pub uri: String,
    pub place_guess: Option<String>,
    pub photo_url: Option<String>,
}

impl From<&Observation> for ObservationRef {
    fn from(obs: &Observation) -> Self {
        ObservationRef {
            observed_on: obs.observed_on,
            uri: obs.uri.clone(),
            place_guess: obs.place_guess.clone(),
            photo_url: obs.photo_url.clone(),
        }
    }
}

/// Species-level rollup of its admitted zone results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub species: String,
    pub slug: String,
    pub common_name: String,
    pub taxon_id: u64,
    pub taxon_url: String,
    pub photo_url: Option<String>,
    pub status: BloomStatus,
    pub anomaly_days: f64,
    pub zones_used: usize,
    pub granularity: Granularity,
    /// Sorted by descending absolute anomaly.
    pub zones: Vec<ZoneResult>,
    pub current_obs_total: usize,
    pub has_current_data: bool,
    pub observation_count: usize,
    /// Newest first.
    pub current_year_observations: Vec<ObservationRef>,
}

/// Weighted anomaly for one zone across all indicator species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRollup {
    pub zone: String,
    pub anomaly_days: f64,
    pub status: BloomStatus,
    pub species_count: usize,
}

/// Statewide status across indicator species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStatus {
    pub status: BloomStatus,
    pub anomaly_days: f64,
    pub species_count: usize,
    pub species_with_signal: usize,
    pub interpretation: String,
}

/// Terminal output of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub indicators: Vec<SpeciesSummary>,
    pub zones: Vec<ZoneRollup>,
    pub overall: OverallStatus,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or analyzing phenology data.
#[derive(Debug, PartialEq)]
pub enum PhenologyError {
    /// A percentile or median was requested over an empty sample.
    EmptySample,
    /// Non-2xx HTTP response from an upstream API.
    HttpError(u16),
    /// The response body could not be deserialized.
    ParseError(String),
    /// No exact species-rank match for the scientific name.
    TaxonNotResolved(String),
    /// The configuration file was unreadable or invalid.
    Config(String),
    /// Reading or writing a local file failed.
    Io(String),
}

impl fmt::Display for PhenologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhenologyError::EmptySample => write!(f, "percentile requires a non-empty sample"),
            PhenologyError::HttpError(code) => write!(f, "HTTP error: {}", code),
            PhenologyError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PhenologyError::TaxonNotResolved(name) => write!(f, "Taxon not resolved: {}", name),
            PhenologyError::Config(msg) => write!(f, "Config error: {}", msg),
            PhenologyError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PhenologyError {}
