/// Published outputs
///
/// The analyze run writes `spring_status.json` (pretty-printed) and
/// `spring_status.js`, which assigns the same document to
/// `window.SPRING_STATUS` for static pages. The trend run writes
/// `baseline_trend_summary.json`.

use crate::analysis::trend::TrendSummary;
use crate::config::{AnalysisConfig, IngestConfig};
use crate::model::{IndicatorSet, OverallStatus, PhenologyError, SpeciesSummary, ZoneRollup};
use crate::zones::scheme_description;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STATUS_JSON: &str = "spring_status.json";
pub const STATUS_JS: &str = "spring_status.js";
pub const TREND_JSON: &str = "baseline_trend_summary.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const METHOD_NOTES: [&str; 3] = [
    "Based on iNaturalist research-grade flowering annotations in Washington.",
    "Observation effort is uneven across regions and species.",
    "Cascade split uses a coarse longitude approximation.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportYears {
    pub baseline_start: i32,
    pub baseline_end: i32,
    pub current_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloweringFilter {
    pub term_id: u32,
    pub term_value_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub flowering_filter: FloweringFilter,
    pub onset_metric: String,
    pub status_threshold_days: f64,
    pub geography_buckets: String,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringReport {
    pub generated_at: String,
    pub analysis_date: NaiveDate,
    pub wa_place_id: u32,
    pub years: ReportYears,
    pub method: Method,
    pub overall: OverallStatus,
    pub zone_summary: Vec<ZoneRollup>,
    pub indicator_species: Vec<SpeciesSummary>,
    pub unresolved_species: Vec<String>,
}

/// Trend output with its generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub generated_at: String,
    #[serde(flatten)]
    pub summary: TrendSummary,
}

fn onset_metric(percentile: f64) -> String {
    format!(
        "{}th percentile day-of-year of flowering observations",
        (percentile * 100.0).round() as i64
    )
}

/// Assembles the published document. `generated_at` is injected so the
/// output is reproducible.
pub fn build_report(
    set: IndicatorSet,
    unresolved_species: Vec<String>,
    cfg: &AnalysisConfig,
    ingest: &IngestConfig,
    analysis_date: NaiveDate,
    generated_at: DateTime<Utc>,
) -> SpringReport {
    SpringReport {
        generated_at: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        analysis_date,
        wa_place_id: ingest.place_id,
        years: ReportYears {
            baseline_start: cfg.baseline_start,
            baseline_end: cfg.baseline_end,
            current_year: cfg.current_year,
        },
        method: Method {
            flowering_filter: FloweringFilter {
                term_id: ingest.flowering_term_id,
                term_value_id: ingest.flowering_value_id,
            },
            onset_metric: onset_metric(cfg.onset_percentile),
            status_threshold_days: cfg.status_threshold_days,
            geography_buckets: scheme_description(),
            notes: METHOD_NOTES.iter().map(|n| n.to_string()).collect(),
        },
        overall: set.overall,
        zone_summary: set.zones,
        indicator_species: set.indicators,
        unresolved_species,
    }
}

/// The `spring_status.js` payload.
pub fn render_js(report: &SpringReport) -> Result<String, PhenologyError> {
    let compact = serde_json::to_string(report).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
    Ok(format!("window.SPRING_STATUS = {};\n", compact))
}

fn write_file(path: &Path, contents: &str) -> Result<(), PhenologyError> {
    fs::write(path, contents).map_err(|e| PhenologyError::Io(format!("{}: {}", path.display(), e)))
}

/// Writes both status files into `dir`, creating it if needed.
pub fn write_report(report: &SpringReport, dir: &Path) -> Result<Vec<PathBuf>, PhenologyError> {
    fs::create_dir_all(dir).map_err(|e| PhenologyError::Io(format!("{}: {}", dir.display(), e)))?;

    let pretty = serde_json::to_string_pretty(report).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
    let json_path = dir.join(STATUS_JSON);
    write_file(&json_path, &pretty)?;

    let js_path = dir.join(STATUS_JS);
    write_file(&js_path, &render_js(report)?)?;

    Ok(vec![json_path, js_path])
}

/// Reads back a previously written `spring_status.json`.
pub fn read_report(dir: &Path) -> Result<SpringReport, PhenologyError> {
    let path = dir.join(STATUS_JSON);
    let text = fs::read_to_string(&path).map_err(|e| PhenologyError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| PhenologyError::ParseError(e.to_string()))
}

pub fn write_trend(summary: TrendSummary, dir: &Path, generated_at: DateTime<Utc>) -> Result<PathBuf, PhenologyError> {
    fs::create_dir_all(dir).map_err(|e| PhenologyError::Io(format!("{}: {}", dir.display(), e)))?;
    let report = TrendReport {
        generated_at: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        summary,
    };
    let pretty = serde_json::to_string_pretty(&report).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
    let path = dir.join(TREND_JSON);
    write_file(&path, &pretty)?;
    Ok(path)
}
