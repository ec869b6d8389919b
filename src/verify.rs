/// Candidate Species Verification Module
///
/// Checks every candidate species against the live iNaturalist API to see
/// which ones resolve to a taxon and carry enough flowering observations to
/// produce a statewide baseline.
///
/// Use this before adding species to the candidate list.

use crate::analysis::groupings::GroupedObservations;
use crate::config::AnalysisConfig;
use crate::ingest::inat::InatClient;
use crate::logging::{self, Stage};
use crate::model::{Observation, PhenologyError, TaxonRecord};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub analysis_date: NaiveDate,
    pub results: Vec<SpeciesVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesVerification {
    pub species: String,
    pub status: VerificationStatus,
    pub resolved: bool,
    pub taxon_id: Option<u64>,
    pub observation_count: usize,
    /// Baseline years meeting the statewide per-year minimum.
    pub qualifying_baseline_years: usize,
    pub current_year_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    /// Baseline is usable and the current year has sightings
    Success,
    /// Baseline is usable but nothing has been seen this year yet
    PartialSuccess,
    Failed,
}

impl SpeciesVerification {
    fn failed(species: &str, message: String) -> Self {
        SpeciesVerification {
            species: species.to_string(),
            status: VerificationStatus::Failed,
            resolved: false,
            taxon_id: None,
            observation_count: 0,
            qualifying_baseline_years: 0,
            current_year_count: 0,
            error_message: Some(message),
        }
    }
}

// ============================================================================
// Coverage Assessment
// ============================================================================

/// Grades a resolved species' observations without touching the network.
pub fn assess_coverage(
    species: &str,
    taxon: &TaxonRecord,
    observations: &[Observation],
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> SpeciesVerification {
    let grouped = GroupedObservations::build(observations, cfg.current_year, analysis_date);
    let statewide = grouped.statewide();
    let qualifying = cfg
        .baseline_years()
        .filter(|y| statewide.get(y).is_some_and(|doys| doys.len() >= cfg.state.min_year_obs))
        .count();
    let current = grouped.current_total();

    let (status, error_message) = if qualifying < cfg.state.min_baseline_years {
        (
            VerificationStatus::Failed,
            Some(format!(
                "only {} of {} required baseline years",
                qualifying, cfg.state.min_baseline_years
            )),
        )
    } else if current == 0 {
        (VerificationStatus::PartialSuccess, None)
    } else {
        (VerificationStatus::Success, None)
    };

    SpeciesVerification {
        species: species.to_string(),
        status,
        resolved: true,
        taxon_id: Some(taxon.taxon_id),
        observation_count: observations.len(),
        qualifying_baseline_years: qualifying,
        current_year_count: current,
        error_message,
    }
}

// ============================================================================
// Live Verification
// ============================================================================

pub fn verify_species(
    client: &InatClient,
    species: &str,
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> SpeciesVerification {
    let taxon = match client.resolve_taxon(species) {
        Ok(Some(taxon)) => taxon,
        Ok(None) => {
            let err = PhenologyError::TaxonNotResolved(species.to_string());
            return SpeciesVerification::failed(species, err.to_string());
        }
        Err(e) => {
            logging::log_species_failure(Stage::Taxon, species, "resolve", e.as_ref());
            return SpeciesVerification::failed(species, e.to_string());
        }
    };

    let Some(d1) = NaiveDate::from_ymd_opt(cfg.baseline_start, 1, 1) else {
        return SpeciesVerification::failed(species, format!("invalid baseline start {}", cfg.baseline_start));
    };
    let max_records = client.config().max_records_per_species;
    match client.fetch_species_observations(species, taxon.taxon_id, d1, analysis_date, max_records) {
        Ok(observations) => assess_coverage(species, &taxon, &observations, cfg, analysis_date),
        Err(e) => {
            logging::log_species_failure(Stage::Ingest, species, "fetch", e.as_ref());
            let mut result = SpeciesVerification::failed(species, e.to_string());
            result.resolved = true;
            result.taxon_id = Some(taxon.taxon_id);
            result
        }
    }
}

pub fn run_verification(
    client: &InatClient,
    species: &[String],
    cfg: &AnalysisConfig,
    analysis_date: NaiveDate,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        analysis_date,
        results: Vec::new(),
        summary: VerificationSummary { total: species.len(), ..VerificationSummary::default() },
    };

    println!("\nVerifying {} candidate species...", species.len());
    for name in species {
        print!("  {} ... ", name);
        let result = verify_species(client, name, cfg, analysis_date);

        match result.status {
            VerificationStatus::Success => {
                println!(
                    "✓ OK ({} observations, {} baseline years, {} this year)",
                    result.observation_count, result.qualifying_baseline_years, result.current_year_count
                );
                report.summary.working += 1;
            }
            VerificationStatus::PartialSuccess => {
                println!(
                    "⚠ Baseline OK but no sightings yet ({} baseline years)",
                    result.qualifying_baseline_years
                );
                report.summary.partial += 1;
            }
            VerificationStatus::Failed => {
                println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                report.summary.failed += 1;
            }
        }
        report.results.push(result);
    }
    report
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "═".repeat(60);
    println!("\n{}", rule);
    println!("VERIFICATION SUMMARY ({})", report.analysis_date);
    println!("{}", rule);
    println!();
    println!(
        "Species:  {}/{} usable  ({} awaiting sightings, {} failed)",
        report.summary.working + report.summary.partial,
        report.summary.total,
        report.summary.partial,
        report.summary.failed
    );

    let usable = report.summary.working + report.summary.partial;
    let success_rate = if report.summary.total > 0 {
        (usable as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!("Overall Success Rate: {:.1}% ({}/{})", success_rate, usable, report.summary.total);
    println!("{}", rule);
}
