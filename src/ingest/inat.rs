/// iNaturalist API client
///
/// Resolves scientific names to taxa and retrieves research-grade flowering
/// observations for Washington. Requests are strictly sequential with a
/// short pause after each success; HTTP 429 and transport failures are
/// retried with bounded, growing delays.
///
/// API Documentation: https://api.inaturalist.org/v1/docs/

use crate::config::IngestConfig;
use crate::ingest::RetryPolicy;
use crate::logging::{self, Stage};
use crate::model::{Observation, PhenologyError, TaxonRecord};
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;
use std::thread;
use std::time::Duration;

const TAXON_URL_BASE: &str = "https://www.inaturalist.org/taxa";
const OBSERVATION_URL_BASE: &str = "https://www.inaturalist.org/observations";

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TaxaResponse {
    #[serde(default)]
    pub results: Vec<TaxonResult>,
}

#[derive(Debug, Deserialize)]
pub struct TaxonResult {
    pub id: u64,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub preferred_common_name: Option<String>,
    pub default_photo: Option<Photo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Photo {
    pub url: Option<String>,
    pub medium_url: Option<String>,
    pub square_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ObservationsResponse {
    #[serde(default)]
    pub results: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
pub struct RawObservation {
    pub id: Option<u64>,
    pub observed_on: Option<String>,
    pub geojson: Option<GeoJson>,
    /// Number or numeric string depending on the record's age.
    pub elevation: Option<serde_json::Value>,
    pub uri: Option<String>,
    pub photos: Option<Vec<Photo>>,
    pub place_guess: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeoJson {
    pub coordinates: Option<Vec<f64>>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Picks the exact species-rank match for `scientific_name`, if any.
///
/// Matching is case-insensitive on the trimmed name. The photo prefers the
/// medium rendition, then square, then the bare url.
pub fn select_taxon(response: TaxaResponse, scientific_name: &str) -> Option<TaxonRecord> {
    let target = scientific_name.trim().to_lowercase();
    response.results.into_iter().find_map(|result| {
        let name = result.name.as_deref().unwrap_or("").trim().to_lowercase();
        if name != target || result.rank.as_deref() != Some("species") {
            return None;
        }
        let photo = result.default_photo.unwrap_or_default();
        Some(TaxonRecord {
            taxon_id: result.id,
            common_name: result
                .preferred_common_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| scientific_name.to_string()),
            taxon_url: format!("{}/{}", TAXON_URL_BASE, result.id),
            photo_url: photo.medium_url.or(photo.square_url).or(photo.url),
        })
    })
}

fn parse_elevation(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts a raw API record into an `Observation`.
///
/// Returns `None` when the date is missing or malformed, or when the record
/// lacks a `[lon, lat]` coordinate pair.
pub fn parse_observation(raw: RawObservation, species: &str, taxon_id: u64) -> Option<Observation> {
    let observed_on = NaiveDate::parse_from_str(raw.observed_on.as_deref()?, "%Y-%m-%d").ok()?;
    let coords = raw.geojson?.coordinates?;
    if coords.len() != 2 {
        return None;
    }
    let (lon, lat) = (coords[0], coords[1]);

    let uri = match (raw.uri, raw.id) {
        (Some(u), _) if !u.is_empty() => u,
        (_, Some(id)) => format!("{}/{}", OBSERVATION_URL_BASE, id),
        _ => format!("{}/unknown", OBSERVATION_URL_BASE),
    };
    let photo_url = raw
        .photos
        .and_then(|p| p.into_iter().next())
        .and_then(|p| p.url);

    Some(Observation {
        species: species.to_string(),
        taxon_id,
        observed_on,
        latitude: lat,
        longitude: lon,
        elevation_m: parse_elevation(raw.elevation.as_ref()),
        uri,
        photo_url,
        place_guess: raw.place_guess,
    })
}

/// Parses one page of observations. Returns the admitted observations and
/// the number of raw records on the page (used for pagination).
pub fn parse_observations_page(
    body: &str,
    species: &str,
    taxon_id: u64,
) -> Result<(Vec<Observation>, usize), PhenologyError> {
    let page: ObservationsResponse =
        serde_json::from_str(body).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
    let raw_count = page.results.len();
    let parsed = page
        .results
        .into_iter()
        .filter_map(|raw| parse_observation(raw, species, taxon_id))
        .collect();
    Ok((parsed, raw_count))
}

// ============================================================================
// URL Construction
// ============================================================================

/// Taxon autocomplete URL for a scientific name.
pub fn build_taxa_url(cfg: &IngestConfig, scientific_name: &str) -> Result<Url, PhenologyError> {
    Url::parse_with_params(
        &format!("{}/taxa/autocomplete", cfg.api_base),
        &[
            ("q", scientific_name),
            ("rank", "species"),
            ("is_active", "true"),
            ("per_page", "30"),
        ],
    )
    .map_err(|e| PhenologyError::ParseError(e.to_string()))
}

/// Observation search URL for one page of flowering, research-grade records.
pub fn build_observations_url(
    cfg: &IngestConfig,
    taxon_id: u64,
    d1: NaiveDate,
    d2: NaiveDate,
    page: usize,
) -> Result<Url, PhenologyError> {
    let params: Vec<(&str, String)> = vec![
        ("taxon_id", taxon_id.to_string()),
        ("place_id", cfg.place_id.to_string()),
        ("quality_grade", "research".to_string()),
        ("iconic_taxa", "Plantae".to_string()),
        ("term_id", cfg.flowering_term_id.to_string()),
        ("term_value_id", cfg.flowering_value_id.to_string()),
        ("d1", d1.format("%Y-%m-%d").to_string()),
        ("d2", d2.format("%Y-%m-%d").to_string()),
        ("order_by", "observed_on".to_string()),
        ("order", "asc".to_string()),
        ("per_page", cfg.per_page.to_string()),
        ("page", page.to_string()),
    ];
    Url::parse_with_params(&format!("{}/observations", cfg.api_base), &params)
        .map_err(|e| PhenologyError::ParseError(e.to_string()))
}

// ============================================================================
// API Client
// ============================================================================

pub struct InatClient {
    http: reqwest::blocking::Client,
    cfg: IngestConfig,
    retry: RetryPolicy,
}

impl InatClient {
    pub fn new(cfg: IngestConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(InatClient { http, cfg, retry: RetryPolicy::default() })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.cfg
    }

    /// GETs `url` and returns the body, retrying per the retry policy.
    fn get_text(&self, url: &Url) -> Result<String, Box<dyn std::error::Error>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.http.get(url.clone()).header("Accept", "application/json").send() {
                Ok(response) if response.status().is_success() => {
                    let body = response.text()?;
                    thread::sleep(Duration::from_millis(self.cfg.pause_ms));
                    return Ok(body);
                }
                Ok(response) => {
                    let code = response.status().as_u16();
                    match self.retry.http_delay(code, attempt) {
                        Some(delay) => {
                            logging::warn(
                                Stage::Ingest,
                                None,
                                &format!("throttled by iNaturalist, retrying in {:.0}s...", delay.as_secs_f64()),
                            );
                            thread::sleep(delay);
                        }
                        None => return Err(PhenologyError::HttpError(code).into()),
                    }
                }
                Err(e) => match self.retry.transport_delay(attempt) {
                    Some(delay) => {
                        logging::debug(
                            Stage::Ingest,
                            None,
                            &format!("request failed ({}), retrying in {:.1}s", e, delay.as_secs_f64()),
                        );
                        thread::sleep(delay);
                    }
                    None => return Err(e.into()),
                },
            }
        }
    }

    /// Resolves a scientific name. `Ok(None)` means no exact species match.
    pub fn resolve_taxon(&self, scientific_name: &str) -> Result<Option<TaxonRecord>, Box<dyn std::error::Error>> {
        let url = build_taxa_url(&self.cfg, scientific_name)?;
        let body = self.get_text(&url)?;
        let response: TaxaResponse =
            serde_json::from_str(&body).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
        Ok(select_taxon(response, scientific_name))
    }

    /// All flowering observations of a taxon between `d1` and `d2` inclusive.
    ///
    /// Pages are requested in ascending date order until a short page or
    /// the per-species record cap is reached.
    pub fn fetch_species_observations(
        &self,
        species: &str,
        taxon_id: u64,
        d1: NaiveDate,
        d2: NaiveDate,
        max_records: usize,
    ) -> Result<Vec<Observation>, Box<dyn std::error::Error>> {
        let mut observations = Vec::new();
        let mut page = 1;
        loop {
            let url = build_observations_url(&self.cfg, taxon_id, d1, d2, page)?;
            let body = self.get_text(&url)?;
            let (parsed, raw_count) = parse_observations_page(&body, species, taxon_id)?;
            observations.extend(parsed);

            if raw_count == 0 || raw_count < self.cfg.per_page {
                break;
            }
            if observations.len() >= max_records {
                break;
            }
            page += 1;
        }
        Ok(observations)
    }
}

// ============================================================================
// Tests
// ============================================================================
