/// Consortium of Pacific Northwest Herbaria (CPNWH) specimen export
///
/// Retrieves historical Washington specimen records for a species as a
/// tab-separated text export and reduces them to flowering days of year.
/// Used only by the trend comparison; the core engine never touches it.
///
/// Export form: https://www.pnwherbaria.org/data/search.php

use crate::candidates::split_binomial;
use crate::config::IngestConfig;
use crate::model::PhenologyError;
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use reqwest::Url;
use std::time::Duration;

const COL_PHENOLOGY: &str = "Phenology";
const COL_DAY: &str = "Day Collected";
const COL_MONTH: &str = "Month Collected";
const COL_YEAR: &str = "Year Collected";

/// Export URL for a binomial in `state`. `None` if the name has no epithet.
pub fn build_export_url(cfg: &IngestConfig, species: &str, state: &str) -> Option<Url> {
    let (genus, epithet) = split_binomial(species)?;
    Url::parse_with_params(
        &cfg.herbarium_base,
        &[
            ("DisplayAs", "Text"),
            ("TextFileType", "Tab"),
            ("ExcludeCultivated", "Y"),
            ("SearchAllHerbaria", "Y"),
            ("GroupBy", "ungrouped"),
            ("SortBy", "Year"),
            ("SortOrder", "ASC"),
            ("QueryCount", "1"),
            ("Genus1", genus),
            ("Species1", epithet),
            ("IncludeSynonyms1", "Y"),
            ("State1", state),
        ],
    )
    .ok()
}

/// Parse a CPNWH tab-separated export into flowering days of year.
///
/// Keeps rows whose phenology mentions flowering and whose collection date
/// is a real calendar date within `[start_year, end_year]`. Rows with blank
/// or invalid date parts are skipped. Fields may be `"`-quoted, and quoted
/// fields may contain tabs.
pub fn parse_flowering_doys(tsv: &str, start_year: i32, end_year: i32) -> Result<Vec<u32>, PhenologyError> {
    if tsv.trim().is_empty() {
        return Err(PhenologyError::ParseError("empty herbarium export".to_string()));
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PhenologyError::ParseError(e.to_string()))?
        .clone();
    let col = |name: &str| -> Result<usize, PhenologyError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| PhenologyError::ParseError(format!("missing column '{}'", name)))
    };
    let (phen_i, day_i, month_i, year_i) = (col(COL_PHENOLOGY)?, col(COL_DAY)?, col(COL_MONTH)?, col(COL_YEAR)?);

    let mut doys = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PhenologyError::ParseError(e.to_string()))?;
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

        if !field(phen_i).to_lowercase().contains("flower") {
            continue;
        }
        let (Ok(day), Ok(month), Ok(year)) = (
            field(day_i).parse::<u32>(),
            field(month_i).parse::<u32>(),
            field(year_i).parse::<i32>(),
        ) else {
            continue;
        };
        if year < start_year || year > end_year {
            continue;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            doys.push(date.ordinal());
        }
    }
    Ok(doys)
}

/// Fetch flowering days of year for a Washington species.
pub fn fetch_flowering_doys(
    client: &reqwest::blocking::Client,
    cfg: &IngestConfig,
    species: &str,
    start_year: i32,
    end_year: i32,
) -> Result<Vec<u32>, Box<dyn std::error::Error>> {
    let Some(url) = build_export_url(cfg, species, "WA") else {
        return Ok(Vec::new());
    };
    let response = client.get(url).timeout(Duration::from_secs(60)).send()?;
    if !response.status().is_success() {
        return Err(PhenologyError::HttpError(response.status().as_u16()).into());
    }
    let text = response.text()?;
    Ok(parse_flowering_doys(&text, start_year, end_year)?)
}
