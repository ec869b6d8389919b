// End-to-end engine scenarios through the public API.
//
// Observations are synthesized per year at fixed places so every expected
// number can be worked out by hand. No network access.

use chrono::NaiveDate;
use spring_watch::analysis::{self, SpeciesInput, rollup, species::summarize_species};
use spring_watch::config::AnalysisConfig;
use spring_watch::model::{BloomStatus, Granularity, Observation, SpeciesSummary, TaxonRecord};

const WEST_LOW: (f64, f64, Option<f64>) = (47.6, -122.3, Some(50.0));
const WEST_MID: (f64, f64, Option<f64>) = (47.6, -122.3, Some(700.0));
const EAST_LOW: (f64, f64, Option<f64>) = (46.6, -120.5, Some(300.0));

/// Baseline onsets per year; their median is 71.
const BASELINE_ONSETS: [(i32, u32); 7] = [
    (2017, 65),
    (2018, 68),
    (2019, 70),
    (2020, 71),
    (2021, 73),
    (2023, 75),
    (2025, 77),
];

fn taxon(id: u64, name: &str) -> TaxonRecord {
    TaxonRecord {
        taxon_id: id,
        common_name: name.to_string(),
        taxon_url: format!("https://www.inaturalist.org/taxa/{}", id),
        photo_url: None,
    }
}

fn obs(species: &str, year: i32, doy: u32, at: (f64, f64, Option<f64>)) -> Observation {
    Observation {
        species: species.to_string(),
        taxon_id: 1,
        observed_on: NaiveDate::from_yo_opt(year, doy).unwrap(),
        latitude: at.0,
        longitude: at.1,
        elevation_m: at.2,
        uri: format!("https://www.inaturalist.org/observations/{}{}", year, doy),
        photo_url: None,
        place_guess: None,
    }
}

/// Three records per baseline year whose 20th percentile is the year's onset.
fn baseline(species: &str, at: (f64, f64, Option<f64>)) -> Vec<Observation> {
    BASELINE_ONSETS
        .iter()
        .flat_map(|&(year, onset)| {
            [
                obs(species, year, onset, at),
                obs(species, year, onset, at),
                obs(species, year, onset + 4, at),
            ]
        })
        .collect()
}

fn with_current(mut records: Vec<Observation>, species: &str, doys: &[u32]) -> Vec<Observation> {
    records.extend(doys.iter().map(|&d| obs(species, 2026, d, WEST_LOW)));
    records
}

/// 2026-04-10, day of year 100.
fn april_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
}

fn cfg() -> AnalysisConfig {
    AnalysisConfig::for_date(april_10())
}

fn summarize(species: &str, records: &[Observation], date: NaiveDate) -> SpeciesSummary {
    summarize_species(species, &taxon(1, "test"), records, &cfg(), date)
        .expect("engine error")
        .expect("species should have enough coverage")
}

// ---------------------------------------------------------------------------
// Single-species scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_early_bloom_against_median_baseline() {
    let records = with_current(baseline("Ribes sanguineum", WEST_LOW), "Ribes sanguineum", &[58, 60]);
    let summary = summarize("Ribes sanguineum", &records, april_10());

    assert_eq!(summary.granularity, Granularity::Zone);
    assert_eq!(summary.zones.len(), 1);
    let zone = &summary.zones[0];
    assert_eq!(zone.zone, "west-low");
    assert_eq!(zone.baseline_doy, 71.0, "median of seven yearly onsets");
    assert_eq!(zone.baseline_years, 7);
    assert_eq!(zone.current_doy, Some(58.4));
    assert!((zone.anomaly_days - (-12.6)).abs() < 1e-9, "got {}", zone.anomaly_days);
    assert_eq!(zone.status, BloomStatus::Early);

    assert_eq!(summary.status, BloomStatus::Early);
    assert!((summary.anomaly_days - (-12.6)).abs() < 1e-9);
    assert!(summary.has_current_data);
    assert_eq!(summary.current_obs_total, 2);
    assert_eq!(summary.observation_count, 23);
    assert_eq!(summary.slug, "ribes-sanguineum");
}

#[test]
fn test_no_sighting_late_in_season_is_late() {
    let records = baseline("Ribes sanguineum", WEST_LOW);
    let summary = summarize("Ribes sanguineum", &records, april_10());

    let zone = &summary.zones[0];
    assert_eq!(zone.current_doy, None);
    assert_eq!(zone.anomaly_days, 29.0, "today (100) minus baseline (71)");
    assert_eq!(zone.status, BloomStatus::Late);
    assert_eq!(summary.status, BloomStatus::Late);
    assert!(!summary.has_current_data);
}

#[test]
fn test_no_sighting_early_in_season_is_pending() {
    let march_1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(); // doy 60
    let records = baseline("Ribes sanguineum", WEST_LOW);
    let summary = summarize("Ribes sanguineum", &records, march_1);

    assert_eq!(summary.zones[0].status, BloomStatus::Pending);
    assert_eq!(summary.status, BloomStatus::Pending);
    assert_eq!(summary.anomaly_days, 0.0, "pending zones carry no weight");
}

#[test]
fn test_pending_requires_no_current_data_and_no_late_zone() {
    // Current sighting right on the baseline: normal, never pending.
    let records = with_current(baseline("Ribes sanguineum", WEST_LOW), "Ribes sanguineum", &[71]);
    let summary = summarize("Ribes sanguineum", &records, april_10());
    assert_eq!(summary.status, BloomStatus::Normal);
    assert_ne!(summary.status, BloomStatus::Pending);
}

#[test]
fn test_sightings_after_analysis_date_are_not_counted() {
    let records = with_current(baseline("Ribes sanguineum", WEST_LOW), "Ribes sanguineum", &[58, 60, 120]);
    let summary = summarize("Ribes sanguineum", &records, april_10());
    assert_eq!(summary.current_obs_total, 2);
    assert_eq!(summary.current_year_observations.len(), 2);
    assert_eq!(
        summary.current_year_observations[0].observed_on,
        NaiveDate::from_yo_opt(2026, 60).unwrap(),
        "newest first"
    );
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

#[test]
fn test_zone_level_wins_when_any_zone_is_admitted() {
    let mut records = baseline("Camassia quamash", WEST_LOW);
    // A thin second zone that would only count at a coarser level.
    records.extend(BASELINE_ONSETS.iter().map(|&(y, d)| obs("Camassia quamash", y, d, WEST_MID)));
    let summary = summarize("Camassia quamash", &records, april_10());
    assert_eq!(summary.granularity, Granularity::Zone);
    assert_eq!(summary.zones_used, 1);
}

#[test]
fn test_falls_back_to_side_when_zones_are_thin() {
    let records: Vec<Observation> = BASELINE_ONSETS
        .iter()
        .flat_map(|&(y, d)| {
            [
                obs("Camassia quamash", y, d, WEST_LOW),
                obs("Camassia quamash", y, d + 2, WEST_LOW),
                obs("Camassia quamash", y, d, WEST_MID),
                obs("Camassia quamash", y, d + 2, WEST_MID),
            ]
        })
        .collect();
    let summary = summarize("Camassia quamash", &records, april_10());
    assert_eq!(summary.granularity, Granularity::Side);
    assert_eq!(summary.zones[0].zone, "west");
}

#[test]
fn test_falls_back_to_statewide_when_sides_are_thin() {
    let records: Vec<Observation> = BASELINE_ONSETS
        .iter()
        .flat_map(|&(y, d)| [obs("Camassia quamash", y, d, WEST_LOW), obs("Camassia quamash", y, d + 2, EAST_LOW)])
        .collect();
    let summary = summarize("Camassia quamash", &records, april_10());
    assert_eq!(summary.granularity, Granularity::State);
    assert_eq!(summary.zones[0].zone, "statewide");
}

#[test]
fn test_species_without_coverage_is_skipped() {
    let records: Vec<Observation> = (2017..=2019).map(|y| obs("Trillium ovatum", y, 80, WEST_LOW)).collect();
    let result = summarize_species("Trillium ovatum", &taxon(1, "test"), &records, &cfg(), april_10()).unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Ranking and rollups
// ---------------------------------------------------------------------------

#[test]
fn test_ranking_ties_break_by_absolute_anomaly() {
    let mild = summarize(
        "Alnus rubra",
        &with_current(baseline("Alnus rubra", WEST_LOW), "Alnus rubra", &[70, 72]),
        april_10(),
    );
    let strong = summarize(
        "Ribes sanguineum",
        &with_current(baseline("Ribes sanguineum", WEST_LOW), "Ribes sanguineum", &[58, 60]),
        april_10(),
    );
    assert_eq!(mild.current_obs_total, strong.current_obs_total);

    let ranked = rollup::pick_indicator_species(vec![mild, strong], 20);
    assert_eq!(ranked[0].species, "Ribes sanguineum");
    assert_eq!(ranked[1].species, "Alnus rubra");
}

#[test]
fn test_opposite_anomalies_cancel_in_zone_rollup() {
    let late_sp = "Acer macrophyllum";
    let early_sp = "Prunus emarginata";
    let inputs = vec![
        SpeciesInput {
            species: late_sp.to_string(),
            taxon: taxon(10, "bigleaf maple"),
            observations: with_current(baseline(late_sp, WEST_LOW), late_sp, &[81, 81]),
        },
        SpeciesInput {
            species: early_sp.to_string(),
            taxon: taxon(11, "bitter cherry"),
            observations: with_current(baseline(early_sp, WEST_LOW), early_sp, &[61, 61]),
        },
    ];

    let set = analysis::run(&inputs, &cfg(), april_10()).unwrap();
    assert_eq!(set.indicators.len(), 2);
    assert_eq!(set.zones.len(), 1);
    assert_eq!(set.zones[0].zone, "west-low");
    assert_eq!(set.zones[0].anomaly_days, 0.0);
    assert_eq!(set.zones[0].status, BloomStatus::Normal);
    assert_eq!(set.zones[0].species_count, 2);

    assert_eq!(set.overall.anomaly_days, 0.0);
    assert_eq!(set.overall.status, BloomStatus::Normal);
    assert_eq!(set.overall.species_with_signal, 2);
}

#[test]
fn test_overall_ignores_pending_species() {
    let signal_sp = "Ribes sanguineum";
    let quiet_sp = "Trillium ovatum";
    let march_10 = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(); // doy 69
    let inputs = vec![
        SpeciesInput {
            species: signal_sp.to_string(),
            taxon: taxon(1, "red flowering currant"),
            observations: with_current(baseline(signal_sp, WEST_LOW), signal_sp, &[58, 60]),
        },
        SpeciesInput {
            species: quiet_sp.to_string(),
            taxon: taxon(2, "western trillium"),
            observations: baseline(quiet_sp, WEST_LOW),
        },
    ];

    let set = analysis::run(&inputs, &AnalysisConfig::for_date(march_10), march_10).unwrap();
    assert_eq!(set.overall.species_count, 2);
    assert_eq!(set.overall.species_with_signal, 1);
    assert_eq!(set.overall.status, BloomStatus::Early);
    assert!((set.overall.anomaly_days - (-12.6)).abs() < 1e-9);
}
