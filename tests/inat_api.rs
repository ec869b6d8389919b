/// Live API checks for the external data sources
///
/// These tests verify:
/// 1. iNaturalist resolves a well-known candidate to an exact species taxon
/// 2. The flowering-annotation search returns parseable Washington records
/// 3. The CPNWH herbarium export parses into flowering days of year
///
/// Prerequisites:
/// - Internet connectivity to reach api.inaturalist.org and pnwherbaria.org
///
/// Run with: cargo test --test inat_api -- --ignored --test-threads=1
///
/// Note: These tests make real API calls and may be slow or fail if the
/// services are down or rate-limiting.

use chrono::NaiveDate;
use spring_watch::config::IngestConfig;
use spring_watch::ingest::herbarium;
use spring_watch::ingest::inat::InatClient;
use spring_watch::zones;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn client() -> InatClient {
    InatClient::new(IngestConfig::default()).unwrap_or_else(|e| panic!("client setup failed: {}", e))
}

// ---------------------------------------------------------------------------
// iNaturalist
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn test_red_flowering_currant_resolves() {
    let taxon = client()
        .resolve_taxon("Ribes sanguineum")
        .expect("request failed")
        .expect("Ribes sanguineum should resolve");
    assert!(taxon.taxon_id > 0);
    assert!(taxon.taxon_url.ends_with(&taxon.taxon_id.to_string()));
    assert!(!taxon.common_name.is_empty(), "common name should fall back to the scientific name");
}

#[test]
#[ignore]
fn test_nonsense_name_is_unresolved() {
    let taxon = client().resolve_taxon("Nonesuch plantus").expect("request failed");
    assert!(taxon.is_none());
}

#[test]
#[ignore]
fn test_one_season_of_flowering_records_parses() {
    let c = client();
    let taxon = c
        .resolve_taxon("Erythronium oregonum")
        .expect("request failed")
        .expect("Erythronium oregonum should resolve");

    let d1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let observations = c
        .fetch_species_observations("Erythronium oregonum", taxon.taxon_id, d1, d2, 400)
        .expect("fetch failed");

    assert!(!observations.is_empty(), "a common west-side lily should have 2023 records");
    for obs in &observations {
        assert!(obs.observed_on >= d1 && obs.observed_on <= d2, "{} outside window", obs.observed_on);
        assert!(obs.uri.starts_with("https://"));
        assert!(!zones::zone_of(obs).is_empty());
    }
    let sorted = observations.windows(2).all(|w| w[0].observed_on <= w[1].observed_on);
    assert!(sorted, "records should arrive in ascending date order");
}

// ---------------------------------------------------------------------------
// CPNWH herbarium
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn test_herbarium_export_yields_flowering_days() {
    let http = reqwest::blocking::Client::new();
    let doys = herbarium::fetch_flowering_doys(&http, &IngestConfig::default(), "Ribes sanguineum", 1950, 2000)
        .unwrap_or_else(|e| panic!("herbarium export failed: {}", e));
    assert!(!doys.is_empty());
    assert!(doys.iter().all(|&d| (1..=366).contains(&d)));
}
