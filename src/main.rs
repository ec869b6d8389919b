/// spring_watch - Washington spring bloom timing from iNaturalist flowering records.

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use spring_watch::analysis::{self, SpeciesInput, trend};
use spring_watch::candidates;
use spring_watch::config::{self, AnalysisConfig, IngestConfig};
use spring_watch::ingest::herbarium;
use spring_watch::ingest::inat::InatClient;
use spring_watch::logging::{self, LogLevel, Stage};
use spring_watch::model::{PhenologyError, TaxonRecord};
use spring_watch::report;
use spring_watch::snapshot::{self, Snapshot, SnapshotSpecies};
use spring_watch::verify;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "spring_watch",
    version,
    about = "Washington spring bloom timing compared with the preceding nine years"
)]
struct Cli {
    /// TOML config file (falls back to SPRING_WATCH_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TOML file listing candidate species (`species = [...]`)
    #[arg(long)]
    species_file: Option<PathBuf>,

    /// Output directory (falls back to SPRING_WATCH_DATA_DIR, then ./data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Analysis date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch observations, compute bloom status, write spring_status.json/.js
    Analyze {
        /// Replay a saved snapshot instead of calling iNaturalist
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Save fetched observations for later replay
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },

    /// Multi-year onset trend over the published indicator species
    Trend {
        /// Take baseline observations from a snapshot instead of iNaturalist
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Skip the CPNWH herbarium comparison
        #[arg(long)]
        no_herbarium: bool,
    },

    /// Check which candidate species resolve and have usable coverage
    Verify {
        /// Write the verification report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

struct RunContext {
    analysis_date: NaiveDate,
    cfg: AnalysisConfig,
    ingest: IngestConfig,
    species: Vec<String>,
    data_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_file = std::env::var("SPRING_WATCH_LOG").ok();
    logging::init_logger(cli.log_level, log_file.as_deref(), false);

    let analysis_date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let config_path = cli
        .config
        .or_else(|| std::env::var("SPRING_WATCH_CONFIG").ok().map(PathBuf::from));
    let (cfg, ingest) = config::load_config(config_path.as_deref(), analysis_date)?;
    let species = candidates::load_species(cli.species_file.as_deref())?;
    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("SPRING_WATCH_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));

    logging::info(
        Stage::System,
        None,
        &format!(
            "analysis date {}, baseline {}-{}, {} candidate species",
            analysis_date,
            cfg.baseline_start,
            cfg.baseline_end,
            species.len()
        ),
    );

    let ctx = RunContext { analysis_date, cfg, ingest, species, data_dir };
    match cli.command {
        Command::Analyze { replay, save_snapshot } => run_analyze(&ctx, replay.as_deref(), save_snapshot.as_deref()),
        Command::Trend { replay, no_herbarium } => run_trend(&ctx, replay.as_deref(), no_herbarium),
        Command::Verify { output } => run_verify(&ctx, output.as_deref()),
    }
}

fn inat_client(ingest: &IngestConfig) -> anyhow::Result<InatClient> {
    InatClient::new(ingest.clone()).map_err(|e| anyhow!("failed to build HTTP client: {}", e))
}

fn year_start(year: i32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| anyhow!("invalid year {}", year))
}

fn year_end(year: i32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| anyhow!("invalid year {}", year))
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Resolves and fetches every species. Fetch failures keep the taxon with
/// no observations so the engine skips it for lack of coverage.
fn fetch_snapshot(client: &InatClient, species: &[String], d1: NaiveDate, d2: NaiveDate) -> Snapshot {
    let max_records = client.config().max_records_per_species;
    let mut entries = Vec::with_capacity(species.len());

    for name in species {
        logging::info(Stage::Taxon, Some(name), "resolving");
        let taxon = match client.resolve_taxon(name) {
            Ok(Some(taxon)) => taxon,
            Ok(None) => {
                let err = PhenologyError::TaxonNotResolved(name.clone());
                logging::log_species_failure(Stage::Taxon, name, "resolve", &err);
                entries.push(SnapshotSpecies { species: name.clone(), taxon: None, observations: Vec::new() });
                continue;
            }
            Err(e) => {
                logging::log_species_failure(Stage::Taxon, name, "resolve", e.as_ref());
                entries.push(SnapshotSpecies { species: name.clone(), taxon: None, observations: Vec::new() });
                continue;
            }
        };

        logging::info(Stage::Ingest, Some(name), &format!("fetching observations (taxon {})", taxon.taxon_id));
        let observations = match client.fetch_species_observations(name, taxon.taxon_id, d1, d2, max_records) {
            Ok(obs) => obs,
            Err(e) => {
                logging::log_species_failure(Stage::Ingest, name, "fetch", e.as_ref());
                Vec::new()
            }
        };
        entries.push(SnapshotSpecies { species: name.clone(), taxon: Some(taxon), observations });
    }

    Snapshot {
        fetched_at: Utc::now().to_rfc3339(),
        window_start: d1,
        window_end: d2,
        species: entries,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_analyze(ctx: &RunContext, replay: Option<&Path>, save: Option<&Path>) -> anyhow::Result<()> {
    let snapshot = match replay {
        Some(path) => {
            let loaded = snapshot::load_snapshot(path)?.as_of(ctx.analysis_date);
            logging::info(
                Stage::System,
                None,
                &format!("replaying {} ({} observations)", path.display(), loaded.observation_count()),
            );
            loaded
        }
        None => {
            let client = inat_client(&ctx.ingest)?;
            let fetched = fetch_snapshot(
                &client,
                &ctx.species,
                year_start(ctx.cfg.baseline_start)?,
                year_end(ctx.cfg.current_year)?,
            );
            if let Some(path) = save {
                snapshot::save_snapshot(&fetched, path)?;
                logging::info(Stage::System, None, &format!("saved snapshot to {}", path.display()));
            }
            fetched
        }
    };

    let (inputs, unresolved) = snapshot.split();
    let summaries = analysis::summarize_all(&inputs, &ctx.cfg, ctx.analysis_date)?;
    let usable = summaries.len();
    let set = analysis::rollup::build_indicator_set(summaries, &ctx.cfg);
    logging::log_run_summary(Stage::Analysis, snapshot.species.len(), usable, unresolved.len());

    let overall = set.overall.clone();
    let status_report = report::build_report(set, unresolved, &ctx.cfg, &ctx.ingest, ctx.analysis_date, Utc::now());
    for path in report::write_report(&status_report, &ctx.data_dir)? {
        println!("Wrote {}", path.display());
    }
    println!(
        "Overall: {} ({} days), {} indicator species",
        overall.status, overall.anomaly_days, overall.species_count
    );
    Ok(())
}

fn run_trend(ctx: &RunContext, replay: Option<&Path>, no_herbarium: bool) -> anyhow::Result<()> {
    let published = report::read_report(&ctx.data_dir)
        .with_context(|| "trend needs a spring_status.json from a previous analyze run")?;
    let mut cfg = ctx.cfg.clone();
    cfg.baseline_start = published.years.baseline_start;
    cfg.baseline_end = published.years.baseline_end;

    let inputs: Vec<SpeciesInput> = match replay {
        Some(path) => snapshot::load_snapshot(path)?.split().0,
        None => {
            let client = inat_client(&ctx.ingest)?;
            let d1 = year_start(cfg.baseline_start)?;
            let d2 = year_end(cfg.baseline_end)?;
            let max_records = client.config().trend_max_records;
            let mut fetched = Vec::new();
            for indicator in &published.indicator_species {
                logging::info(Stage::Trend, Some(&indicator.species), "fetching baseline years");
                match client.fetch_species_observations(&indicator.species, indicator.taxon_id, d1, d2, max_records) {
                    Ok(observations) => fetched.push(SpeciesInput {
                        species: indicator.species.clone(),
                        taxon: TaxonRecord {
                            taxon_id: indicator.taxon_id,
                            common_name: indicator.common_name.clone(),
                            taxon_url: indicator.taxon_url.clone(),
                            photo_url: indicator.photo_url.clone(),
                        },
                        observations,
                    }),
                    Err(e) => logging::log_species_failure(Stage::Trend, &indicator.species, "fetch", e.as_ref()),
                }
            }
            fetched
        }
    };

    let mut table = trend::OnsetTable::new();
    for input in &inputs {
        if !published.indicator_species.iter().any(|s| s.species == input.species) {
            continue;
        }
        if let Some(onsets) = trend::species_onsets(&input.observations, &cfg)? {
            table.insert(input.species.clone(), onsets);
        }
    }
    logging::info(Stage::Trend, None, &format!("{} species with enough baseline years", table.len()));

    let mut herbarium_doys: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    if !no_herbarium {
        let http = reqwest::blocking::Client::builder()
            .user_agent(ctx.ingest.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        for species in table.keys() {
            match herbarium::fetch_flowering_doys(
                &http,
                &ctx.ingest,
                species,
                cfg.herbarium_start_year,
                cfg.herbarium_end_year,
            ) {
                Ok(doys) => {
                    logging::debug(Stage::Herbarium, Some(species), &format!("{} flowering specimens", doys.len()));
                    herbarium_doys.insert(species.clone(), doys);
                }
                Err(e) => logging::log_species_failure(Stage::Herbarium, species, "export", e.as_ref()),
            }
        }
    }

    let summary = trend::build_trend(&table, &herbarium_doys, &cfg)?;
    let slope = summary.linear_trend.slope_days_per_year;
    let path = report::write_trend(summary, &ctx.data_dir, Utc::now())?;
    println!("Wrote {}", path.display());
    println!("Trend: {:+.3} days/year across {} species", slope, table.len());
    Ok(())
}

fn run_verify(ctx: &RunContext, output: Option<&Path>) -> anyhow::Result<()> {
    let client = inat_client(&ctx.ingest)?;
    let result = verify::run_verification(&client, &ctx.species, &ctx.cfg, ctx.analysis_date);
    verify::print_summary(&result);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
