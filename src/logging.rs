/// Structured logging for the bloom watch
///
/// Provides context-rich logging tagged with the pipeline stage and, where
/// relevant, the species being processed. Messages go through the `log`
/// facade; `init_logger` installs an `env_logger` backend that writes to the
/// console or appends to a file for scheduled runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Taxon,
    Ingest,
    Herbarium,
    Analysis,
    Trend,
    Report,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Taxon => write!(f, "TAXON"),
            Stage::Ingest => write!(f, "INAT"),
            Stage::Herbarium => write!(f, "HERB"),
            Stage::Analysis => write!(f, "ANALYSIS"),
            Stage::Trend => write!(f, "TREND"),
            Stage::Report => write!(f, "REPORT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the species simply has no usable data
    Expected,
    /// Unexpected failure - indicates service degradation or a bug
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a fetch failure based on its error message.
pub fn classify_failure(error_message: &str) -> FailureType {
    if error_message.contains("Taxon not resolved") {
        FailureType::Expected
    } else if error_message.contains("HTTP error") || error_message.contains("timed out") {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        // API shape changes show up here first
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Install the global logger.
///
/// `RUST_LOG`, when set, takes precedence over `min_level`. With a
/// `log_file`, entries are appended there instead of stderr. Calling this
/// twice is harmless; the second call is ignored.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(min_level.into());
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    let timestamps = console_timestamps || log_file.is_some();
    builder.format(move |buf, record| {
        if timestamps {
            writeln!(
                buf,
                "{} {} {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                record.level(),
                record.args()
            )
        } else {
            writeln!(buf, "   {}", record.args())
        }
    });

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    let _ = builder.try_init();
}

fn entry(stage: Stage, species: Option<&str>, message: &str) -> String {
    let species_part = species.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{}{}: {}", stage, species_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(stage: Stage, species: Option<&str>, message: &str) {
    log::info!("{}", entry(stage, species, message));
}

/// Log a warning message
pub fn warn(stage: Stage, species: Option<&str>, message: &str) {
    log::warn!("{}", entry(stage, species, message));
}

/// Log an error message
pub fn error(stage: Stage, species: Option<&str>, message: &str) {
    log::error!("{}", entry(stage, species, message));
}

/// Log a debug message
pub fn debug(stage: Stage, species: Option<&str>, message: &str) {
    log::debug!("{}", entry(stage, species, message));
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a per-species failure with automatic classification
pub fn log_species_failure(stage: Stage, species: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_failure(&error_msg);
    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(stage, Some(species), &message),
        FailureType::Unexpected => error(stage, Some(species), &message),
        FailureType::Unknown => warn(stage, Some(species), &message),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log how many candidate species made it through a run.
pub fn log_run_summary(stage: Stage, total: usize, usable: usize, unresolved: usize) {
    let skipped = total.saturating_sub(usable + unresolved);
    let message = format!(
        "Run complete: {}/{} usable, {} unresolved, {} insufficient coverage",
        usable, total, unresolved, skipped
    );

    if usable == total {
        info(stage, None, &message);
    } else if usable == 0 {
        error(stage, None, &message);
    } else {
        warn(stage, None, &message);
    }
}
