/// Offline replay of fetched observation data
///
/// A run can save everything it fetched to a JSON snapshot and later replay
/// it without touching the network, optionally as of an earlier date to see
/// what the indicator would have said then.

use crate::analysis::SpeciesInput;
use crate::model::{Observation, PhenologyError, TaxonRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One candidate species as fetched. `taxon` is `None` when unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSpecies {
    pub species: String,
    pub taxon: Option<TaxonRecord>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub species: Vec<SnapshotSpecies>,
}

impl Snapshot {
    /// Resolved species as engine inputs, plus the unresolved names.
    pub fn split(&self) -> (Vec<SpeciesInput>, Vec<String>) {
        let mut inputs = Vec::new();
        let mut unresolved = Vec::new();
        for entry in &self.species {
            match &entry.taxon {
                Some(taxon) => inputs.push(SpeciesInput {
                    species: entry.species.clone(),
                    taxon: taxon.clone(),
                    observations: entry.observations.clone(),
                }),
                None => unresolved.push(entry.species.clone()),
            }
        }
        (inputs, unresolved)
    }

    /// Copy with every observation after `date` removed.
    pub fn as_of(&self, date: NaiveDate) -> Snapshot {
        Snapshot {
            fetched_at: self.fetched_at.clone(),
            window_start: self.window_start,
            window_end: self.window_end.min(date),
            species: self
                .species
                .iter()
                .map(|s| SnapshotSpecies {
                    species: s.species.clone(),
                    taxon: s.taxon.clone(),
                    observations: s
                        .observations
                        .iter()
                        .filter(|o| o.observed_on <= date)
                        .cloned()
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn observation_count(&self) -> usize {
        self.species.iter().map(|s| s.observations.len()).sum()
    }
}

pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), PhenologyError> {
    let json = serde_json::to_string(snapshot).map_err(|e| PhenologyError::ParseError(e.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PhenologyError::Io(e.to_string()))?;
    }
    fs::write(path, json).map_err(|e| PhenologyError::Io(format!("{}: {}", path.display(), e)))
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, PhenologyError> {
    let text = fs::read_to_string(path)
        .map_err(|e| PhenologyError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| PhenologyError::ParseError(e.to_string()))
}
