/// Candidate indicator species for the Washington bloom watch.
///
/// Defines the canonical list of native, commonly observed spring bloomers
/// spanning west-side lowland, east-side steppe, and montane habitats. This
/// is the single source of truth for which species a run considers; a TOML
/// file can replace the list without recompiling.

use crate::model::PhenologyError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Scientific names, binomial only.
pub static CANDIDATE_SPECIES: &[&str] = &[
    "Oemleria cerasiformis",
    "Ribes sanguineum",
    "Mahonia aquifolium",
    "Trillium ovatum",
    "Camassia quamash",
    "Camassia leichtlinii",
    "Erythronium oregonum",
    "Claytonia sibirica",
    "Dicentra formosa",
    "Achlys triphylla",
    "Asarum caudatum",
    "Lysichiton americanus",
    "Tellima grandiflora",
    "Fritillaria affinis",
    "Acer macrophyllum",
    "Alnus rubra",
    "Amelanchier alnifolia",
    "Prunus emarginata",
    "Sambucus racemosa",
    "Vaccinium ovatum",
    "Balsamorhiza sagittata",
    "Lomatium utriculatum",
    "Viola glabella",
    "Ranunculus occidentalis",
];

/// Built-in candidates as owned strings.
pub fn default_species() -> Vec<String> {
    CANDIDATE_SPECIES.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Deserialize)]
struct SpeciesFile {
    species: Vec<String>,
}

/// Parses a species list of the form `species = ["Genus epithet", ...]`.
pub fn parse_species(text: &str) -> Result<Vec<String>, PhenologyError> {
    let file: SpeciesFile =
        toml::from_str(text).map_err(|e| PhenologyError::Config(e.to_string()))?;
    let mut out: Vec<String> = Vec::with_capacity(file.species.len());
    for name in file.species {
        let name = name.trim().to_string();
        if !is_binomial(&name) {
            return Err(PhenologyError::Config(format!(
                "'{}' is not a two-part scientific name",
                name
            )));
        }
        if !out.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Loads the species list from `path`, or the built-in list when `None`.
pub fn load_species(path: Option<&Path>) -> Result<Vec<String>, PhenologyError> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .map_err(|e| PhenologyError::Io(format!("{}: {}", p.display(), e)))?;
            parse_species(&text)
        }
        None => Ok(default_species()),
    }
}

/// True for `"Genus epithet"`: two words, capitalized genus, lowercase epithet.
pub fn is_binomial(name: &str) -> bool {
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() != 2 {
        return false;
    }
    let genus_ok = parts[0].chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && parts[0].chars().skip(1).all(|c| c.is_ascii_lowercase());
    let epithet_ok = parts[1].chars().all(|c| c.is_ascii_lowercase() || c == '-');
    genus_ok && epithet_ok
}

/// Genus and epithet of a binomial.
pub fn split_binomial(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(g), Some(e)) => Some((g, e)),
        _ => None,
    }
}

/// URL-safe lowercase slug, e.g. `"Ribes sanguineum"` → `"ribes-sanguineum"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "species".to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_candidates_are_binomials() {
        for name in CANDIDATE_SPECIES {
            assert!(is_binomial(name), "candidate '{}' should be 'Genus epithet'", name);
        }
    }

    #[test]
    fn test_no_duplicate_candidates() {
        let mut seen = std::collections::HashSet::new();
        for name in CANDIDATE_SPECIES {
            assert!(seen.insert(*name), "duplicate candidate '{}'", name);
        }
    }

    #[test]
    fn test_registry_spans_both_sides_of_the_cascades() {
        // West-side understory and east-side steppe indicators.
        assert!(CANDIDATE_SPECIES.contains(&"Trillium ovatum"));
        assert!(CANDIDATE_SPECIES.contains(&"Balsamorhiza sagittata"));
        assert_eq!(default_species().len(), CANDIDATE_SPECIES.len());
    }

    #[test]
    fn test_parse_species_dedupes_and_trims() {
        let list = parse_species(r#"species = [" Alnus rubra ", "alnus rubra", "Viola glabella"]"#);
        // the lowercase duplicate is not a valid binomial
        assert!(list.is_err());

        let list = parse_species(r#"species = [" Alnus rubra ", "Alnus rubra", "Viola glabella"]"#)
            .expect("valid list");
        assert_eq!(list, vec!["Alnus rubra", "Viola glabella"]);
    }

    #[test]
    fn test_load_species_defaults_without_path() {
        assert_eq!(load_species(None).unwrap().len(), 24);
    }

    #[test]
    fn test_split_binomial() {
        assert_eq!(split_binomial("Acer macrophyllum"), Some(("Acer", "macrophyllum")));
        assert_eq!(split_binomial("Acer"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Ribes sanguineum"), "ribes-sanguineum");
        assert_eq!(slugify("  Odd -- Name!! "), "odd-name");
        assert_eq!(slugify("***"), "species");
    }
}
