/// Geographic zoning for Washington observations.
///
/// Every observation lands in exactly one zone keyed `{side}-{band}`, where
/// side is east or west of the Cascade crest and band is an elevation class.
/// The crest is a coarse straight line in (lat, lon) space; it is fixed and
/// intentionally not configurable.

use crate::model::Observation;
use std::fmt;

/// Longitude of the crest at latitude 45.5°.
const DIVIDE_BASE_LONGITUDE: f64 = -121.80;
const DIVIDE_BASE_LATITUDE: f64 = 45.5;
/// Degrees of longitude the crest shifts per degree of latitude.
const DIVIDE_SLOPE: f64 = 0.14;

/// Upper bound (exclusive) of the low band, in meters.
pub const LOW_BAND_MAX_M: f64 = 500.0;
/// Upper bound (exclusive) of the mid band, in meters.
pub const MID_BAND_MAX_M: f64 = 1200.0;

/// Key used for the single statewide group.
pub const STATEWIDE: &str = "statewide";

// ---------------------------------------------------------------------------
// Side of the Cascades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    East,
    West,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::East => "east",
            Side::West => "west",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approximate longitude of the Cascade crest at `lat`.
pub fn cascade_divide_longitude(lat: f64) -> f64 {
    DIVIDE_BASE_LONGITUDE + (lat - DIVIDE_BASE_LATITUDE) * DIVIDE_SLOPE
}

/// East only when strictly east of the divide; a point on the line is west.
pub fn side_of_cascades(lat: f64, lon: f64) -> Side {
    if lon > cascade_divide_longitude(lat) {
        Side::East
    } else {
        Side::West
    }
}

// ---------------------------------------------------------------------------
// Elevation bands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevationBand {
    Low,
    Mid,
    High,
    Unknown,
}

impl ElevationBand {
    pub fn as_str(self) -> &'static str {
        match self {
            ElevationBand::Low => "low",
            ElevationBand::Mid => "mid",
            ElevationBand::High => "high",
            ElevationBand::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ElevationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies an elevation in meters.
///
/// Bands are half-open: low is `[.., 500)`, mid is `[500, 1200)`, high is
/// everything else (including NaN, which compares false against both bounds).
pub fn elevation_band(elev_m: Option<f64>) -> ElevationBand {
    match elev_m {
        None => ElevationBand::Unknown,
        Some(e) if e < LOW_BAND_MAX_M => ElevationBand::Low,
        Some(e) if e < MID_BAND_MAX_M => ElevationBand::Mid,
        Some(_) => ElevationBand::High,
    }
}

// ---------------------------------------------------------------------------
// Zone keys
// ---------------------------------------------------------------------------

pub fn zone_key(side: Side, band: ElevationBand) -> String {
    format!("{}-{}", side, band)
}

/// Zone key for an observation, e.g. `"west-low"`.
pub fn zone_of(obs: &Observation) -> String {
    zone_key(
        side_of_cascades(obs.latitude, obs.longitude),
        elevation_band(obs.elevation_m),
    )
}

/// Side key for an observation, e.g. `"east"`.
pub fn side_of(obs: &Observation) -> String {
    side_of_cascades(obs.latitude, obs.longitude).to_string()
}

/// Human-readable description of the scheme, published with the report.
pub fn scheme_description() -> String {
    format!(
        "east/west Cascade side plus elevation bands (low <{}m, mid {}-{}m, high >{}m, unknown)",
        LOW_BAND_MAX_M, LOW_BAND_MAX_M, MID_BAND_MAX_M, MID_BAND_MAX_M
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
