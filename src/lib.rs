/// Washington spring bloom watch
///
/// Estimates whether native wildflowers across Washington are blooming
/// early, on time, or late this spring compared with the preceding nine
/// years, from citizen-science flowering observations.
///
/// The analysis engine (`analysis`, `zones`, `status`) is pure; everything
/// that talks to the network or the disk lives in `ingest`, `snapshot`,
/// `report` and `verify`.

pub mod analysis;
pub mod candidates;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod report;
pub mod snapshot;
pub mod status;
pub mod verify;
pub mod zones;
