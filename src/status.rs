/// Bloom status thresholds.
///
/// The same classification applies at zone, species, and statewide level: a
/// shift of a week or more either way is treated as a real biological signal
/// rather than sampling noise.

use crate::model::BloomStatus;

/// Default early/late threshold in days.
pub const STATUS_THRESHOLD_DAYS: f64 = 7.0;

/// Classifies an anomaly in days against a symmetric threshold.
///
/// Both bounds are inclusive:
///   anomaly <= -threshold  →  early
///   anomaly >=  threshold  →  late
pub fn classify_status_with(anomaly_days: f64, threshold_days: f64) -> BloomStatus {
    if anomaly_days <= -threshold_days {
        BloomStatus::Early
    } else if anomaly_days >= threshold_days {
        BloomStatus::Late
    } else {
        BloomStatus::Normal
    }
}

/// Classifies with the default 7-day threshold.
pub fn classify_status(anomaly_days: f64) -> BloomStatus {
    classify_status_with(anomaly_days, STATUS_THRESHOLD_DAYS)
}

/// Status for a group with a baseline but no current-year sighting.
///
/// `anomaly_days` is today's day of year minus the baseline onset. Once the
/// season is past the threshold with nothing seen, the group is called late.
pub fn status_without_sighting(anomaly_days: f64, threshold_days: f64) -> BloomStatus {
    if anomaly_days >= threshold_days {
        BloomStatus::Late
    } else {
        BloomStatus::Pending
    }
}

/// One-line reading of a statewide anomaly for the published report.
pub fn interpretation(anomaly_days: f64, threshold_days: f64, baseline_start: i32, baseline_end: i32) -> String {
    let span = format!("{}-{}", baseline_start, baseline_end);
    match classify_status_with(anomaly_days, threshold_days) {
        BloomStatus::Early => format!("Flowering is trending earlier than the {} baseline.", span),
        BloomStatus::Late => format!("Flowering is trending later than the {} baseline.", span),
        _ => format!("Flowering is close to the {} baseline.", span),
    }
}
