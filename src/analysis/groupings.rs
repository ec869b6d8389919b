/// Organizes one species' flat observation list into per-group, per-year
/// day-of-year collections at all three granularities.
///
/// Grouping happens once per species; the evaluator then reads whichever
/// granularity it is currently trying.

use crate::model::{Granularity, Observation};
use crate::zones::{self, STATEWIDE};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Day-of-year values keyed by calendar year.
pub type YearMap = BTreeMap<i32, Vec<u32>>;

/// One group as seen by the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct GroupView<'a> {
    pub name: &'a str,
    pub years: &'a YearMap,
    /// Current-year observations dated on or before the analysis date.
    pub current_obs: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GroupedObservations<'a> {
    by_zone: BTreeMap<String, YearMap>,
    by_side: BTreeMap<String, YearMap>,
    statewide: YearMap,
    current_by_zone: BTreeMap<String, usize>,
    current_by_side: BTreeMap<String, usize>,
    current_state: usize,
    current_records: Vec<&'a Observation>,
}

impl<'a> GroupedObservations<'a> {
    /// Buckets `observations` by zone, side, and statewide.
    ///
    /// Every observation contributes its day of year to its year bucket.
    /// Only current-year observations on or before `analysis_date` count
    /// toward the current-year totals and the recent-observation list.
    pub fn build(observations: &'a [Observation], current_year: i32, analysis_date: NaiveDate) -> Self {
        let mut grouped = GroupedObservations::default();
        for obs in observations {
            let side = zones::side_of(obs);
            let zone = zones::zone_of(obs);
            let year = obs.observed_on.year();
            let doy = obs.day_of_year();

            grouped.by_zone.entry(zone.clone()).or_default().entry(year).or_default().push(doy);
            grouped.by_side.entry(side.clone()).or_default().entry(year).or_default().push(doy);
            grouped.statewide.entry(year).or_default().push(doy);

            if year == current_year && obs.observed_on <= analysis_date {
                *grouped.current_by_zone.entry(zone).or_default() += 1;
                *grouped.current_by_side.entry(side).or_default() += 1;
                grouped.current_state += 1;
                grouped.current_records.push(obs);
            }
        }
        grouped
    }

    /// Groups at the given granularity, in key order.
    pub fn groups(&self, granularity: Granularity) -> Vec<GroupView<'_>> {
        match granularity {
            Granularity::Zone => Self::views(&self.by_zone, &self.current_by_zone),
            Granularity::Side => Self::views(&self.by_side, &self.current_by_side),
            Granularity::State => vec![GroupView {
                name: STATEWIDE,
                years: &self.statewide,
                current_obs: self.current_state,
            }],
        }
    }

    fn views<'s>(
        maps: &'s BTreeMap<String, YearMap>,
        counts: &'s BTreeMap<String, usize>,
    ) -> Vec<GroupView<'s>> {
        maps.iter()
            .map(|(name, years)| GroupView {
                name: name.as_str(),
                years,
                current_obs: counts.get(name).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Statewide day-of-year values by year.
    pub fn statewide(&self) -> &YearMap {
        &self.statewide
    }

    pub fn current_total(&self) -> usize {
        self.current_state
    }

    /// Current-year records, newest first, at most `limit`.
    pub fn recent_current(&self, limit: usize) -> Vec<&'a Observation> {
        let mut records = self.current_records.clone();
        records.sort_by(|a, b| b.observed_on.cmp(&a.observed_on));
        records.truncate(limit);
        records
    }
}
