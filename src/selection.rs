//! Choices offered to the user before a view is computed.

use crate::config::DEFAULT_AREA_MANAGERS;
use crate::types::DerivedRecord;
use chrono::{Datelike, Month};
use std::collections::{BTreeSet, HashSet};

/// Sorted distinct ISO weeks present in the data.
pub fn available_weeks(data: &[DerivedRecord]) -> Vec<u32> {
    let weeks: BTreeSet<u32> = data.iter().map(|r| r.raw.iso_week).collect();
    weeks.into_iter().collect()
}

/// Months present in the data, in calendar order.
pub fn available_months(data: &[DerivedRecord]) -> Vec<Month> {
    let months: BTreeSet<u32> = data.iter().map(|r| r.raw.date.month()).collect();
    months
        .into_iter()
        .filter_map(|m| Month::try_from(m as u8).ok())
        .collect()
}

/// Parse a month by its English name, case-insensitively.
pub fn parse_month(name: &str) -> Option<Month> {
    name.trim().parse::<Month>().ok()
}

/// Weeks that have at least one row dated in one of `months`.
/// An empty month list means no restriction.
pub fn weeks_in_months(data: &[DerivedRecord], months: &[Month]) -> Vec<u32> {
    if months.is_empty() {
        return available_weeks(data);
    }
    let wanted: HashSet<u32> = months.iter().map(|m| m.number_from_month()).collect();
    let weeks: BTreeSet<u32> = data
        .iter()
        .filter(|r| wanted.contains(&r.raw.date.month()))
        .map(|r| r.raw.iso_week)
        .collect();
    weeks.into_iter().collect()
}

/// Area managers in the order they first appear.
pub fn area_managers(data: &[DerivedRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut managers = Vec::new();
    for r in data {
        if seen.insert(r.raw.area_manager.as_str()) {
            managers.push(r.raw.area_manager.clone());
        }
    }
    managers
}

/// The shop view opens on the last complete week: the second most recent
/// one, or the only one when there is just one.
pub fn default_shop_weeks(data: &[DerivedRecord]) -> Vec<u32> {
    let weeks = available_weeks(data);
    match weeks.len() {
        0 => Vec::new(),
        1 => weeks,
        n => vec![weeks[n - 2]],
    }
}

pub fn default_area_managers(data: &[DerivedRecord]) -> Vec<String> {
    let present = area_managers(data);
    DEFAULT_AREA_MANAGERS
        .iter()
        .filter(|m| present.iter().any(|p| p == *m))
        .map(|m| m.to_string())
        .collect()
}
