//! The three roll-ups over a snapshot.
//!
//! They deliberately use different reductions and are not interchangeable:
//! the area summary sums counts and recomputes rates from the sums, the
//! weekly series sums counts but averages the row-level rates, and the shop
//! pivot works on raw (unprorated) counts.

use crate::rates::{derive_rates, mean_rates};
use crate::types::{
    AreaLabel, AreaSeries, AreaSummaryRow, Counts, DerivedRecord, Metric, Rates, ShopPivotRow,
    TimeSeriesRow,
};
use log::debug;
use std::collections::{BTreeMap, HashSet};

/// Result of a view that needs a selection to be meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum View<T> {
    Rows(Vec<T>),
    /// The selection was empty, so there is nothing to aggregate.
    NoData,
}

impl<T> View<T> {
    pub fn rows(&self) -> &[T] {
        match self {
            View::Rows(rows) => rows,
            View::NoData => &[],
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, View::NoData)
    }
}

/// Area roll-up over the selected ISO weeks (sum, then ratio).
pub fn area_summary(data: &[DerivedRecord], weeks: &[u32]) -> View<AreaSummaryRow> {
    if weeks.is_empty() {
        return View::NoData;
    }
    let weeks: HashSet<u32> = weeks.iter().copied().collect();

    let mut groups: BTreeMap<AreaLabel, Counts> = BTreeMap::new();
    for r in data.iter().filter(|r| weeks.contains(&r.raw.iso_week)) {
        *groups.entry(r.area).or_default() += r.derived;
    }
    debug!("Area summary: {} groups over {} weeks", groups.len(), weeks.len());

    View::Rows(
        groups
            .into_iter()
            .map(|(area, counts)| AreaSummaryRow {
                area,
                counts,
                rates: derive_rates(&counts),
            })
            .collect(),
    )
}

/// Area x week series over every ingested week (sum of counts, mean of rates).
pub fn weekly_time_series(data: &[DerivedRecord]) -> Vec<TimeSeriesRow> {
    #[derive(Default)]
    struct Acc {
        counts: Counts,
        rates: Vec<Rates>,
    }

    let mut groups: BTreeMap<(u32, AreaLabel), Acc> = BTreeMap::new();
    for r in data {
        let e = groups.entry((r.raw.iso_week, r.area)).or_default();
        e.counts += r.derived;
        e.rates.push(r.rates);
    }
    debug!("Weekly series: {} groups", groups.len());

    groups
        .into_iter()
        .map(|((iso_week, area), acc)| TimeSeriesRow {
            iso_week,
            area,
            counts: acc.counts,
            mean_rates: mean_rates(&acc.rates),
        })
        .collect()
}

/// One line per area for the chosen metric, weeks in ascending order.
pub fn series_for_metric(rows: &[TimeSeriesRow], metric: Metric) -> Vec<AreaSeries> {
    let mut by_area: BTreeMap<AreaLabel, Vec<(u32, f64)>> = BTreeMap::new();
    for row in rows {
        by_area
            .entry(row.area)
            .or_default()
            .push((row.iso_week, metric.value(&row.counts, &row.mean_rates)));
    }
    by_area
        .into_iter()
        .map(|(area, mut points)| {
            points.sort_by_key(|(week, _)| *week);
            AreaSeries { area, points }
        })
        .collect()
}

/// Shop x area manager pivot over raw counts for the selected weeks and managers.
pub fn shop_pivot(
    data: &[DerivedRecord],
    weeks: &[u32],
    managers: &[String],
) -> View<ShopPivotRow> {
    if weeks.is_empty() || managers.is_empty() {
        return View::NoData;
    }
    let weeks: HashSet<u32> = weeks.iter().copied().collect();
    let managers: HashSet<&str> = managers.iter().map(String::as_str).collect();

    let mut groups: BTreeMap<(String, String), Counts> = BTreeMap::new();
    for r in data.iter().filter(|r| {
        weeks.contains(&r.raw.iso_week) && managers.contains(r.raw.area_manager.as_str())
    }) {
        let key = (r.raw.shop_label.clone(), r.raw.area_manager.clone());
        *groups.entry(key).or_default() += r.raw.counts;
    }
    debug!("Shop pivot: {} shops", groups.len());

    View::Rows(
        groups
            .into_iter()
            .map(|((shop, area_manager), counts)| ShopPivotRow {
                shop,
                area_manager,
                counts,
                rates: derive_rates(&counts),
            })
            .collect(),
    )
}
