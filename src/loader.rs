use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::proration::{derive_records, ResidualCount};
use crate::types::{Counts, DerivedRecord, RawRecord};
use crate::util::{cell_date, cell_number, cell_text, cell_week};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::path::Path;

pub const DATE_COLUMN: &str = "Calendar[Date]";
pub const SOURCE_WEEK_COLUMN: &str = "Calendar[ISO Week]";
pub const WEEK_COLUMN: &str = "ISO Week";
pub const AREA_CODE_COLUMN: &str = "Shop[Area Code]";
pub const AREA_MANAGER_COLUMN: &str = "Shop[Area Manager]";
pub const SHOP_COLUMN: &str = "Shop[Shop Code - Descr]";
pub const AGENDA_COLUMN: &str = "Agenda_Appointments__Heads_";
pub const OPPORTUNITY_TEST_COLUMN: &str = "Opportunity_Test__Heads_";
pub const COMPLETED_COLUMN: &str = "Appointments_Completed";
pub const CANCELLED_COLUMN: &str = "Appointments_Cancelled";
pub const NET_TRIAL_COLUMN: &str = "Net_Trial_Activated__Heads_";
pub const RESCHEDULED_COLUMN: &str = "FP_Appointments_Rescheduled";
pub const ALL_APPOINTMENTS_COLUMN: &str = "FP_ALL_Appointments";

static EMPTY_CELL: Data = Data::Empty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub outside_window: usize,
    pub undated_rows: usize,
}

/// Inclusive calendar range of rows retained by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// From the Monday of the week `weeks` weeks before `today` through the
    /// Sunday of the current week.
    pub fn rolling(today: NaiveDate, weeks: u32) -> Self {
        let back = today - Duration::weeks(i64::from(weeks));
        let start = back - Duration::days(i64::from(back.weekday().num_days_from_monday()));
        let end = today + Duration::days(6 - i64::from(today.weekday().num_days_from_monday()));
        Window { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// An immutable ingestion result: every view is computed from one of these.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<DerivedRecord>,
    pub window: Window,
    pub residual: ResidualCount,
    pub report: LoadReport,
    pub loaded_at: NaiveDateTime,
}

/// Strip the bracket wrapper the source adds to measure columns and give the
/// calendar week column its short name.
pub fn normalize_header(raw: &str) -> String {
    let name = raw.trim();
    if name == SOURCE_WEEK_COLUMN {
        return WEEK_COLUMN.to_string();
    }
    if name.starts_with('[') {
        name.trim_matches(|c| c == '[' || c == ']').to_string()
    } else {
        name.to_string()
    }
}

struct Columns {
    date: usize,
    week: usize,
    area_code: usize,
    area_manager: usize,
    shop: usize,
    agenda: usize,
    opportunity_test: usize,
    completed: usize,
    cancelled: usize,
    net_trial: usize,
    rescheduled: usize,
    all_appointments: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
        };
        Ok(Columns {
            date: find(DATE_COLUMN)?,
            week: find(WEEK_COLUMN)?,
            area_code: find(AREA_CODE_COLUMN)?,
            area_manager: find(AREA_MANAGER_COLUMN)?,
            shop: find(SHOP_COLUMN)?,
            agenda: find(AGENDA_COLUMN)?,
            opportunity_test: find(OPPORTUNITY_TEST_COLUMN)?,
            completed: find(COMPLETED_COLUMN)?,
            cancelled: find(CANCELLED_COLUMN)?,
            net_trial: find(NET_TRIAL_COLUMN)?,
            rescheduled: find(RESCHEDULED_COLUMN)?,
            all_appointments: find(ALL_APPOINTMENTS_COLUMN)?,
        })
    }
}

/// Open the source workbook and return the configured sheet.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path)?;
    match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(ReportError::SheetNotFound(name.to_string()));
            }
            Ok(workbook.worksheet_range(name)?)
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or(ReportError::EmptyWorkbook)?
            .map_err(ReportError::from),
    }
}

/// Turn a sheet into typed records, keeping only rows dated inside `window`.
///
/// The first row is the header. A missing required column fails the whole
/// load; missing cells in the body become empty text or zero.
pub fn load_records(range: &Range<Data>, window: &Window) -> Result<(Vec<RawRecord>, LoadReport)> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| normalize_header(&cell_text(c))).collect(),
        None => Vec::new(),
    };
    let cols = Columns::locate(&headers)?;

    let mut total_rows = 0usize;
    let mut outside_window = 0usize;
    let mut undated_rows = 0usize;
    let mut records = Vec::new();

    for row in rows {
        total_rows += 1;
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

        let date = match cell_date(cell(cols.date)) {
            Some(d) => d,
            None => {
                undated_rows += 1;
                continue;
            }
        };
        if !window.contains(date) {
            outside_window += 1;
            continue;
        }

        records.push(RawRecord {
            date,
            iso_week: cell_week(cell(cols.week)),
            area_code: cell_text(cell(cols.area_code)),
            area_manager: cell_text(cell(cols.area_manager)),
            shop_label: cell_text(cell(cols.shop)),
            counts: Counts::from_raw(
                cell_number(cell(cols.agenda)),
                cell_number(cell(cols.opportunity_test)),
                cell_number(cell(cols.completed)),
                cell_number(cell(cols.cancelled)),
                cell_number(cell(cols.net_trial)),
                cell_number(cell(cols.rescheduled)),
                cell_number(cell(cols.all_appointments)),
            ),
        });
    }

    let report = LoadReport {
        total_rows,
        kept_rows: records.len(),
        outside_window,
        undated_rows,
    };
    debug!("{:?}", report);
    Ok((records, report))
}

/// Run ingestion and proration over an already opened sheet.
pub fn build_snapshot(
    range: &Range<Data>,
    now: NaiveDateTime,
    config: &ReportConfig,
) -> Result<Snapshot> {
    let window = Window::rolling(now.date(), config.window_weeks);
    info!("Loading rows dated {} to {}", window.start, window.end);
    let (records, report) = load_records(range, &window)?;
    let (records, residual) = derive_records(records, config.residual_policy)?;
    Ok(Snapshot {
        records,
        window,
        residual,
        report,
        loaded_at: now,
    })
}

/// Read the configured source from disk and build a snapshot from it.
pub fn load_and_clean(config: &ReportConfig, now: NaiveDateTime) -> Result<Snapshot> {
    let range = read_sheet(&config.source, config.sheet.as_deref())?;
    build_snapshot(&range, now, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proration::ResidualPolicy;
    use crate::types::AreaLabel;

    const HEADERS: [&str; 12] = [
        "Calendar[Date]",
        "Calendar[ISO Week]",
        "Shop[Area Code]",
        "Shop[Area Manager]",
        "Shop[Shop Code - Descr]",
        "[Agenda_Appointments__Heads_]",
        "[Opportunity_Test__Heads_]",
        "[Appointments_Completed]",
        "[Appointments_Cancelled]",
        "[Net_Trial_Activated__Heads_]",
        "[FP_Appointments_Rescheduled]",
        "[FP_ALL_Appointments]",
    ];

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sheet(rows: &[Vec<Data>]) -> Range<Data> {
        let mut range = Range::new((0, 0), (rows.len() as u32, HEADERS.len() as u32 - 1));
        for (c, h) in HEADERS.iter().enumerate() {
            range.set_value((0, c as u32), Data::String(h.to_string()));
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                range.set_value((r as u32 + 1, c as u32), v.clone());
            }
        }
        range
    }

    fn row(date: &str, code: Data, agenda: f64) -> Vec<Data> {
        vec![
            Data::String(date.to_string()),
            Data::Float(42.0),
            code,
            Data::String("Tamara Fuente".to_string()),
            Data::String("0012 - Madrid Centro".to_string()),
            Data::Float(agenda),
            Data::Float(1.0),
            Data::Empty,
            Data::Float(2.0),
            Data::Empty,
            Data::Float(0.0),
            Data::Float(agenda),
        ]
    }

    #[test]
    fn headers_are_normalized() {
        assert_eq!(normalize_header("[Appointments_Completed]"), "Appointments_Completed");
        assert_eq!(normalize_header("Calendar[ISO Week]"), "ISO Week");
        assert_eq!(normalize_header("Shop[Area Code]"), "Shop[Area Code]");
        assert_eq!(normalize_header("Calendar[Date]"), "Calendar[Date]");
    }

    #[test]
    fn window_spans_monday_to_sunday() {
        // Wednesday 2026-10-21: twelve weeks back is Wednesday 2026-07-29.
        let w = Window::rolling(day(2026, 10, 21), 12);
        assert_eq!(w.start, day(2026, 7, 27));
        assert_eq!(w.end, day(2026, 10, 25));
        assert!(w.contains(day(2026, 7, 27)));
        assert!(!w.contains(day(2026, 7, 26)));
        assert!(w.contains(day(2026, 10, 25)));
        assert!(!w.contains(day(2026, 10, 26)));
    }

    #[test]
    fn window_on_a_monday_and_a_sunday() {
        let monday = Window::rolling(day(2026, 10, 19), 12);
        assert_eq!(monday.start, day(2026, 7, 27));
        assert_eq!(monday.end, day(2026, 10, 25));
        let sunday = Window::rolling(day(2026, 10, 25), 12);
        assert_eq!(sunday.start, day(2026, 7, 27));
        assert_eq!(sunday.end, day(2026, 10, 25));
    }

    #[test]
    fn rows_outside_window_are_dropped() {
        let w = Window::rolling(day(2026, 10, 21), 12);
        let range = sheet(&[
            row("2026-07-26", Data::String("304".into()), 1.0),
            row("2026-07-27", Data::String("304".into()), 2.0),
            row("2026-10-25", Data::String("304".into()), 3.0),
            row("2026-10-26", Data::String("304".into()), 4.0),
            row("", Data::String("304".into()), 5.0),
        ]);
        let (records, report) = load_records(&range, &w).unwrap();
        let agendas: Vec<f64> = records.iter().map(|r| r.counts.agenda).collect();
        assert_eq!(agendas, vec![2.0, 3.0]);
        assert_eq!(
            report,
            LoadReport {
                total_rows: 5,
                kept_rows: 2,
                outside_window: 2,
                undated_rows: 1,
            }
        );
    }

    #[test]
    fn cells_are_typed_and_nulls_become_zero() {
        let w = Window::rolling(day(2026, 10, 21), 12);
        let range = sheet(&[row("2026-10-12", Data::Float(304.0), 7.0)]);
        let (records, _) = load_records(&range, &w).unwrap();
        let r = &records[0];
        assert_eq!(r.iso_week, 42);
        assert_eq!(r.area_code, "304");
        assert_eq!(r.shop_label, "0012 - Madrid Centro");
        assert_eq!(r.counts.completed, 0.0);
        assert_eq!(r.counts.net_trial, 0.0);
        assert_eq!(r.counts.total_appointments, 9.0);
    }

    #[test]
    fn excel_serial_dates_are_understood() {
        let w = Window::rolling(day(2025, 1, 8), 12);
        let mut r = row("", Data::String("304".into()), 1.0);
        r[0] = Data::Float(45658.0);
        let (records, _) = load_records(&sheet(&[r]), &w).unwrap();
        assert_eq!(records[0].date, day(2025, 1, 1));
    }

    #[test]
    fn missing_column_is_fatal() {
        let mut range = Range::new((0, 0), (1, 0));
        range.set_value((0, 0), Data::String("Calendar[Date]".to_string()));
        range.set_value((1, 0), Data::String("2026-10-12".to_string()));
        let w = Window::rolling(day(2026, 10, 21), 12);
        match load_records(&range, &w) {
            Err(ReportError::MissingColumn(name)) => assert_eq!(name, WEEK_COLUMN),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_prorates_other_areas() {
        let now = day(2026, 10, 21).and_hms_opt(9, 30, 0).unwrap();
        let range = sheet(&[
            row("2026-10-12", Data::String("304".into()), 10.0),
            row("2026-10-12", Data::String("999".into()), 6.0),
            row("2026-10-13", Data::String("888".into()), 4.0),
        ]);
        let config = ReportConfig::default();
        let snapshot = build_snapshot(&range, now, &config).unwrap();
        assert_eq!(snapshot.residual.value, 2);
        assert_eq!(snapshot.records[0].area, AreaLabel::Named("A17 TAMARA FUENTE"));
        assert_eq!(snapshot.records[1].derived.agenda, 3.0);
        assert_eq!(snapshot.records[2].derived.agenda, 2.0);

        let legacy = ReportConfig {
            residual_policy: ResidualPolicy::Legacy,
            ..ReportConfig::default()
        };
        assert!(matches!(
            build_snapshot(&range, now, &legacy),
            Err(ReportError::ProrationUndefined { residual: -2, .. })
        ));
    }
}
