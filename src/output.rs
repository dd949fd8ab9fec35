use crate::error::Result;
use crate::types::{
    AreaSeries, AreaSummaryDisplay, AreaSummaryRow, Metric, SeriesPointDisplay, ShopPivotDisplay,
    ShopPivotRow,
};
use crate::util::{format_count, format_number, format_percent};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub const SHOP_PIVOT_SHEET: &str = "Sheet1";

/// Column headers of the exported shop pivot, in sheet order.
pub const SHOP_PIVOT_HEADERS: [&str; 15] = [
    "Shop[Shop Code - Descr]",
    "Shop[Area Manager]",
    "Agenda_Appointments__Heads_",
    "Appointments_Cancelled",
    "Appointments_Completed",
    "FP_ALL_Appointments",
    "FP_Appointments_Rescheduled",
    "Net_Trial_Activated__Heads_",
    "Opportunity_Test__Heads_",
    "Total_Appointments",
    "Appointment to test: Conversion rate",
    "Appointment to trial: Conversion rate",
    "Cancellation rate",
    "Reschedule rate",
    "Show rate",
];

pub fn area_summary_display(rows: &[AreaSummaryRow]) -> Vec<AreaSummaryDisplay> {
    rows.iter()
        .map(|r| AreaSummaryDisplay {
            area: r.area.to_string(),
            all_appointments: format_count(r.counts.all_appointments),
            total_appointments: format_count(r.counts.total_appointments),
            cancelled: format_count(r.counts.cancelled),
            rescheduled: format_count(r.counts.rescheduled),
            agenda: format_count(r.counts.agenda),
            completed: format_count(r.counts.completed),
            opportunity_test: format_count(r.counts.opportunity_test),
            net_trial: format_count(r.counts.net_trial),
            conversion_to_test: format_percent(r.rates.conversion_to_test, 1),
            conversion_to_trial: format_percent(r.rates.conversion_to_trial, 1),
            cancellation: format_percent(r.rates.cancellation, 1),
            reschedule: format_percent(r.rates.reschedule, 1),
            show: format_percent(r.rates.show, 1),
        })
        .collect()
}

pub fn series_display(series: &[AreaSeries], metric: Metric) -> Vec<SeriesPointDisplay> {
    let mut points: Vec<SeriesPointDisplay> = series
        .iter()
        .flat_map(|s| {
            s.points.iter().map(move |(week, value)| SeriesPointDisplay {
                iso_week: *week,
                area: s.area.to_string(),
                value: if metric.is_rate() {
                    format_percent(*value, 1)
                } else {
                    format_count(*value)
                },
            })
        })
        .collect();
    points.sort_by_key(|p| p.iso_week);
    points
}

pub fn shop_pivot_display(rows: &[ShopPivotRow]) -> Vec<ShopPivotDisplay> {
    let count = |v: f64| format_number(v, 0);
    rows.iter()
        .map(|r| ShopPivotDisplay {
            shop: r.shop.clone(),
            area_manager: r.area_manager.clone(),
            agenda: count(r.counts.agenda),
            cancelled: count(r.counts.cancelled),
            completed: count(r.counts.completed),
            all_appointments: count(r.counts.all_appointments),
            rescheduled: count(r.counts.rescheduled),
            net_trial: count(r.counts.net_trial),
            opportunity_test: count(r.counts.opportunity_test),
            total_appointments: count(r.counts.total_appointments),
            conversion_to_test: format_percent(r.rates.conversion_to_test, 2),
            conversion_to_trial: format_percent(r.rates.conversion_to_trial, 2),
            cancellation: format_percent(r.rates.cancellation, 2),
            reschedule: format_percent(r.rates.reschedule, 2),
            show: format_percent(r.rates.show, 2),
        })
        .collect()
}

/// Encode the shop pivot as a single-sheet workbook.
///
/// Counts are written as numbers; rates as percentage text with two decimals,
/// undefined ones as `-`.
pub fn shop_pivot_xlsx(rows: &[ShopPivotRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHOP_PIVOT_SHEET)?;

    for (col, header) in SHOP_PIVOT_HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, &r.shop)?;
        worksheet.write_string(row, 1, &r.area_manager)?;
        let counts = [
            r.counts.agenda,
            r.counts.cancelled,
            r.counts.completed,
            r.counts.all_appointments,
            r.counts.rescheduled,
            r.counts.net_trial,
            r.counts.opportunity_test,
            r.counts.total_appointments,
        ];
        for (offset, value) in counts.iter().enumerate() {
            worksheet.write_number(row, 2 + offset as u16, *value)?;
        }
        let rates = [
            r.rates.conversion_to_test,
            r.rates.conversion_to_trial,
            r.rates.cancellation,
            r.rates.reschedule,
            r.rates.show,
        ];
        for (offset, value) in rates.iter().enumerate() {
            worksheet.write_string(row, 10 + offset as u16, format_percent(*value, 2))?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn write_shop_pivot_xlsx(path: &Path, rows: &[ShopPivotRow]) -> Result<()> {
    std::fs::write(path, shop_pivot_xlsx(rows)?)?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AreaLabel, Counts, Rates};
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn pivot_row(shop: &str, agenda: f64, completed: f64) -> ShopPivotRow {
        let counts = Counts::from_raw(agenda, 2.0, completed, 1.0, 1.0, 0.0, agenda + 1.0);
        ShopPivotRow {
            shop: shop.to_string(),
            area_manager: "Tamara Fuente".to_string(),
            counts,
            rates: crate::rates::derive_rates(&counts),
        }
    }

    #[test]
    fn xlsx_has_header_and_formatted_rates() {
        let rows = vec![pivot_row("0012 - Madrid", 8.0, 6.0), pivot_row("0013 - Toledo", 0.0, 0.0)];
        let bytes = shop_pivot_xlsx(&rows).unwrap();

        let mut book = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(book.sheet_names(), vec![SHOP_PIVOT_SHEET.to_string()]);
        let range = book.worksheet_range(SHOP_PIVOT_SHEET).unwrap();
        assert_eq!(range.get_size(), (3, 15));

        let header: Vec<String> = range.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, SHOP_PIVOT_HEADERS.map(String::from).to_vec());

        assert_eq!(range.get_value((1, 0)), Some(&Data::String("0012 - Madrid".into())));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Float(8.0)));
        assert_eq!(range.get_value((1, 9)), Some(&Data::Float(9.0)));
        assert_eq!(range.get_value((1, 10)), Some(&Data::String("25.00%".into())));
        assert_eq!(range.get_value((1, 14)), Some(&Data::String("75.00%".into())));
        // Zero agenda: guarded conversion is 0, show rate is undefined.
        assert_eq!(range.get_value((2, 10)), Some(&Data::String("0.00%".into())));
        assert_eq!(range.get_value((2, 14)), Some(&Data::String("-".into())));
    }

    #[test]
    fn empty_pivot_still_has_header() {
        let bytes = shop_pivot_xlsx(&[]).unwrap();
        let mut book = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = book.worksheet_range(SHOP_PIVOT_SHEET).unwrap();
        assert_eq!(range.get_size(), (1, 15));
    }

    #[test]
    fn summary_display_rounds_counts_and_formats_rates() {
        let counts = Counts::from_raw(1234.6, 617.3, 900.0, 100.0, 10.0, 5.0, 1000.0);
        let rows = vec![AreaSummaryRow {
            area: AreaLabel::OtherAreas,
            counts,
            rates: crate::rates::derive_rates(&counts),
        }];
        let shown = area_summary_display(&rows);
        assert_eq!(shown[0].area, "Other Areas");
        assert_eq!(shown[0].agenda, "1,235");
        assert_eq!(shown[0].total_appointments, "1,335");
        assert_eq!(shown[0].conversion_to_test, "50.0%");
        assert_eq!(shown[0].reschedule, "0.5%");
    }

    #[test]
    fn series_display_formats_by_metric_kind() {
        let series = vec![AreaSeries {
            area: AreaLabel::Named("A17 TAMARA FUENTE"),
            points: vec![(41, 0.256), (42, f64::NAN)],
        }];
        let rates = series_display(&series, Metric::ShowRate);
        assert_eq!(rates[0].value, "25.6%");
        assert_eq!(rates[1].value, "-");
        let counts = series_display(&series, Metric::AgendaAppointments);
        assert_eq!(counts[0].value, "0");
    }

    #[test]
    fn undefined_rates_render_as_dash() {
        let rows = vec![ShopPivotRow {
            shop: "S".into(),
            area_manager: "M".into(),
            counts: Counts::default(),
            rates: Rates {
                conversion_to_test: 0.0,
                conversion_to_trial: 0.0,
                cancellation: f64::NAN,
                reschedule: f64::NAN,
                show: f64::INFINITY,
            },
        }];
        let shown = shop_pivot_display(&rows);
        assert_eq!(shown[0].conversion_to_test, "0.00%");
        assert_eq!(shown[0].cancellation, "-");
        assert_eq!(shown[0].show, "-");
    }
}
