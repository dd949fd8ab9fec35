// Entry point and high-level CLI flow.
//
// - Option [1] re-reads the export, bypassing the snapshot cache.
// - Options [2]-[4] render the overview, time series and shop details views
//   from the current snapshot; shop details are also exported to a workbook.
use chrono::{Local, Month};
use clap::Parser;
use log::{error, info};
use mbreport::output::{self, preview_table_rows};
use mbreport::reports::{self, View};
use mbreport::types::Metric;
use mbreport::{selection, util, ReportConfig, ResidualPolicy, Snapshot, SnapshotCache};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mbreport")]
#[command(about = "Appointment funnel report by area, week and shop", long_about = None)]
struct Cli {
    /// Spreadsheet export to read
    #[arg(long, default_value = mbreport::config::DEFAULT_SOURCE)]
    source: PathBuf,
    /// Sheet to read (first sheet when omitted)
    #[arg(long)]
    sheet: Option<String>,
    /// Length of the rolling window in ISO weeks
    #[arg(long, default_value_t = mbreport::config::DEFAULT_WINDOW_WEEKS)]
    window_weeks: u32,
    /// How the number of residual areas behind "Other Areas" is estimated
    #[arg(long, value_enum, default_value_t = ResidualPolicy::Distinct)]
    residual_policy: ResidualPolicy,
    /// Where the shop details workbook is written
    #[arg(long, default_value = mbreport::config::DEFAULT_EXPORT)]
    export: PathBuf,
    /// Also save the overview (CSV) and time series (JSON) into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl From<Cli> for ReportConfig {
    fn from(cli: Cli) -> Self {
        ReportConfig {
            source: cli.source,
            sheet: cli.sheet,
            window_weeks: cli.window_weeks,
            residual_policy: cli.residual_policy,
            export_path: cli.export,
            output_dir: cli.out_dir,
        }
    }
}

fn prompt(label: &str) -> String {
    print!("{label}: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank or `All` keeps every choice; otherwise only listed weeks that exist.
fn pick_weeks(input: &str, choices: &[u32]) -> Vec<u32> {
    let items = split_list(input);
    if items.is_empty() || items.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        return choices.to_vec();
    }
    items
        .iter()
        .filter_map(|s| s.parse::<u32>().ok())
        .filter(|w| choices.contains(w))
        .collect()
}

fn pick_months(input: &str) -> Vec<Month> {
    let items = split_list(input);
    if items.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        return Vec::new();
    }
    items.iter().filter_map(|s| selection::parse_month(s)).collect()
}

fn format_weeks(weeks: &[u32]) -> String {
    weeks
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn handle_load(cache: &mut SnapshotCache, force: bool) -> Option<Arc<Snapshot>> {
    let now = Local::now().naive_local();
    let loaded = if force { cache.refresh(now) } else { cache.load(now) };
    match loaded {
        Ok(snapshot) => {
            let r = &snapshot.report;
            println!(
                "Processing dataset... ({} rows read, {} kept for {} to {})",
                util::format_int(r.total_rows),
                util::format_int(r.kept_rows),
                snapshot.window.start,
                snapshot.window.end
            );
            if r.undated_rows > 0 {
                println!(
                    "Note: {} rows skipped for lack of a usable date.",
                    util::format_int(r.undated_rows)
                );
            }
            println!(
                "Other Areas prorated across {} residual areas.\n",
                snapshot.residual.value
            );
            Some(snapshot)
        }
        Err(e) => {
            error!("Failed to load {}: {}", cache.config().source.display(), e);
            eprintln!("Failed to load file: {}\n", e);
            None
        }
    }
}

fn handle_overview(snapshot: &Snapshot, out_dir: Option<&Path>) {
    let data = &snapshot.records;
    let months: Vec<String> = selection::available_months(data)
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    println!("Months: All, {}", months.join(", "));
    let chosen_months = pick_months(&prompt("Select month(s) [All]"));
    let week_choices = selection::weeks_in_months(data, &chosen_months);
    println!("ISO weeks: All, {}", format_weeks(&week_choices));
    let weeks = pick_weeks(&prompt("Select ISO week(s) [All]"), &week_choices);

    println!("\nOverview\n");
    match reports::area_summary(data, &weeks) {
        View::Rows(rows) => {
            let shown = output::area_summary_display(&rows);
            preview_table_rows(&shown, shown.len());
            if let Some(dir) = out_dir {
                let file = dir.join("area_summary.csv");
                match output::write_csv(&file, &shown) {
                    Ok(()) => println!("(Full table exported to {})\n", file.display()),
                    Err(e) => eprintln!("Write error: {}", e),
                }
            }
        }
        View::NoData => println!("Not enough filters to show data.\n"),
    }
}

fn handle_time_series(snapshot: &Snapshot, out_dir: Option<&Path>) {
    for (i, m) in Metric::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, m);
    }
    let input = prompt("Select metric by number or name [1]");
    let metric = input
        .parse::<usize>()
        .ok()
        .and_then(|i| Metric::ALL.get(i.wrapping_sub(1)).copied())
        .or_else(|| Metric::from_label(&input))
        .unwrap_or(Metric::AllAppointments);

    let rows = reports::weekly_time_series(&snapshot.records);
    let series = reports::series_for_metric(&rows, metric);
    println!("\nTime series of {} by area\n", metric);
    let points = output::series_display(&series, metric);
    preview_table_rows(&points, points.len());
    if let Some(dir) = out_dir {
        let file = dir.join("time_series.json");
        match output::write_json(&file, &rows) {
            Ok(()) => println!("(Full series exported to {})\n", file.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
}

fn handle_shop_details(snapshot: &Snapshot, export_path: &Path) {
    let data = &snapshot.records;
    let week_choices = selection::available_weeks(data);
    let default_weeks = selection::default_shop_weeks(data);
    println!("ISO weeks: {}", format_weeks(&week_choices));
    let input = prompt(&format!("Select ISO week(s) [{}]", format_weeks(&default_weeks)));
    let weeks = if input.is_empty() {
        default_weeks
    } else {
        pick_weeks(&input, &week_choices)
    };

    let default_managers = selection::default_area_managers(data);
    println!("Area managers: {}", selection::area_managers(data).join(", "));
    let input = prompt(&format!("Select area manager(s) [{}]", default_managers.join(", ")));
    let managers = if input.is_empty() {
        default_managers
    } else {
        split_list(&input)
    };

    println!("\nShop Details\n");
    match reports::shop_pivot(data, &weeks, &managers) {
        View::Rows(rows) => {
            preview_table_rows(&output::shop_pivot_display(&rows), rows.len());
            match output::write_shop_pivot_xlsx(export_path, &rows) {
                Ok(()) => {
                    info!("Exported {} shops to {}", rows.len(), export_path.display());
                    println!("(Full table exported to {})\n", export_path.display());
                }
                Err(e) => eprintln!("Write error: {}", e),
            }
        }
        View::NoData => println!("Not enough filters to show data.\n"),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ReportConfig::from(Cli::parse());
    let export_path = config.export_path.clone();
    let out_dir = config.output_dir.clone();
    let mut cache = SnapshotCache::new(config);
    let mut snapshot = handle_load(&mut cache, false);

    loop {
        println!("MB Report Analysis");
        println!("[1] Update data");
        println!("[2] Overview");
        println!("[3] Time series");
        println!("[4] Shop details");
        println!("[5] Exit\n");
        let choice = prompt("Enter choice");
        if choice == "5" {
            println!("Exiting the program.");
            break;
        }
        if choice == "1" {
            if let Some(fresh) = handle_load(&mut cache, true) {
                println!("Data Updated Successfully\n");
                snapshot = Some(fresh);
            }
            continue;
        }

        // Pick up a changed source file without re-reading an unchanged one.
        match cache.load(Local::now().naive_local()) {
            Ok(current) => snapshot = Some(current),
            Err(e) => error!("Reload failed, keeping previous data: {}", e),
        }
        let Some(current) = snapshot.as_deref() else {
            println!("Error: No data loaded. Please update the data first (option 1).\n");
            continue;
        };
        match choice.as_str() {
            "2" => handle_overview(current, out_dir.as_deref()),
            "3" => handle_time_series(current, out_dir.as_deref()),
            "4" => handle_shop_details(current, &export_path),
            _ => println!("Invalid choice. Please enter 1 to 5.\n"),
        }
    }
}
