use crate::proration::ResidualPolicy;
use std::path::PathBuf;

pub const DEFAULT_SOURCE: &str = "mbreport_query_new.xlsx";
pub const DEFAULT_EXPORT: &str = "shop_details.xlsx";
pub const DEFAULT_WINDOW_WEEKS: u32 = 12;

/// Managers preselected in the shop details view when present in the data.
pub const DEFAULT_AREA_MANAGERS: [&str; 4] = [
    "Tamara Fuente",
    "Eleonora Armonici",
    "Lorena Exposito",
    "Jesus Tena",
];

/// Everything the ingestion pipeline needs besides the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub source: PathBuf,
    /// Sheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    pub window_weeks: u32,
    pub residual_policy: ResidualPolicy,
    pub export_path: PathBuf,
    /// When set, the overview and time series views are also saved here.
    pub output_dir: Option<PathBuf>,
}

impl ReportConfig {
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        ReportConfig {
            source: source.into(),
            ..Self::default()
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            source: PathBuf::from(DEFAULT_SOURCE),
            sheet: None,
            window_weeks: DEFAULT_WINDOW_WEEKS,
            residual_policy: ResidualPolicy::default(),
            export_path: PathBuf::from(DEFAULT_EXPORT),
            output_dir: None,
        }
    }
}
