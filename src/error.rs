use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("required column `{0}` is missing from the source table")]
    MissingColumn(String),

    #[error("sheet `{0}` not found in the source workbook")]
    SheetNotFound(String),

    #[error("source workbook contains no sheets")]
    EmptyWorkbook,

    /// Raised instead of dividing Other Areas volumes by zero or a negative count.
    #[error(
        "cannot prorate {other_rows} Other Areas rows: residual area count is {residual} \
         ({distinct_codes} distinct codes)"
    )]
    ProrationUndefined {
        residual: i64,
        distinct_codes: usize,
        other_rows: usize,
    },

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to encode spreadsheet: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
