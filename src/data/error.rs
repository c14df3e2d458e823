use thiserror::Error;

/// Result alias for data-layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the loading / unification / aggregation pipeline.
///
/// Per-cell coercion failures are never represented here: a cell that fails
/// numeric parsing becomes null and only shows up in aggregate null counts.
#[derive(Debug, Error)]
pub enum DataError {
    /// One sheet's bytes were malformed. Recovered locally by the loader,
    /// which omits the sheet and records a [`SheetSkip`] instead of failing
    /// the whole load.
    ///
    /// [`SheetSkip`]: crate::data::loader::SheetSkip
    #[error("sheet '{sheet}' could not be decoded: {reason}")]
    SheetDecode { sheet: String, reason: String },

    /// Zero sheets decoded successfully. Fatal to the current session.
    #[error("no sheets could be decoded from the source")]
    NoDataAvailable,

    /// A sheet name was requested that the workbook does not contain.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// File extension not recognised by the loader.
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// Failed to open the workbook container itself.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// Table construction with two columns of the same name.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// Table construction with ragged columns.
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Aggregation request rejected before computation.
    #[error("invalid aggregation request: {0}")]
    InvalidAggregationRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<calamine::Error> for DataError {
    fn from(err: calamine::Error) -> Self {
        DataError::Workbook(err.to_string())
    }
}

impl From<calamine::XlsxError> for DataError {
    fn from(err: calamine::XlsxError) -> Self {
        DataError::Workbook(err.to_string())
    }
}
