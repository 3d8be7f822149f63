use thiserror::Error;

use crate::model::record::RecordKind;

/// Errors raised by the ingest/report core. Plumbing around it uses `anyhow`.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("timestamp {value:?} does not match format {format:?}")]
    MalformedTimestamp { value: String, format: String },

    #[error("{kind} row has {found} allow-listed columns, expected {expected}")]
    FieldCountMismatch {
        kind: RecordKind,
        expected: usize,
        found: usize,
    },

    #[error("nothing to export: no records left after filtering")]
    EmptyResultSet,

    #[error("invalid format string for {key}: {format:?}")]
    InvalidFormat { key: String, format: String },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
