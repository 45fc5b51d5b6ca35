use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Core error taxonomy
// ---------------------------------------------------------------------------

/// Errors raised by the pure data core (filtering, aggregation, schema).
///
/// `InvalidField` and `Alignment` signal caller bugs and abort the
/// operation. `MissingColumn` signals schema drift in the upstream data and
/// is reported through diagnostics lists rather than returned as `Err`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    #[error("unknown field '{field}' (available: {})", available.join(", "))]
    InvalidField {
        field: String,
        available: Vec<String>,
    },

    #[error("selection table has {selection_rows} rows but full table has {full_rows}, or their row order differs")]
    Alignment {
        selection_rows: usize,
        full_rows: usize,
    },

    #[error("column '{column}' for '{label}' is missing; counted as 0")]
    MissingColumn { label: String, column: String },
}

/// Errors writing a CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing CSV to '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
