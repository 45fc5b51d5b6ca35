use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::ExportError;
use super::model::Table;

/// Write `table` as CSV: header row, then one line per row in table order.
/// No index column; nulls and missing cells are empty fields.
///
/// `path` is only used for error context. Returns the number of data rows.
pub fn export_csv<W: Write>(table: &Table, writer: W, path: &Path) -> Result<usize, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(&table.columns).map_err(csv_err)?;

    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).to_csv_field())
            .collect();
        csv_writer.write_record(&record).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(table.len())
}

/// Create `path` and export `table` into it.
pub fn save_csv(table: &Table, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let count = export_csv(table, std::io::BufWriter::new(file), path)?;
    log::info!("Exported {count} rows to {}", path.display());
    Ok(count)
}

/// Turn the free-text file name typed by the user into an export file
/// name: blank falls back to `default`, and `.csv` is appended if missing.
pub fn export_file_name(user_input: &str, default: &str) -> PathBuf {
    let name = user_input.trim();
    let name = if name.is_empty() { default } else { name };
    if name.to_ascii_lowercase().ends_with(".csv") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.csv"))
    }
}
