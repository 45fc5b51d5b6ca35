use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};

/// Largest response body accepted from the API.
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Where a dataset is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// JSON endpoint of the CRIM API.
    Url(String),
    /// Local snapshot (`.json`, `.csv`, `.parquet`).
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(u) => write!(f, "{u}"),
            Source::File(p) => write!(f, "{}", p.display()),
        }
    }
}

impl Source {
    /// Cache key for this source.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Read the source into a flattened table.
    pub fn load(&self, timeout: Duration) -> Result<Table> {
        let table = match self {
            Source::Url(url) => fetch_json(url, timeout)?,
            Source::File(path) => load_file(path)?,
        };
        log::info!(
            "Loaded {} rows with {} columns from {self}",
            table.len(),
            table.columns.len()
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// GET `url` and flatten the JSON array it returns.
pub fn fetch_json(url: &str, timeout: Duration) -> Result<Table> {
    log::debug!("GET {url}");
    let response = ureq::get(url)
        .config()
        .timeout_global(Some(timeout))
        .build()
        .call()
        .with_context(|| format!("requesting {url}"))?;
    let body = response
        .into_body()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_string()
        .with_context(|| format!("reading response body from {url}"))?;
    let root: JsonValue =
        serde_json::from_str(&body).with_context(|| format!("parsing JSON from {url}"))?;
    flatten_records(&root)
}

// ---------------------------------------------------------------------------
// JSON flattening
// ---------------------------------------------------------------------------

/// Flatten a top-level JSON array of objects into a table.
///
/// Nested objects become dot-separated columns (`{"observer": {"name": ..}}`
/// → `observer.name`); arrays are kept as their JSON text; a nested `null`
/// object yields a single null column under its own key.
pub fn flatten_records(root: &JsonValue) -> Result<Table> {
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let mut flat = BTreeMap::new();
        for (key, val) in obj {
            flatten_into(key, val, &mut flat);
        }
        rows.push(flat);
    }

    Ok(Table::from_records(rows))
}

fn flatten_into(prefix: &str, val: &JsonValue, out: &mut BTreeMap<String, Value>) {
    match val {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(&format!("{prefix}.{key}"), inner, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), json_to_value(other));
        }
    }
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Local snapshots
// ---------------------------------------------------------------------------

/// Load a snapshot from a file.  Dispatch by extension.
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    flatten_records(&root)
}

/// Header row with already-flattened column names, as written by the CSV
/// export. Empty fields are nulls.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), guess_value_type(v)))
            .filter(|(_, v)| !v.is_null())
            .collect();
        rows.push(values);
    }

    Ok(Table::from_records_with_columns(headers, rows))
}

fn guess_value_type(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

/// Load a Parquet snapshot. Every column becomes a table column; list and
/// struct columns are rendered as text.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut values = BTreeMap::new();
            for (col_idx, col_name) in columns.iter().enumerate() {
                let value = extract_value(batch.column(col_idx), row);
                if !value.is_null() {
                    values.insert(col_name.clone(), value);
                }
            }
            rows.push(values);
        }
    }

    Ok(Table::from_records_with_columns(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        _ => match arrow::util::display::array_value_to_string(col.as_ref(), row) {
            Ok(s) => Value::String(s),
            Err(_) => Value::String(format!("{:?}", col.data_type())),
        },
    }
}
