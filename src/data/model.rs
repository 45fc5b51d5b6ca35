use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::error::ViewerError;

// ---------------------------------------------------------------------------
// Value – a single cell of a flattened record
// ---------------------------------------------------------------------------

/// A dynamically-typed scalar mirroring what the CRIM JSON API returns once
/// nested objects have been flattened.
/// Filter selections live in `BTreeSet`s, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --
// Equality, ordering and hashing all go through `total_cmp` / `to_bits`,
// so NaN cells compare equal to each other.

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl Value {
    /// Whether this cell marks a subtype indicator as set.
    ///
    /// The API is not consistent about indicator encoding: `1`, `1.0`,
    /// `true` and the strings `"1"` / `"true"` all occur.
    pub fn is_active(&self) -> bool {
        match self {
            Value::Integer(i) => *i == 1,
            Value::Float(v) => *v == 1.0,
            Value::Bool(b) => *b,
            Value::String(s) => {
                let s = s.trim();
                s == "1" || s.eq_ignore_ascii_case("true")
            }
            Value::Null => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text written into a CSV cell. Nulls become empty fields.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one observation or relationship
// ---------------------------------------------------------------------------

/// Position of a row in the table it was loaded into. Survives filtering, so
/// two views of the same row set can be compared row by row.
pub type RowId = usize;

static NULL: Value = Value::Null;

/// A single flattened record. Missing fields are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub values: BTreeMap<String, Value>,
}

impl Row {
    /// Cell for `column`, or `Null` when the record lacks it.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Table – an ordered row set with a shared column list
// ---------------------------------------------------------------------------

/// An ordered sequence of rows sharing a common column set.
///
/// Rows are reference counted: projections and filtered views share them
/// with the table they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in display/export order.
    pub columns: Vec<String>,
    pub rows: Vec<Arc<Row>>,
}

impl Table {
    /// Build a table from raw records. Columns are ordered by first
    /// appearance across records; row ids are assigned in input order.
    pub fn from_records(records: Vec<BTreeMap<String, Value>>) -> Self {
        Self::from_records_with_columns(Vec::new(), records)
    }

    /// Like [`Table::from_records`], but `leading` columns come first in the
    /// given order (used to keep a source file's header order).
    pub fn from_records_with_columns(
        leading: Vec<String>,
        records: Vec<BTreeMap<String, Value>>,
    ) -> Self {
        let mut seen: HashSet<String> = leading.iter().cloned().collect();
        let mut columns = leading;
        for rec in &records {
            for col in rec.keys() {
                if seen.insert(col.clone()) {
                    columns.push(col.clone());
                }
            }
        }
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(id, values)| Arc::new(Row { id, values }))
            .collect();
        Table { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with [`ViewerError::InvalidField`] unless `column` is in the schema.
    pub fn require_column(&self, column: &str) -> Result<(), ViewerError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(ViewerError::InvalidField {
                field: column.to_string(),
                available: self.columns.clone(),
            })
        }
    }

    /// Row ids in table order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Narrow the table to `columns` (in that order), keeping every row.
    pub fn project(&self, columns: &[&str]) -> Result<Table, ViewerError> {
        for col in columns {
            self.require_column(col)?;
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let values = columns
                    .iter()
                    .filter_map(|c| row.values.get(*c).map(|v| (c.to_string(), v.clone())))
                    .collect();
                Arc::new(Row { id: row.id, values })
            })
            .collect();
        Ok(Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    /// Keep rows whose `mask` entry is true. `mask` must have one entry per row.
    pub fn mask(&self, mask: &[bool]) -> Table {
        debug_assert_eq!(mask.len(), self.rows.len());
        let rows = self
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| Arc::clone(row))
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Distinct values of `column` in first-seen order (absent cells count
    /// as `Null`).
    pub fn distinct_values(&self, column: &str) -> Result<Vec<Value>, ViewerError> {
        self.require_column(column)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            let v = row.get(column);
            if seen.insert(v) {
                out.push(v.clone());
            }
        }
        Ok(out)
    }

    /// Rewrite every cell of `column` in place. Rows shared with other
    /// tables are copied first.
    pub fn map_column(&mut self, column: &str, mut f: impl FnMut(&Value) -> Value) {
        for row in &mut self.rows {
            if let Some(current) = row.values.get(column) {
                let next = f(current);
                if next != *current {
                    Arc::make_mut(row).values.insert(column.to_string(), next);
                }
            }
        }
    }

    /// Rename `from` to `to`, keeping its position. No-op when `from` is
    /// absent or `to` already exists.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if self.has_column(to) {
            return;
        }
        let Some(pos) = self.columns.iter().position(|c| c == from) else {
            return;
        };
        self.columns[pos] = to.to_string();
        for row in &mut self.rows {
            if row.values.contains_key(from) {
                let values = &mut Arc::make_mut(row).values;
                if let Some(v) = values.remove(from) {
                    values.insert(to.to_string(), v);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a table from `(column, values)` pairs; `Null` cells are left out
    /// of the record, as the flattener does for missing keys.
    pub(crate) fn table(columns: &[(&str, Vec<Value>)]) -> Table {
        let n = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let records = (0..n)
            .map(|i| {
                columns
                    .iter()
                    .filter(|(_, vals)| !vals[i].is_null())
                    .map(|(name, vals)| (name.to_string(), vals[i].clone()))
                    .collect()
            })
            .collect();
        Table::from_records_with_columns(
            columns.iter().map(|(c, _)| c.to_string()).collect(),
            records,
        )
    }

    pub(crate) fn strs(vals: &[&str]) -> Vec<Value> {
        vals.iter().map(|s| Value::from(*s)).collect()
    }

    pub(crate) fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|i| Value::Integer(*i)).collect()
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let mut a = BTreeMap::new();
        a.insert("id".to_string(), Value::Integer(1));
        let mut b = BTreeMap::new();
        b.insert("id".to_string(), Value::Integer(2));
        b.insert("extra".to_string(), Value::from("x"));
        let t = Table::from_records(vec![a, b]);
        assert_eq!(t.columns, vec!["id", "extra"]);
        assert_eq!(t.row_ids(), vec![0, 1]);
        assert_eq!(t.rows[0].get("extra"), &Value::Null);
    }

    #[test]
    fn test_project_keeps_rows_and_ids() {
        let t = table(&[
            ("id", ints(&[1, 2, 3])),
            ("observer", strs(&["A", "B", "A"])),
            ("musical_type", strs(&["Fuga", "PEN", "Fuga"])),
        ]);
        let p = t.project(&["musical_type", "id"]).unwrap();
        assert_eq!(p.columns, vec!["musical_type", "id"]);
        assert_eq!(p.row_ids(), t.row_ids());
        assert!(!p.rows[0].values.contains_key("observer"));
    }

    #[test]
    fn test_project_unknown_column() {
        let t = table(&[("id", ints(&[1]))]);
        let err = t.project(&["nope"]).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidField { ref field, .. } if field == "nope"));
    }

    #[test]
    fn test_distinct_values_first_seen() {
        let t = table(&[("musical_type", strs(&["PEN", "Fuga", "PEN", "Cadence"]))]);
        assert_eq!(
            t.distinct_values("musical_type").unwrap(),
            strs(&["PEN", "Fuga", "Cadence"])
        );
    }

    #[test]
    fn test_nan_cells_are_one_distinct_value() {
        let t = table(&[(
            "score",
            vec![Value::Float(f64::NAN), Value::Float(1.5), Value::Float(f64::NAN)],
        )]);
        let distinct = t.distinct_values("score").unwrap();
        assert_eq!(distinct.len(), 2);
        assert_eq!(distinct[0], Value::Float(f64::NAN));
        assert_ne!(Value::Float(f64::NAN), Value::Float(1.5));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_is_active_encodings() {
        assert!(Value::Integer(1).is_active());
        assert!(Value::Float(1.0).is_active());
        assert!(Value::Bool(true).is_active());
        assert!(Value::from("1").is_active());
        assert!(Value::from("True").is_active());
        assert!(!Value::Integer(0).is_active());
        assert!(!Value::Null.is_active());
        assert!(!Value::from("Fuga").is_active());
    }

    #[test]
    fn test_rename_column_keeps_position() {
        let mut t = table(&[
            ("id", ints(&[1, 2])),
            ("observer", vec![Value::from("Alice"), Value::Null]),
            ("musical_type", strs(&["Fuga", "PEN"])),
        ]);
        t.rename_column("observer", "observer.name");
        assert_eq!(t.columns, vec!["id", "observer.name", "musical_type"]);
        assert_eq!(t.rows[0].get("observer.name"), &Value::from("Alice"));
        assert!(!t.rows[0].values.contains_key("observer"));
        assert_eq!(t.rows[1].get("observer.name"), &Value::Null);

        t.rename_column("id", "musical_type");
        assert_eq!(t.columns, vec!["id", "observer.name", "musical_type"]);
    }

    #[test]
    fn test_map_column_does_not_touch_shared_rows() {
        let original = table(&[("cad", strs(&["authentic", "Phrygian"]))]);
        let mut copy = original.clone();
        copy.map_column("cad", |v| Value::from(v.to_string().to_uppercase().as_str()));
        assert_eq!(copy.rows[0].get("cad"), &Value::from("AUTHENTIC"));
        assert_eq!(original.rows[0].get("cad"), &Value::from("authentic"));
    }
}
