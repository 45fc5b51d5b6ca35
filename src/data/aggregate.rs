use std::collections::HashMap;

use super::error::ViewerError;
use super::model::{Row, Table, Value};

// ---------------------------------------------------------------------------
// Per-field frequency tables
// ---------------------------------------------------------------------------

/// Record counts per distinct value of one field.
///
/// Ordered by descending count; ties keep the order in which the values
/// were first seen in the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCounts {
    pub field: String,
    pub entries: Vec<(Value, usize)>,
}

impl CategoryCounts {
    /// Count for `value`, zero when it never occurs.
    pub fn get(&self, value: &Value) -> usize {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }
}

/// Group `table` by `field` and count rows per distinct value. Rows lacking
/// the field are counted under `Null`.
pub fn counts_by_field(table: &Table, field: &str) -> Result<CategoryCounts, ViewerError> {
    table.require_column(field)?;

    let mut index: HashMap<&Value, usize> = HashMap::new();
    let mut entries: Vec<(Value, usize)> = Vec::new();
    for row in &table.rows {
        let v = row.get(field);
        match index.get(v) {
            Some(&i) => entries[i].1 += 1,
            None => {
                index.insert(v, entries.len());
                entries.push((v.clone(), 1));
            }
        }
    }
    // Stable sort: ties stay in first-seen order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(CategoryCounts {
        field: field.to_string(),
        entries,
    })
}

// ---------------------------------------------------------------------------
// Subtype families
// ---------------------------------------------------------------------------

/// Where a subtype label reads its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum SubtypeSource {
    /// 0/1 indicator column.
    Indicator(String),
    /// Categorical column; the subtype applies when the cell matches one of
    /// the accepted spellings, ignoring ASCII case.
    OneOf { column: String, accepted: Vec<String> },
}

impl SubtypeSource {
    pub fn column(&self) -> &str {
        match self {
            SubtypeSource::Indicator(c) => c,
            SubtypeSource::OneOf { column, .. } => column,
        }
    }

    /// Whether this subtype applies to `row`.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            SubtypeSource::Indicator(c) => row.get(c).is_active(),
            SubtypeSource::OneOf { column, accepted } => match row.get(column).as_str() {
                Some(s) => {
                    let s = s.trim();
                    accepted.iter().any(|a| a.eq_ignore_ascii_case(s))
                }
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtypeEntry {
    pub label: String,
    pub source: SubtypeSource,
}

impl SubtypeEntry {
    pub fn indicator(label: &str, column: &str) -> Self {
        SubtypeEntry {
            label: label.to_string(),
            source: SubtypeSource::Indicator(column.to_string()),
        }
    }

    pub fn one_of(label: &str, column: &str, accepted: &[&str]) -> Self {
        SubtypeEntry {
            label: label.to_string(),
            source: SubtypeSource::OneOf {
                column: column.to_string(),
                accepted: accepted.iter().map(|a| a.to_string()).collect(),
            },
        }
    }
}

/// A named family of subtypes for one musical type (e.g. Fuga).
#[derive(Debug, Clone, PartialEq)]
pub struct SubtypeSpec {
    /// Display name of the musical type.
    pub name: String,
    /// Indicator column flagging rows that belong to this musical type.
    pub category_column: String,
    pub entries: Vec<SubtypeEntry>,
}

impl SubtypeSpec {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }
}

/// Chart-ready subtype counts for one family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtypeSummary {
    pub family: String,
    /// Rows of the input table flagged as belonging to the family.
    pub category_rows: usize,
    /// Category rows that satisfy at least one subtype. Never exceeds
    /// `category_rows`.
    pub matched_rows: usize,
    /// One count per spec entry, in spec order, zeros included. A row
    /// contributes to every subtype it satisfies.
    pub counts: Vec<(String, usize)>,
    /// Missing-column conditions met while counting.
    pub diagnostics: Vec<ViewerError>,
}

impl SubtypeSummary {
    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts.iter().find(|(l, _)| l == label).map(|(_, n)| *n)
    }
}

/// Restrict `table` to rows whose `category_column` indicator is set, then
/// count, per entry of `spec`, the rows in which that subtype applies.
///
/// Absent source columns count as zero and are reported in the summary's
/// diagnostics; the remaining subtypes are still counted. An absent
/// category column yields all-zero counts plus a diagnostic.
pub fn subtype_counts(table: &Table, category_column: &str, spec: &SubtypeSpec) -> SubtypeSummary {
    let mut diagnostics = Vec::new();

    let category: Vec<&Row> = if table.has_column(category_column) {
        table
            .rows
            .iter()
            .map(|r| r.as_ref())
            .filter(|r| r.get(category_column).is_active())
            .collect()
    } else {
        log::warn!(
            "{}: category column '{category_column}' missing, all subtype counts are 0",
            spec.name
        );
        diagnostics.push(ViewerError::MissingColumn {
            label: spec.name.clone(),
            column: category_column.to_string(),
        });
        Vec::new()
    };

    let present: Vec<bool> = spec
        .entries
        .iter()
        .map(|e| {
            let present = table.has_column(e.source.column());
            if !present {
                log::warn!(
                    "{}: subtype '{}' column '{}' missing, counted as 0",
                    spec.name,
                    e.label,
                    e.source.column()
                );
                diagnostics.push(ViewerError::MissingColumn {
                    label: e.label.clone(),
                    column: e.source.column().to_string(),
                });
            }
            present
        })
        .collect();

    let mut counts: Vec<(String, usize)> =
        spec.entries.iter().map(|e| (e.label.clone(), 0)).collect();
    let mut matched_rows = 0;
    for row in &category {
        let mut any = false;
        for (i, entry) in spec.entries.iter().enumerate() {
            if present[i] && entry.source.matches(row) {
                counts[i].1 += 1;
                any = true;
            }
        }
        if any {
            matched_rows += 1;
        }
    }

    log::debug!(
        "{}: {} category row(s), {} with a subtype",
        spec.name,
        category.len(),
        matched_rows
    );

    SubtypeSummary {
        family: spec.name.clone(),
        category_rows: category.len(),
        matched_rows,
        counts,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{ints, strs, table};

    fn fuga_spec() -> SubtypeSpec {
        SubtypeSpec {
            name: "Fuga".to_string(),
            category_column: "mt_fg".to_string(),
            entries: vec![
                SubtypeEntry::indicator("strict", "mt_fg_strict"),
                SubtypeEntry::indicator("flexed", "mt_fg_flexed"),
                SubtypeEntry::indicator("inverted", "mt_fg_inverted"),
            ],
        }
    }

    #[test]
    fn test_counts_by_field_descending_then_first_seen() {
        let t = table(&[("musical_type", strs(&["Fuga", "Fuga", "PEN", "Fuga", "PEN"]))]);
        let counts = counts_by_field(&t, "musical_type").unwrap();
        assert_eq!(
            counts.entries,
            vec![(Value::from("Fuga"), 3), (Value::from("PEN"), 2)]
        );
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.get(&Value::from("Cadence")), 0);
    }

    #[test]
    fn test_counts_by_field_ties_keep_first_seen() {
        let t = table(&[(
            "observer",
            vec![
                Value::from("Bob"),
                Value::Null,
                Value::from("Alice"),
                Value::from("Alice"),
                Value::from("Bob"),
            ],
        )]);
        let counts = counts_by_field(&t, "observer").unwrap();
        assert_eq!(
            counts.entries,
            vec![
                (Value::from("Bob"), 2),
                (Value::from("Alice"), 2),
                (Value::Null, 1)
            ]
        );
    }

    #[test]
    fn test_counts_by_field_merges_nan_cells() {
        let t = table(&[("score", vec![Value::Float(f64::NAN); 3])]);
        let counts = counts_by_field(&t, "score").unwrap();
        assert_eq!(counts.entries, vec![(Value::Float(f64::NAN), 3)]);
    }

    #[test]
    fn test_counts_by_field_unknown_field() {
        let t = table(&[("observer", strs(&["Bob"]))]);
        assert!(matches!(
            counts_by_field(&t, "musical_type"),
            Err(ViewerError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_subtype_counts_example() {
        let t = table(&[
            ("mt_fg", ints(&[1, 1, 1])),
            ("mt_fg_strict", ints(&[1, 0, 1])),
            ("mt_fg_flexed", ints(&[0, 1, 0])),
            ("mt_fg_inverted", ints(&[0, 0, 0])),
        ]);
        let summary = subtype_counts(&t, "mt_fg", &fuga_spec());
        assert_eq!(
            summary.counts,
            vec![
                ("strict".to_string(), 2),
                ("flexed".to_string(), 1),
                ("inverted".to_string(), 0)
            ]
        );
        assert_eq!(summary.category_rows, 3);
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_subtype_counts_restricts_to_category() {
        let t = table(&[
            ("mt_fg", ints(&[1, 0, 1, 0])),
            ("mt_fg_strict", ints(&[1, 1, 1, 1])),
            ("mt_fg_flexed", ints(&[0, 1, 0, 1])),
            ("mt_fg_inverted", ints(&[0, 0, 0, 0])),
        ]);
        let summary = subtype_counts(&t, "mt_fg", &fuga_spec());
        assert_eq!(summary.category_rows, 2);
        assert_eq!(summary.get("strict"), Some(2));
        assert_eq!(summary.get("flexed"), Some(0));
    }

    #[test]
    fn test_missing_column_degrades_to_zero() {
        let t = table(&[
            ("mt_fg", ints(&[1, 1, 0])),
            ("mt_fg_strict", ints(&[1, 1, 1])),
            ("mt_fg_flexed", ints(&[0, 1, 0])),
        ]);
        let summary = subtype_counts(&t, "mt_fg", &fuga_spec());
        assert_eq!(summary.get("strict"), Some(2));
        assert_eq!(summary.get("flexed"), Some(1));
        assert_eq!(summary.get("inverted"), Some(0));
        assert_eq!(
            summary.diagnostics,
            vec![ViewerError::MissingColumn {
                label: "inverted".to_string(),
                column: "mt_fg_inverted".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_category_column() {
        let t = table(&[("mt_fg_strict", ints(&[1, 1]))]);
        let summary = subtype_counts(&t, "mt_fg", &fuga_spec());
        assert_eq!(summary.category_rows, 0);
        assert!(summary.counts.iter().all(|(_, n)| *n == 0));
        assert_eq!(summary.counts.len(), 3);
        assert!(summary
            .diagnostics
            .iter()
            .any(|d| matches!(d, ViewerError::MissingColumn { column, .. } if column == "mt_fg")));
    }

    #[test]
    fn test_matched_rows_bounded_by_category_rows() {
        // Overlapping indicators: row 0 is both strict and flexed.
        let t = table(&[
            ("mt_fg", ints(&[1, 1, 1, 0])),
            ("mt_fg_strict", ints(&[1, 0, 0, 1])),
            ("mt_fg_flexed", ints(&[1, 1, 0, 1])),
            ("mt_fg_inverted", ints(&[0, 0, 0, 1])),
        ]);
        let summary = subtype_counts(&t, "mt_fg", &fuga_spec());
        assert_eq!(summary.matched_rows, 2);
        assert!(summary.matched_rows <= summary.category_rows);
        for (_, n) in &summary.counts {
            assert!(*n <= summary.category_rows);
        }
    }

    #[test]
    fn test_categorical_subtype_ignores_case() {
        let spec = SubtypeSpec {
            name: "Cadence".to_string(),
            category_column: "mt_cad".to_string(),
            entries: vec![
                SubtypeEntry::one_of("authentic", "mt_cad_type", &["authentic"]),
                SubtypeEntry::one_of("phrygian", "mt_cad_type", &["phrygian"]),
                SubtypeEntry::one_of("plagal", "mt_cad_type", &["plagal"]),
            ],
        };
        let t = table(&[
            ("mt_cad", ints(&[1, 1, 1, 1])),
            (
                "mt_cad_type",
                vec![
                    Value::from("authentic"),
                    Value::from("Authentic"),
                    Value::from("Phrygian"),
                    Value::Null,
                ],
            ),
        ]);
        let summary = subtype_counts(&t, "mt_cad", &spec);
        assert_eq!(summary.get("authentic"), Some(2));
        assert_eq!(summary.get("phrygian"), Some(1));
        assert_eq!(summary.get("plagal"), Some(0));
        assert_eq!(summary.matched_rows, 3);
    }
}
