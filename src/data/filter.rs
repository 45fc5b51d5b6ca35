use std::collections::BTreeSet;

use super::aggregate::SubtypeSpec;
use super::error::ViewerError;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Filter stages: one field, a set of chosen values, a UI-state key
// ---------------------------------------------------------------------------

/// One step of the cascade.
///
/// An empty `chosen` set means "no filtering at this stage", never
/// "filter to nothing".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    /// Opaque key isolating this stage's widget state in the session.
    pub key: String,
    /// Physical column name in the selection table.
    pub field: String,
    pub chosen: BTreeSet<Value>,
}

/// What one stage of [`run_pipeline`] hands to the presentation layer.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub key: String,
    pub field: String,
    /// Distinct values of `field` in the stage's *input* selection table, in
    /// first-seen order. These are the choices offered by the stage widget.
    pub options: Vec<Value>,
    pub full: Table,
    pub selection: Table,
}

/// Result of a subtype-indicator stage.
#[derive(Debug, Clone)]
pub struct IndicatorOutput {
    pub full: Table,
    pub selection: Table,
    /// One entry per chosen subtype whose source column is absent.
    pub diagnostics: Vec<ViewerError>,
}

// ---------------------------------------------------------------------------
// Stage primitives
// ---------------------------------------------------------------------------

/// Both views must describe the same rows in the same order.
fn check_aligned(selection: &Table, full: &Table) -> Result<(), ViewerError> {
    let aligned = selection.len() == full.len()
        && selection
            .rows
            .iter()
            .zip(&full.rows)
            .all(|(s, f)| s.id == f.id);
    if aligned {
        Ok(())
    } else {
        Err(ViewerError::Alignment {
            selection_rows: selection.len(),
            full_rows: full.len(),
        })
    }
}

/// Narrow a `(selection, full)` pair to rows whose `field` value is in
/// `chosen`. Returns `(full, selection)`.
///
/// Rows lacking the field only survive when `Null` is chosen. An empty
/// `chosen` set returns both inputs unchanged.
pub fn filter_step(
    selection: &Table,
    full: &Table,
    field: &str,
    chosen: &BTreeSet<Value>,
) -> Result<(Table, Table), ViewerError> {
    check_aligned(selection, full)?;
    selection.require_column(field)?;

    if chosen.is_empty() {
        return Ok((full.clone(), selection.clone()));
    }

    let mask: Vec<bool> = selection
        .rows
        .iter()
        .map(|row| chosen.contains(row.get(field)))
        .collect();

    let full = full.mask(&mask);
    let selection = selection.mask(&mask);
    log::debug!(
        "filter '{field}' on {} value(s): {} row(s) kept",
        chosen.len(),
        selection.len()
    );
    Ok((full, selection))
}

/// Keep rows of the pair in which *any* of the chosen subtype labels of
/// `spec` is active. The indicator columns are read from the full table,
/// since the selection projection does not carry them.
///
/// An empty `labels` set is the identity. Labels unknown to `spec` are
/// ignored; labels whose source column is absent match no row and are
/// reported in `diagnostics`.
pub fn indicator_step(
    selection: &Table,
    full: &Table,
    spec: &SubtypeSpec,
    labels: &BTreeSet<String>,
) -> Result<IndicatorOutput, ViewerError> {
    check_aligned(selection, full)?;

    if labels.is_empty() {
        return Ok(IndicatorOutput {
            full: full.clone(),
            selection: selection.clone(),
            diagnostics: Vec::new(),
        });
    }

    let mut diagnostics = Vec::new();
    let entries: Vec<_> = spec
        .entries
        .iter()
        .filter(|e| labels.contains(&e.label))
        .filter(|e| {
            let present = full.has_column(e.source.column());
            if !present {
                log::warn!(
                    "subtype '{}' of {} reads missing column '{}'",
                    e.label,
                    spec.name,
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

    let mask: Vec<bool> = full
        .rows
        .iter()
        .map(|row| entries.iter().any(|e| e.source.matches(row)))
        .collect();

    Ok(IndicatorOutput {
        full: full.mask(&mask),
        selection: selection.mask(&mask),
        diagnostics,
    })
}

// ---------------------------------------------------------------------------
// Pipeline: stages applied in caller-chosen order
// ---------------------------------------------------------------------------

/// Run `stages` in order, threading each stage's outputs into the next.
///
/// Returns one [`StageOutput`] per stage; the last one holds the final row
/// set. The final rows do not depend on stage order, the per-stage
/// intermediate tables and options do.
pub fn run_pipeline(
    selection: &Table,
    full: &Table,
    stages: &[FilterStage],
) -> Result<Vec<StageOutput>, ViewerError> {
    let mut outputs: Vec<StageOutput> = Vec::with_capacity(stages.len());
    let mut current_selection = selection.clone();
    let mut current_full = full.clone();

    for stage in stages {
        let options = current_selection.distinct_values(&stage.field)?;
        let (next_full, next_selection) =
            filter_step(&current_selection, &current_full, &stage.field, &stage.chosen)?;
        outputs.push(StageOutput {
            key: stage.key.clone(),
            field: stage.field.clone(),
            options,
            full: next_full.clone(),
            selection: next_selection.clone(),
        });
        current_full = next_full;
        current_selection = next_selection;
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{SubtypeEntry, SubtypeSource};
    use crate::data::model::tests::{ints, strs, table};

    fn set(vals: &[&str]) -> BTreeSet<Value> {
        vals.iter().map(|v| Value::from(*v)).collect()
    }

    /// Five observations; the full table carries columns the selection
    /// projection lacks.
    fn sample() -> (Table, Table) {
        let full = table(&[
            ("id", ints(&[10, 11, 12, 13, 14])),
            ("observer", strs(&["Alice", "Bob", "Alice", "Carol", "Bob"])),
            ("musical_type", strs(&["Fuga", "Fuga", "PEN", "Fuga", "PEN"])),
            ("mt_fg_strict", ints(&[1, 0, 0, 1, 0])),
            ("mt_fg_flexed", ints(&[0, 1, 0, 0, 0])),
        ]);
        let selection = full.project(&["id", "observer", "musical_type"]).unwrap();
        (selection, full)
    }

    fn stage(key: &str, field: &str, chosen: &[&str]) -> FilterStage {
        FilterStage {
            key: key.to_string(),
            field: field.to_string(),
            chosen: set(chosen),
        }
    }

    #[test]
    fn test_filter_keeps_relative_order() {
        let (sel, full) = sample();
        let (f, s) = filter_step(&sel, &full, "musical_type", &set(&["Fuga"])).unwrap();
        assert_eq!(f.row_ids(), vec![0, 1, 3]);
        assert_eq!(s.row_ids(), vec![0, 1, 3]);
        assert_eq!(f.columns, full.columns);
        assert_eq!(s.columns, sel.columns);
    }

    #[test]
    fn test_empty_choice_is_identity() {
        let (sel, full) = sample();
        let (f, s) = filter_step(&sel, &full, "observer", &BTreeSet::new()).unwrap();
        assert_eq!(f, full);
        assert_eq!(s, sel);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (sel, full) = sample();
        let chosen = set(&["Alice", "Carol"]);
        let (f1, s1) = filter_step(&sel, &full, "observer", &chosen).unwrap();
        let (f2, s2) = filter_step(&s1, &f1, "observer", &chosen).unwrap();
        assert_eq!(f1, f2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_filter_never_grows() {
        let (sel, full) = sample();
        let cases: [&[&str]; 4] = [
            &["Alice"],
            &["Bob", "Carol"],
            &["Nobody"],
            &["Alice", "Bob", "Carol"],
        ];
        for chosen in cases {
            let (f, s) = filter_step(&sel, &full, "observer", &set(chosen)).unwrap();
            assert!(f.len() <= full.len());
            assert_eq!(f.len(), s.len());
        }
    }

    #[test]
    fn test_null_rows_only_kept_when_null_chosen() {
        let full = table(&[
            ("id", ints(&[1, 2, 3])),
            ("observer", vec![Value::from("Alice"), Value::Null, Value::from("Bob")]),
        ]);
        let sel = full.clone();
        let (f, _) = filter_step(&sel, &full, "observer", &set(&["Alice", "Bob"])).unwrap();
        assert_eq!(f.row_ids(), vec![0, 2]);

        let mut with_null = set(&["Alice"]);
        with_null.insert(Value::Null);
        let (f, _) = filter_step(&sel, &full, "observer", &with_null).unwrap();
        assert_eq!(f.row_ids(), vec![0, 1]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let (sel, full) = sample();
        // Present in the full table, but not in the selection projection.
        let err = filter_step(&sel, &full, "mt_fg_strict", &set(&["1"])).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidField { .. }));
    }

    #[test]
    fn test_misaligned_tables_are_rejected() {
        let (sel, full) = sample();
        let shorter = full.mask(&[true, true, false, true, true]);
        let err = filter_step(&sel, &shorter, "observer", &BTreeSet::new()).unwrap_err();
        assert_eq!(
            err,
            ViewerError::Alignment {
                selection_rows: 5,
                full_rows: 4
            }
        );
    }

    #[test]
    fn test_same_length_but_different_rows_is_misaligned() {
        let (sel, full) = sample();
        let a = sel.mask(&[true, true, false, false, false]);
        let b = full.mask(&[false, false, false, true, true]);
        assert!(matches!(
            filter_step(&a, &b, "observer", &BTreeSet::new()),
            Err(ViewerError::Alignment { .. })
        ));
    }

    #[test]
    fn test_stage_order_does_not_change_final_rows() {
        let (sel, full) = sample();
        let by_observer_first = [
            stage("a", "observer", &["Alice", "Bob"]),
            stage("b", "musical_type", &["Fuga"]),
        ];
        let by_type_first = [
            stage("z", "musical_type", &["Fuga"]),
            stage("y", "observer", &["Alice", "Bob"]),
        ];
        let a = run_pipeline(&sel, &full, &by_observer_first).unwrap();
        let b = run_pipeline(&sel, &full, &by_type_first).unwrap();
        assert_eq!(a[1].full.row_ids(), vec![0, 1]);
        assert_eq!(a[1].full.row_ids(), b[1].full.row_ids());
        // Intermediate views differ.
        assert_ne!(a[0].full.row_ids(), b[0].full.row_ids());
    }

    #[test]
    fn test_pipeline_options_come_from_stage_input() {
        let (sel, full) = sample();
        let out = run_pipeline(
            &sel,
            &full,
            &[stage("a", "musical_type", &["PEN"]), stage("b", "observer", &[])],
        )
        .unwrap();
        assert_eq!(out[0].options, strs(&["Fuga", "PEN"]));
        assert_eq!(out[1].options, strs(&["Alice", "Bob"]));
        assert_eq!(out[1].key, "b");
    }

    #[test]
    fn test_pipeline_keeps_views_aligned() {
        let (sel, full) = sample();
        let out = run_pipeline(
            &sel,
            &full,
            &[
                stage("a", "observer", &["Bob", "Carol"]),
                stage("b", "musical_type", &[]),
                stage("c", "id", &[]),
            ],
        )
        .unwrap();
        for s in &out {
            assert_eq!(s.full.row_ids(), s.selection.row_ids());
        }
        assert_eq!(out[2].full.row_ids(), vec![1, 3, 4]);
    }

    #[test]
    fn test_indicator_step_reads_full_table() {
        let (sel, full) = sample();
        let spec = SubtypeSpec {
            name: "Fuga".to_string(),
            category_column: "musical_type".to_string(),
            entries: vec![
                SubtypeEntry::indicator("Strict", "mt_fg_strict"),
                SubtypeEntry::indicator("Flexed", "mt_fg_flexed"),
                SubtypeEntry::indicator("Inverted", "mt_fg_inverted"),
            ],
        };
        let labels: BTreeSet<String> =
            ["Strict", "Inverted"].iter().map(|s| s.to_string()).collect();
        let out = indicator_step(&sel, &full, &spec, &labels).unwrap();
        assert_eq!(out.full.row_ids(), vec![0, 3]);
        assert_eq!(out.selection.row_ids(), vec![0, 3]);
        assert_eq!(
            out.diagnostics,
            vec![ViewerError::MissingColumn {
                label: "Inverted".to_string(),
                column: "mt_fg_inverted".to_string()
            }]
        );

        let none = indicator_step(&sel, &full, &spec, &BTreeSet::new()).unwrap();
        assert_eq!(none.full, full);
        assert!(matches!(spec.entries[0].source, SubtypeSource::Indicator(_)));
    }
}
