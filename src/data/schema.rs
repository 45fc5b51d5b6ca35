use std::fmt;

use super::error::ViewerError;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Logical field → physical column mapping
// ---------------------------------------------------------------------------

/// Which CRIM endpoint a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Observations,
    Relationships,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Observations => write!(f, "observations"),
            DatasetKind::Relationships => write!(f, "relationships"),
        }
    }
}

/// One logical field and the flattened column that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Dot-separated path produced by the JSON flattener.
    pub path: &'static str,
    /// Loading fails when a required column is absent.
    pub required: bool,
    /// Part of the narrow selection projection used to derive filter options.
    pub selection: bool,
    /// Categorical values are rewritten to canonical case at load time.
    pub fold_case: bool,
    /// Column accepted in place of `path` when the API returns the field
    /// flat (`"observer": "Alice"` rather than `{"observer": {"name": ..}}`).
    pub alias: Option<&'static str>,
}

const fn field(name: &'static str, path: &'static str) -> FieldDef {
    FieldDef {
        name,
        path,
        required: true,
        selection: true,
        fold_case: false,
        alias: None,
    }
}

const fn optional(name: &'static str, path: &'static str) -> FieldDef {
    FieldDef {
        name,
        path,
        required: false,
        selection: false,
        fold_case: false,
        alias: None,
    }
}

const fn categorical(name: &'static str, path: &'static str) -> FieldDef {
    FieldDef {
        name,
        path,
        required: false,
        selection: false,
        fold_case: true,
        alias: None,
    }
}

impl FieldDef {
    const fn or_flat(self, alias: &'static str) -> FieldDef {
        FieldDef {
            alias: Some(alias),
            ..self
        }
    }
}

const OBSERVATION_FIELDS: &[FieldDef] = &[
    field("id", "id"),
    field("observer", "observer.name").or_flat("observer"),
    field("musical_type", "musical_type"),
    field("piece", "piece.piece_id"),
    optional("piece_title", "piece.full_title"),
    optional("ema", "ema"),
    categorical("cadence_type", "mt_cad_type"),
    categorical("cadence_tone", "mt_cad_tone"),
];

const RELATIONSHIP_FIELDS: &[FieldDef] = &[
    field("id", "id"),
    field("observer", "observer.name").or_flat("observer"),
    field("relationship_type", "relationship_type"),
    field("model_musical_type", "model_observation.musical_type"),
    field("derivative_musical_type", "derivative_observation.musical_type"),
    optional("model_piece", "model_observation.piece.piece_id"),
    optional("derivative_piece", "derivative_observation.piece.piece_id"),
    categorical("model_cadence_type", "model_observation.mt_cad_type"),
    categorical("derivative_cadence_type", "derivative_observation.mt_cad_type"),
];

/// Typed schema for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: DatasetKind,
    fields: &'static [FieldDef],
}

impl Schema {
    pub fn for_kind(kind: DatasetKind) -> Self {
        let fields = match kind {
            DatasetKind::Observations => OBSERVATION_FIELDS,
            DatasetKind::Relationships => RELATIONSHIP_FIELDS,
        };
        Schema { kind, fields }
    }

    /// Physical column for a logical field name.
    pub fn column(&self, name: &str) -> Result<&'static str, ViewerError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.path)
            .ok_or_else(|| ViewerError::InvalidField {
                field: name.to_string(),
                available: self.fields.iter().map(|f| f.name.to_string()).collect(),
            })
    }

    /// Logical name for a physical column, if the schema maps it.
    pub fn label_for(&self, column: &str) -> Option<&'static str> {
        self.fields.iter().find(|f| f.path == column).map(|f| f.name)
    }

    /// Physical columns of the selection projection, in schema order.
    pub fn selection_columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.selection)
            .map(|f| f.path)
            .collect()
    }

    /// Fail fast when a required column is absent from `table`.
    pub fn validate(&self, table: &Table) -> Result<(), ViewerError> {
        for f in self.fields.iter().filter(|f| f.required) {
            table.require_column(f.path)?;
        }
        for f in self.fields.iter().filter(|f| !f.required) {
            if !table.has_column(f.path) {
                log::debug!("{}: optional column '{}' not present", self.kind, f.path);
            }
        }
        Ok(())
    }

    /// Move flat alias columns to their canonical path.
    pub fn resolve_aliases(&self, table: &mut Table) {
        for f in self.fields {
            let Some(alias) = f.alias else { continue };
            if !table.has_column(f.path) && table.has_column(alias) {
                log::info!("{}: reading '{}' from flat column '{alias}'", self.kind, f.path);
                table.rename_column(alias, f.path);
            }
        }
    }

    /// Rewrite every case-folded categorical column to canonical case.
    pub fn canonicalize(&self, table: &mut Table) {
        for f in self.fields.iter().filter(|f| f.fold_case) {
            table.map_column(f.path, |v| match v {
                Value::String(s) => Value::String(canonical_case(s)),
                other => other.clone(),
            });
        }
    }

    /// Validate, canonicalise and split a freshly loaded table into its
    /// `(selection, full)` views.
    pub fn bind(&self, mut table: Table) -> Result<(Table, Table), ViewerError> {
        self.resolve_aliases(&mut table);
        self.validate(&table)?;
        self.canonicalize(&mut table);
        let selection = table.project(&self.selection_columns())?;
        Ok((selection, table))
    }
}

/// `"authentic"`, `"AUTHENTIC"` and `" Authentic"` all become `"Authentic"`.
pub fn canonical_case(s: &str) -> String {
    let s = s.trim();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{ints, strs, table};

    fn observations() -> Table {
        table(&[
            ("id", ints(&[1, 2, 3])),
            ("observer.name", strs(&["Alice", "Bob", "Alice"])),
            ("musical_type", strs(&["Cadence", "Cadence", "Fuga"])),
            ("piece.piece_id", strs(&["CRIM_Model_0001", "CRIM_Model_0001", "CRIM_Mass_0001_1"])),
            ("mt_cad_type", strs(&["authentic", "AUTHENTIC", "Phrygian"])),
        ])
    }

    #[test]
    fn test_column_lookup() {
        let schema = Schema::for_kind(DatasetKind::Observations);
        assert_eq!(schema.column("observer").unwrap(), "observer.name");
        assert_eq!(schema.label_for("piece.piece_id"), Some("piece"));
        let err = schema.column("details.voices").unwrap_err();
        assert!(matches!(err, ViewerError::InvalidField { ref field, .. } if field == "details.voices"));
    }

    #[test]
    fn test_bind_splits_views_and_folds_case() {
        let schema = Schema::for_kind(DatasetKind::Observations);
        let (selection, full) = schema.bind(observations()).unwrap();
        assert_eq!(
            selection.columns,
            vec!["id", "observer.name", "musical_type", "piece.piece_id"]
        );
        assert_eq!(selection.row_ids(), full.row_ids());
        assert_eq!(full.rows[0].get("mt_cad_type"), &Value::from("Authentic"));
        assert_eq!(full.rows[1].get("mt_cad_type"), &Value::from("Authentic"));
    }

    #[test]
    fn test_missing_required_column_fails_fast() {
        let schema = Schema::for_kind(DatasetKind::Relationships);
        let err = schema.bind(observations()).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidField { ref field, .. } if field == "relationship_type"));
    }

    #[test]
    fn test_flat_observer_column_is_accepted() {
        let schema = Schema::for_kind(DatasetKind::Observations);
        let flat = table(&[
            ("id", ints(&[1, 2])),
            ("observer", strs(&["Alice", "Bob"])),
            ("musical_type", strs(&["Fuga", "Cadence"])),
            ("piece.piece_id", strs(&["CRIM_Model_0001", "CRIM_Model_0002"])),
        ]);
        let (selection, full) = schema.bind(flat).unwrap();
        assert_eq!(
            selection.columns,
            vec!["id", "observer.name", "musical_type", "piece.piece_id"]
        );
        assert_eq!(full.rows[1].get("observer.name"), &Value::from("Bob"));
    }

    #[test]
    fn test_canonical_case() {
        assert_eq!(canonical_case("authentic"), "Authentic");
        assert_eq!(canonical_case(" PHRYGIAN "), "Phrygian");
        assert_eq!(canonical_case(""), "");
    }
}
