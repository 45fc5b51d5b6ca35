use super::aggregate::{SubtypeEntry, SubtypeSpec};

// ---------------------------------------------------------------------------
// Built-in subtype families for the CRIM musical types
// ---------------------------------------------------------------------------

/// `(label, column suffix)` pairs for indicator-only families.
const FUGA: &[(&str, &str)] = &[
    ("Periodic", "periodic"),
    ("Strict", "strict"),
    ("Flexed", "flexed"),
    ("Sequential", "sequential"),
    ("Inverted", "inverted"),
    ("Retrograde", "retrograde"),
];

const PERIODIC_ENTRY: &[(&str, &str)] = &[
    ("Strict", "strict"),
    ("Flexed", "flexed"),
    ("Flexed Tonal", "flt"),
    ("Sequential", "sequential"),
    ("Added", "added"),
    ("Invertible", "invertible"),
];

const IMITATIVE_DUO: &[(&str, &str)] = &[
    ("Strict", "strict"),
    ("Flexed", "flexed"),
    ("Flexed Tonal", "flt"),
    ("Invertible", "invertible"),
];

const NON_IMITATIVE_DUO: &[(&str, &str)] = &[
    ("Strict", "strict"),
    ("Flexed", "flexed"),
    ("Flexed Tonal", "flt"),
    ("Sequential", "sequential"),
    ("Invertible", "invertible"),
];

const HOMORHYTHM: &[(&str, &str)] = &[
    ("Simple", "simple"),
    ("Staggered", "staggered"),
    ("Sequential", "sequential"),
    ("Fauxbourdon", "fauxbourdon"),
];

fn indicator_family(name: &str, code: &str, subtypes: &[(&str, &str)]) -> SubtypeSpec {
    SubtypeSpec {
        name: name.to_string(),
        category_column: format!("mt_{code}"),
        entries: subtypes
            .iter()
            .map(|(label, suffix)| SubtypeEntry::indicator(label, &format!("mt_{code}_{suffix}")))
            .collect(),
    }
}

fn cadence() -> SubtypeSpec {
    SubtypeSpec {
        name: "Cadence".to_string(),
        category_column: "mt_cad".to_string(),
        entries: vec![
            SubtypeEntry::one_of("Authentic", "mt_cad_type", &["authentic"]),
            SubtypeEntry::one_of("Phrygian", "mt_cad_type", &["phrygian"]),
            SubtypeEntry::one_of("Plagal", "mt_cad_type", &["plagal"]),
            SubtypeEntry::indicator("Cantizans", "mt_cad_cantizans"),
            SubtypeEntry::indicator("Tenorizans", "mt_cad_tenorizans"),
            SubtypeEntry::indicator("Irregular", "mt_cad_irregular"),
        ],
    }
}

/// Every family the viewer knows how to chart, in menu order.
pub fn builtin_specs() -> Vec<SubtypeSpec> {
    vec![
        indicator_family("Fuga", "fg", FUGA),
        indicator_family("Periodic Entry", "pe", PERIODIC_ENTRY),
        indicator_family("Imitative Duo", "id", IMITATIVE_DUO),
        indicator_family("Non-Imitative Duo", "nid", NON_IMITATIVE_DUO),
        indicator_family("Homorhythm", "hr", HOMORHYTHM),
        cadence(),
    ]
}

/// Look up a family by name, ignoring ASCII case.
pub fn find_spec(name: &str) -> Option<SubtypeSpec> {
    builtin_specs()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::SubtypeSource;

    #[test]
    fn test_indicator_columns_follow_naming_convention() {
        let fuga = find_spec("fuga").unwrap();
        assert_eq!(fuga.category_column, "mt_fg");
        assert!(fuga
            .entries
            .iter()
            .any(|e| e.source == SubtypeSource::Indicator("mt_fg_strict".to_string())));
        assert_eq!(fuga.labels().count(), FUGA.len());
    }

    #[test]
    fn test_cadence_mixes_categorical_and_indicator_sources() {
        let cad = find_spec("Cadence").unwrap();
        assert!(matches!(cad.entries[0].source, SubtypeSource::OneOf { .. }));
        assert!(matches!(cad.entries[3].source, SubtypeSource::Indicator(_)));
    }

    #[test]
    fn test_unknown_family() {
        assert!(find_spec("Madrigal").is_none());
    }
}
