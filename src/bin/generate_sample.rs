//! Write a synthetic CRIM observations snapshot for offline use:
//! `sample_observations.json` (nested, shaped like the API response) and
//! `sample_observations.parquet` (already flattened).

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value, json};

const N_OBSERVATIONS: i64 = 400;

const OBSERVERS: &[&str] = &["Alice", "Bob", "Carol", "Dmitri"];
const PIECES: &[&str] = &[
    "CRIM_Model_0001",
    "CRIM_Model_0008",
    "CRIM_Mass_0001_1",
    "CRIM_Mass_0001_2",
    "CRIM_Mass_0003_4",
];

/// `(musical_type, code, subtype suffixes)`
const TYPES: &[(&str, &str, &[&str])] = &[
    ("Fuga", "fg", &["periodic", "strict", "flexed", "sequential", "inverted", "retrograde"]),
    ("Periodic Entry", "pe", &["strict", "flexed", "flt", "sequential", "added", "invertible"]),
    ("Imitative Duo", "id", &["strict", "flexed", "flt", "invertible"]),
    ("Non-Imitative Duo", "nid", &["strict", "flexed", "flt", "sequential", "invertible"]),
    ("Homorhythm", "hr", &["simple", "staggered", "sequential", "fauxbourdon"]),
    ("Cadence", "cad", &["cantizans", "tenorizans", "irregular"]),
];

/// The API is inconsistent about capitalisation here.
const CADENCE_TYPES: &[&str] = &["authentic", "Authentic", "phrygian", "Phrygian", "plagal"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }

    fn flip(&mut self, percent: usize) -> bool {
        self.below(100) < percent
    }
}

/// Every indicator column, in output order.
fn indicator_columns() -> Vec<String> {
    let mut cols = Vec::new();
    for (_, code, subtypes) in TYPES {
        cols.push(format!("mt_{code}"));
        for s in *subtypes {
            cols.push(format!("mt_{code}_{s}"));
        }
    }
    cols
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let indicators = indicator_columns();

    let mut records = Vec::new();
    let mut ids = Vec::new();
    let mut observers = Vec::new();
    let mut types = Vec::new();
    let mut pieces = Vec::new();
    let mut cadence_types: Vec<Option<String>> = Vec::new();
    let mut flags: BTreeMap<String, Vec<i64>> =
        indicators.iter().map(|c| (c.clone(), Vec::new())).collect();

    for id in 1..=N_OBSERVATIONS {
        let observer = *rng.pick(OBSERVERS);
        let piece = *rng.pick(PIECES);
        let (musical_type, code, subtypes) = *rng.pick(TYPES);

        let mut row_flags: BTreeMap<String, i64> =
            indicators.iter().map(|c| (c.clone(), 0)).collect();
        row_flags.insert(format!("mt_{code}"), 1);
        for s in subtypes {
            if rng.flip(35) {
                row_flags.insert(format!("mt_{code}_{s}"), 1);
            }
        }
        let cadence_type = (code == "cad").then(|| rng.pick(CADENCE_TYPES).to_string());

        let mut rec = Map::new();
        rec.insert("id".to_string(), json!(id));
        rec.insert("observer".to_string(), json!({ "name": observer }));
        rec.insert("musical_type".to_string(), json!(musical_type));
        rec.insert("piece".to_string(), json!({ "piece_id": piece }));
        for (col, v) in &row_flags {
            rec.insert(col.clone(), json!(v));
        }
        if let Some(ct) = &cadence_type {
            rec.insert("mt_cad_type".to_string(), json!(ct));
        }
        records.push(Value::Object(rec));

        ids.push(id);
        observers.push(observer);
        types.push(musical_type);
        pieces.push(piece);
        cadence_types.push(cadence_type);
        for (col, v) in row_flags {
            if let Some(column) = flags.get_mut(&col) {
                column.push(v);
            }
        }
    }

    // JSON, nested like the API.
    let json_path = "sample_observations.json";
    let text = serde_json::to_string_pretty(&Value::Array(records)).context("serialising JSON")?;
    std::fs::write(json_path, text).with_context(|| format!("writing {json_path}"))?;

    // Parquet, flattened.
    let mut fields = vec![
        Field::new("id", DataType::Int64, false),
        Field::new("observer.name", DataType::Utf8, false),
        Field::new("musical_type", DataType::Utf8, false),
        Field::new("piece.piece_id", DataType::Utf8, false),
        Field::new("mt_cad_type", DataType::Utf8, true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(StringArray::from(observers)),
        Arc::new(StringArray::from(types)),
        Arc::new(StringArray::from(pieces)),
        Arc::new(
            cadence_types
                .iter()
                .map(|c| c.as_deref())
                .collect::<StringArray>(),
        ),
    ];
    for col in &indicators {
        fields.push(Field::new(col.as_str(), DataType::Int64, false));
        let values = flags.remove(col).unwrap_or_default();
        columns.push(Arc::new(Int64Array::from(values)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let parquet_path = "sample_observations.parquet";
    let file = std::fs::File::create(parquet_path)
        .with_context(|| format!("creating {parquet_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!("Wrote {N_OBSERVATIONS} observations to {json_path} and {parquet_path}");
    Ok(())
}
