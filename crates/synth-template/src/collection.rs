//! Collections: JSON documents and CSV row sets that tokens draw values from.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

pub const JSON_COLLECTION_SUFFIX: &str = ".collections.json";
pub const CSV_COLLECTION_SUFFIX: &str = ".collections.csv";

/// Every JSON collection path is resolved below this root property.
pub const COLLECTIONS_ROOT: &str = "collections";

/// Collections keyed by file name, e.g. `people.collections.csv`.
pub type Collections = HashMap<String, Collection>;

/// One CSV row as ordered `(header, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvRecord {
    fields: Vec<(String, String)>,
}

impl CsvRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Collection {
    Json(Value),
    Csv(Vec<Arc<CsvRecord>>),
}

impl Collection {
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        Ok(Collection::Json(serde_json::from_str(contents)?))
    }

    /// Read a headed CSV document and shuffle its rows once.
    pub fn from_csv_reader<R: Read, G: Rng + ?Sized>(
        reader: R,
        rng: &mut G,
    ) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect();
            rows.push(Arc::new(CsvRecord::new(fields)));
        }

        rows.shuffle(rng);
        Ok(Collection::Csv(rows))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Collection::Json(value) => Some(value),
            Collection::Csv(_) => None,
        }
    }

    pub fn as_csv(&self) -> Option<&[Arc<CsvRecord>]> {
        match self {
            Collection::Csv(rows) => Some(rows),
            Collection::Json(_) => None,
        }
    }
}

/// Resolve a dot-separated path with optional `[n]` indexes, e.g. `people.names[0]`.
pub fn select_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for part in path.split('.').filter(|part| !part.is_empty()) {
        let (name, indexes) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indexes.split('[').filter(|index| !index.is_empty()) {
            let index: usize = index.strip_suffix(']')?.parse().ok()?;
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// Text form of a selected JSON element: strings unquoted, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_select_path() {
        let doc = json!({"collections": {"people": {"names": ["ann", "bob"]}, "ids": [[1, 2], [3]]}});
        assert_eq!(
            select_path(&doc, "collections.people.names"),
            Some(&json!(["ann", "bob"]))
        );
        assert_eq!(
            select_path(&doc, "collections.people.names[1]"),
            Some(&json!("bob"))
        );
        assert_eq!(select_path(&doc, "collections.ids[0][1]"), Some(&json!(2)));
        assert_eq!(select_path(&doc, "collections.missing"), None);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("plain")), "plain");
        assert_eq!(value_to_text(&json!(12)), "12");
        assert_eq!(value_to_text(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_csv_collection_reads_all_rows() {
        let mut rng = StdRng::seed_from_u64(42);
        let csv = "Name,Age\nann,31\nbob,42\ncid,53\n";
        let collection = Collection::from_csv_reader(csv.as_bytes(), &mut rng).unwrap();
        let rows = collection.as_csv().unwrap();
        assert_eq!(rows.len(), 3);

        let mut names: Vec<&str> = rows.iter().filter_map(|row| row.get("Name")).collect();
        names.sort();
        assert_eq!(names, vec!["ann", "bob", "cid"]);
        assert!(rows.iter().all(|row| row.get("Age").is_some()));
        assert!(collection.as_json().is_none());
    }

    #[test]
    fn test_csv_shuffle_is_seeded() {
        let csv = (0..50).fold(String::from("N\n"), |mut acc, i| {
            acc.push_str(&format!("{i}\n"));
            acc
        });
        let order = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let collection = Collection::from_csv_reader(csv.as_bytes(), &mut rng).unwrap();
            collection
                .as_csv()
                .unwrap()
                .iter()
                .map(|row| row.get("N").unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(7), order(7));
    }
}
