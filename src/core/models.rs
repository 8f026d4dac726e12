//! Core data models for translation batches and lookup tables

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Contiguous slice of the input submitted as one translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationBatch<'a, T> {
    /// Position of the batch in the run, from zero
    pub index: usize,
    /// Texts in this batch
    pub items: &'a [T],
}

/// Number of batches needed for `len` items with at most `cap` per batch
pub fn batch_count(len: usize, cap: usize) -> usize {
    len.div_ceil(cap.max(1))
}

/// Split `items` into `ceil(len / cap)` near-equal batches, order preserved.
///
/// The first `len % count` batches carry one extra item, so batch sizes
/// differ by at most one and never exceed `cap`.
pub fn split_batches<T>(items: &[T], cap: usize) -> Vec<TranslationBatch<'_, T>> {
    let count = batch_count(items.len(), cap);
    if count == 0 {
        return Vec::new();
    }

    let base = items.len() / count;
    let extra = items.len() % count;

    let mut batches = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let size = base + usize::from(index < extra);
        batches.push(TranslationBatch {
            index,
            items: &items[start..start + size],
        });
        start += size;
    }

    batches
}

/// Result categories collected by the lookup client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Requested tweets (`data`)
    Tweets,
    /// Referenced users (`includes.users`)
    Authors,
    /// Attached media (`includes.media`)
    Media,
    /// Referenced tweets (`includes.tweets`)
    Replies,
    /// Tagged places (`includes.places`)
    Places,
    /// Per-request metadata (`meta`)
    Metadata,
}

impl Category {
    /// Every category, in result order
    pub const ALL: [Category; 6] = [
        Category::Tweets,
        Category::Authors,
        Category::Media,
        Category::Replies,
        Category::Places,
        Category::Metadata,
    ];

    /// Name used as the result key
    pub fn name(&self) -> &'static str {
        match self {
            Category::Tweets => "tweets",
            Category::Authors => "authors",
            Category::Media => "media",
            Category::Replies => "replies",
            Category::Places => "places",
            Category::Metadata => "metadata",
        }
    }

    /// Field used as the row key
    pub fn index_field(&self) -> &'static str {
        match self {
            Category::Media => "media_key",
            _ => "id",
        }
    }

    /// Section of the `includes` object this category is read from
    pub fn includes_key(&self) -> Option<&'static str> {
        match self {
            Category::Authors => Some("users"),
            Category::Media => Some("media"),
            Category::Replies => Some("tweets"),
            Category::Places => Some("places"),
            Category::Tweets | Category::Metadata => None,
        }
    }

    /// Look a category up by its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semi-structured record: field name to JSON value, in response order
pub type Record = Map<String, Value>;

/// One keyed table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Value of the table's index field
    pub key: String,
    /// Remaining fields, flattened
    pub fields: Record,
}

/// Rows sharing an index column; duplicate keys are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Name of the field used as row key
    pub index: String,
    /// Rows in insertion order
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table keyed by `index`
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row
    pub fn push(&mut self, key: impl Into<String>, fields: Record) {
        self.rows.push(Row {
            key: key.into(),
            fields,
        });
    }

    /// Row keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.key.as_str())
    }

    /// All rows stored under `key`
    pub fn get<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.key == key)
    }

    /// Union of field names, in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for row in &self.rows {
            for name in row.fields.keys() {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
        }
        columns
    }
}

/// Lookup output: one table per category, always all six present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    tables: BTreeMap<Category, Table>,
}

impl Default for LookupResult {
    fn default() -> Self {
        let tables = Category::ALL
            .into_iter()
            .map(|c| (c, Table::new(c.index_field())))
            .collect();
        Self { tables }
    }
}

impl LookupResult {
    /// Create a result with every table empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a category
    pub fn table(&self, category: Category) -> &Table {
        // Every category is inserted by `default`
        &self.tables[&category]
    }

    /// Mutable table for a category
    pub fn table_mut(&mut self, category: Category) -> &mut Table {
        self.tables
            .entry(category)
            .or_insert_with(|| Table::new(category.index_field()))
    }

    /// Table by category name
    pub fn get(&self, name: &str) -> Option<&Table> {
        Category::from_name(name).map(|c| self.table(c))
    }

    /// Iterate tables in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Table)> {
        self.tables.iter().map(|(c, t)| (*c, t))
    }

    /// Total rows across all tables
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }
}

/// Flatten nested objects into dot-separated field names.
///
/// Arrays and scalars are kept as values; empty objects vanish.
pub fn flatten_record(object: &Map<String, Value>) -> Record {
    let mut out = Record::new();
    flatten_into(&mut out, None, object);
    out
}

fn flatten_into(out: &mut Record, prefix: Option<&str>, object: &Map<String, Value>) {
    for (name, value) in object {
        let field = match prefix {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(&field), inner),
            other => {
                out.insert(field, other.clone());
            }
        }
    }
}

/// Render a key value as a string; strings are used verbatim
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_batch_partition_law() {
        for cap in 1..=12 {
            for len in 0..=60 {
                let items: Vec<usize> = (0..len).collect();
                let batches = split_batches(&items, cap);

                assert_eq!(batches.len(), len.div_ceil(cap), "len={} cap={}", len, cap);

                let rejoined: Vec<usize> = batches.iter().flat_map(|b| b.items.iter().copied()).collect();
                assert_eq!(rejoined, items);

                for (i, batch) in batches.iter().enumerate() {
                    assert_eq!(batch.index, i);
                    assert!(!batch.items.is_empty());
                    assert!(batch.items.len() <= cap);
                }

                if let (Some(max), Some(min)) = (
                    batches.iter().map(|b| b.items.len()).max(),
                    batches.iter().map(|b| b.items.len()).min(),
                ) {
                    assert!(max - min <= 1);
                }
            }
        }
    }

    #[test]
    fn test_split_batches_near_equal_sizes() {
        let items: Vec<u32> = (0..101).collect();
        let sizes: Vec<usize> = split_batches(&items, 50).iter().map(|b| b.items.len()).collect();
        assert_eq!(sizes, vec![34, 34, 33]);
    }

    #[test]
    fn test_split_batches_empty() {
        let items: Vec<String> = Vec::new();
        assert!(split_batches(&items, 50).is_empty());
        assert_eq!(batch_count(0, 50), 0);
    }

    #[test]
    fn test_category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.name()), Some(category));
        }
        assert_eq!(Category::from_name("users"), None);
        assert_eq!(Category::Media.index_field(), "media_key");
        assert_eq!(Category::Replies.includes_key(), Some("tweets"));
    }

    #[test]
    fn test_flatten_record() {
        let object = json!({
            "id": "1",
            "text": "hi",
            "public_metrics": {"like_count": 3, "nested": {"deep": true}},
            "edit_history_tweet_ids": ["1"],
            "withheld": {}
        });

        let flat = flatten_record(object.as_object().unwrap());

        assert_json_eq!(
            Value::Object(flat),
            json!({
                "id": "1",
                "text": "hi",
                "public_metrics.like_count": 3,
                "public_metrics.nested.deep": true,
                "edit_history_tweet_ids": ["1"]
            })
        );
    }

    #[test]
    fn test_table_keeps_duplicates() {
        let mut table = Table::new("id");
        table.push("7", Record::new());
        table.push("7", Record::new());

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("7").count(), 2);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["7", "7"]);
    }

    #[test]
    fn test_table_columns_first_seen_order() {
        let mut table = Table::new("id");
        table.push("1", flatten_record(json!({"b": 1, "a": 2}).as_object().unwrap()));
        table.push("2", flatten_record(json!({"c": 3, "a": 4}).as_object().unwrap()));

        assert_eq!(table.columns(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_flatten_record_keeps_source_field_order() {
        let object: Map<String, Value> =
            serde_json::from_str(r#"{"text":"t","public_metrics":{"retweet_count":1,"like_count":2},"author_id":"9"}"#)
                .unwrap();

        let flat = flatten_record(&object);

        assert_eq!(
            flat.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["text", "public_metrics.retweet_count", "public_metrics.like_count", "author_id"]
        );
    }

    #[test]
    fn test_lookup_result_has_all_tables() {
        let result = LookupResult::new();
        assert_eq!(result.iter().count(), 6);
        assert_eq!(result.total_rows(), 0);
        assert_eq!(result.get("media").map(|t| t.index.as_str()), Some("media_key"));
        assert!(result.get("unknown").is_none());
    }

    #[test]
    fn test_key_string() {
        assert_eq!(key_string(&json!("42")), Some("42".to_string()));
        assert_eq!(key_string(&json!(42)), Some("42".to_string()));
        assert_eq!(key_string(&json!(null)), None);
    }
}
