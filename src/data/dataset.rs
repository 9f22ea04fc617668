use std::collections::BTreeMap;

/// Attribute values of one row.
pub type Row = BTreeMap<String, serde_json::Value>;

/// Tabular result of a fetch, keyed by a stable row identifier.
///
/// Row identifiers are unique; building from rows that repeat an identifier keeps the last
/// occurrence.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: BTreeMap<String, Row>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `(id, row)` pairs; a repeated id replaces the earlier row.
    pub fn from_rows<I, K>(rows: I) -> Self
    where
        I: IntoIterator<Item = (K, Row)>,
        K: Into<String>,
    {
        let mut out = Self::new();
        for (id, row) in rows {
            out.insert(id, row);
        }
        out
    }

    /// Parse a JSON object of `{ "<id>": { "<attr>": value, ... }, ... }`.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Insert or replace the row `id`.
    pub fn insert(&mut self, id: impl Into<String>, row: Row) {
        self.rows.insert(id.into(), row);
    }

    /// Set one attribute, creating the row when needed.
    pub fn set(&mut self, id: impl Into<String>, attr: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.rows
            .entry(id.into())
            .or_default()
            .insert(attr.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn value(&self, id: &str, attr: &str) -> Option<&serde_json::Value> {
        self.rows.get(id).and_then(|r| r.get(attr))
    }

    /// Numeric attribute, `None` when missing or not a number.
    pub fn number(&self, id: &str, attr: &str) -> Option<f64> {
        self.value(id, attr).and_then(serde_json::Value::as_f64)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Merge subscribed datasets into one view over the coordinate domain.
///
/// `parts` are applied in order and a later part overwrites earlier values cell by cell.
/// Only identifiers present in `domain` appear in the result, and every one of them does,
/// even when no part describes it.
pub fn merge_views<'a>(
    domain: &Dataset,
    parts: impl IntoIterator<Item = &'a Dataset>,
) -> Dataset {
    let mut rows: BTreeMap<String, Row> = domain.ids().map(|id| (id.to_string(), Row::new())).collect();
    for part in parts {
        for (id, row) in part.iter() {
            let Some(merged) = rows.get_mut(id) else {
                continue;
            };
            for (attr, value) in row {
                merged.insert(attr.clone(), value.clone());
            }
        }
    }
    Dataset { rows }
}

#[cfg(test)]
#[path = "../../tests/unit/data/dataset.rs"]
mod tests;
