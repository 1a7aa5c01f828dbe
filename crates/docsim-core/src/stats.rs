//! Field- and collection-level statistics that drive sizing and sharding.
//!
//! Statistics are keyed by flattened field path (`lines`, `lines.qty`,
//! `tags[]`). Absent entries are fine; present-but-invalid values are not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStats {
    /// Average byte length of a string value.
    pub avg_length: Option<f64>,
    /// Average number of elements in an array value.
    pub avg_cardinality: Option<f64>,
    /// Number of distinct values across the collection.
    pub distinct_values: Option<u64>,
    /// Relative frequency of each distinct value, in key order. Declares skew.
    pub value_weights: Option<Vec<f64>>,
}

impl FieldStats {
    pub fn with_avg_length(len: f64) -> Self {
        Self {
            avg_length: Some(len),
            ..Self::default()
        }
    }

    pub fn with_cardinality(card: f64) -> Self {
        Self {
            avg_cardinality: Some(card),
            ..Self::default()
        }
    }

    pub fn with_distinct(distinct: u64) -> Self {
        Self {
            distinct_values: Some(distinct),
            ..Self::default()
        }
    }

    /// Reject negative, NaN or infinite figures.
    pub fn validate(&self, path: &str) -> Result<()> {
        check_non_negative(path, "avg_length", self.avg_length)?;
        check_non_negative(path, "avg_cardinality", self.avg_cardinality)?;
        if let Some(weights) = &self.value_weights {
            for (i, w) in weights.iter().enumerate() {
                if !w.is_finite() || *w < 0.0 {
                    return Err(Error::Statistics(format!(
                        "field '{path}': value_weights[{i}] must be non-negative, got {w}"
                    )));
                }
            }
            if !weights.is_empty() && weights.iter().sum::<f64>() <= 0.0 {
                return Err(Error::Statistics(format!(
                    "field '{path}': value_weights must not all be zero"
                )));
            }
        }
        Ok(())
    }
}

fn check_non_negative(path: &str, what: &str, v: Option<f64>) -> Result<()> {
    match v {
        Some(x) if !x.is_finite() || x < 0.0 => Err(Error::Statistics(format!(
            "field '{path}': {what} must be non-negative, got {x}"
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionStats {
    /// Number of documents. Required for any collection-level sizing.
    pub document_count: Option<u64>,
    /// Per-field statistics keyed by flattened path.
    pub fields: BTreeMap<String, FieldStats>,
}

impl CollectionStats {
    pub fn with_count(document_count: u64) -> Self {
        Self {
            document_count: Some(document_count),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a field's statistics.
    pub fn field(mut self, path: impl Into<String>, stats: FieldStats) -> Self {
        self.fields.insert(path.into(), stats);
        self
    }

    pub fn get(&self, path: &str) -> Option<&FieldStats> {
        self.fields.get(path)
    }

    /// Document count, or `Statistics` naming the collection when absent.
    pub fn require_count(&self, collection: &str) -> Result<u64> {
        self.document_count.ok_or_else(|| {
            Error::Statistics(format!("collection '{collection}': missing document count"))
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (path, stats) in &self.fields {
            stats.validate(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_length_is_rejected() {
        let stats =
            CollectionStats::with_count(10).field("name", FieldStats::with_avg_length(-3.0));
        let err = stats.validate().unwrap_err();
        assert!(matches!(err, Error::Statistics(ref m) if m.contains("name")));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let stats = FieldStats {
            value_weights: Some(vec![0.0, 0.0]),
            ..FieldStats::default()
        };
        assert!(stats.validate("brand").is_err());
    }

    #[test]
    fn missing_count_names_collection() {
        let err = CollectionStats::default().require_count("Client").unwrap_err();
        assert!(err.to_string().contains("Client"));
    }
}
