//! Per-type byte approximations.

use docsim_core::schema::{FlatField, TypeTag};
use serde::{Deserialize, Serialize};

/// Byte costs of one key in a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeModel {
    /// Bytes spent on the key name and type marker of every entry.
    pub key_overhead: f64,
    pub integer: f64,
    pub float: f64,
    pub boolean: f64,
    pub date: f64,
    /// Object-id style reference.
    pub reference: f64,
    /// Average lengths used when a string field carries no `avg_length`.
    pub string_avg: f64,
    pub short_string_avg: f64,
    pub long_string_avg: f64,
}

impl Default for SizeModel {
    fn default() -> Self {
        Self {
            key_overhead: 12.0,
            integer: 8.0,
            float: 8.0,
            boolean: 1.0,
            date: 20.0,
            reference: 12.0,
            string_avg: 80.0,
            short_string_avg: 20.0,
            long_string_avg: 200.0,
        }
    }
}

impl SizeModel {
    /// Payload bytes of one occurrence of `field`, excluding the key.
    pub fn payload(&self, field: &FlatField) -> f64 {
        let avg_length = field.stats.as_ref().and_then(|s| s.avg_length);
        match field.tag {
            TypeTag::String => avg_length.unwrap_or(self.string_avg),
            TypeTag::ShortString => avg_length.unwrap_or(self.short_string_avg),
            TypeTag::LongString => avg_length.unwrap_or(self.long_string_avg),
            TypeTag::Integer => self.integer,
            TypeTag::Float => self.float,
            TypeTag::Boolean => self.boolean,
            TypeTag::Date => self.date,
            TypeTag::Reference => self.reference,
            // Containers only pay for their key; contents are separate entries.
            TypeTag::Array | TypeTag::Nested => 0.0,
        }
    }

    /// Bytes contributed to one document by every occurrence of `field`.
    pub fn entry_bytes(&self, field: &FlatField) -> f64 {
        field.multiplicity * (self.key_overhead + self.payload(field))
    }
}
