//! Convenient re-exports for downstream crates.

pub use crate::config::{CostConfig, SimConfig, SimLimits};
pub use crate::error::{Error, Result};
pub use crate::id::{DocTypeId, ServerId};
pub use crate::schema::{
    Collection, CollectionDesc, Database, DatabaseDesc, DocTypeTable, DocumentType,
    DocumentTypeDesc, FieldDesc, FieldType, FlatField, SchemaBuilder, TypeDesc, TypeTag,
};
pub use crate::stats::{CollectionStats, FieldStats};
