//! Document / collection / database sizing and the reports built from it.

use docsim_core::config::SimLimits;
use docsim_core::error::Result;
use docsim_core::schema::{Collection, Database};
use serde::{Deserialize, Serialize};

use crate::model::SizeModel;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Size estimator with an explicit model and input limits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SizeEstimator {
    pub model: SizeModel,
    pub limits: SimLimits,
}

impl SizeEstimator {
    pub fn new(model: SizeModel, limits: SimLimits) -> Self {
        Self { model, limits }
    }

    /// Expected bytes of one document.
    pub fn document_size(&self, collection: &Collection) -> Result<f64> {
        let flat = collection.flatten_with(&self.limits)?;
        Ok(flat.iter().map(|f| self.model.entry_bytes(f)).sum())
    }

    /// `document_size x document_count`. Zero documents yield zero bytes.
    pub fn collection_size(&self, collection: &Collection) -> Result<f64> {
        Ok(self.collection_report(collection)?.total_bytes)
    }

    pub fn database_size(&self, database: &Database) -> Result<f64> {
        Ok(self.database_report(database)?.total_bytes)
    }

    pub fn collection_report(&self, collection: &Collection) -> Result<SizeReport> {
        let document_count = collection.document_count()?;
        let document_size = self.document_size(collection)?;
        Ok(SizeReport {
            collection: collection.name.clone(),
            document_size,
            document_count,
            total_bytes: document_size * document_count as f64,
        })
    }

    pub fn database_report(&self, database: &Database) -> Result<DatabaseSizeReport> {
        let collections = database
            .collections()
            .map(|c| self.collection_report(c))
            .collect::<Result<Vec<_>>>()?;
        let total_bytes = collections.iter().map(|r| r.total_bytes).sum();
        Ok(DatabaseSizeReport {
            database: database.name.clone(),
            collections,
            total_bytes,
        })
    }
}

pub fn document_size(collection: &Collection) -> Result<f64> {
    SizeEstimator::default().document_size(collection)
}

pub fn collection_size(collection: &Collection) -> Result<f64> {
    SizeEstimator::default().collection_size(collection)
}

pub fn database_size(database: &Database) -> Result<f64> {
    SizeEstimator::default().database_size(database)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeReport {
    pub collection: String,
    pub document_size: f64,
    pub document_count: u64,
    pub total_bytes: f64,
}

impl SizeReport {
    pub fn total_mib(&self) -> f64 {
        self.total_bytes / MIB
    }

    pub fn total_gib(&self) -> f64 {
        self.total_bytes / GIB
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSizeReport {
    pub database: String,
    /// One entry per collection, in name order.
    pub collections: Vec<SizeReport>,
    pub total_bytes: f64,
}

impl DatabaseSizeReport {
    pub fn total_gib(&self) -> f64 {
        self.total_bytes / GIB
    }

    pub fn collection(&self, name: &str) -> Option<&SizeReport> {
        self.collections.iter().find(|r| r.collection == name)
    }
}
