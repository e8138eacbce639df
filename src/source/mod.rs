//! Record sources
//!
//! A [`RecordSource`] produces the full record set for one pipeline run.
//! Sources keep no state between calls that would change what downstream
//! stages see, apart from the random draws of the synthetic generator.
//!
//! - `http` - the remote products API
//! - `synthetic` - seeded fake task assignments

use async_trait::async_trait;

use crate::error::Result;
use crate::record::Record;

pub mod http;
pub mod synthetic;

pub use http::{HttpSource, Region, SalesQuery};
pub use synthetic::{default_catalog, generate_tasks, SyntheticTaskSource, TaskType};

/// Trait for loading a fresh record set, enabling pipelines to run against
/// in-memory fixtures in tests
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load every record for this run
    async fn load(&self) -> Result<Vec<Record>>;
}

/// Source serving a fixed record set
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn load(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}
