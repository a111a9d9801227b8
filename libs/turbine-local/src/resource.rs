use std::path::PathBuf;

use turbine_api::{BoxFuture, Records, Resource, ResourceConfigs, TurbineError};

use crate::fixtures::read_fixtures;

/// Fixture-backed resource.
#[derive(Debug, Clone)]
pub struct LocalResource {
    name: String,
    fixtures_path: PathBuf,
}

impl LocalResource {
    pub fn new(name: impl Into<String>, fixtures_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            fixtures_path: fixtures_path.into(),
        }
    }

    pub fn fixtures_path(&self) -> &std::path::Path {
        &self.fixtures_path
    }
}

impl Resource for LocalResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn records<'a>(
        &'a self,
        collection: &'a str,
        _config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<Records, TurbineError>> {
        Box::pin(async move {
            let records = read_fixtures(&self.fixtures_path, collection)?;
            tracing::debug!(
                resource = %self.name,
                collection = %collection,
                records = records.len(),
                "loaded fixtures"
            );
            Ok(records)
        })
    }

    /// Log every record; nothing is persisted.
    fn write<'a>(
        &'a self,
        records: &'a Records,
        collection: &'a str,
        _config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            for r in records.records() {
                tracing::info!(
                    resource = %self.name,
                    collection = %collection,
                    "{} ({}) => Key: {}; Payload: {}; Timestamp: {}",
                    self.name,
                    collection,
                    r.key,
                    r.payload,
                    r.timestamp
                );
            }
            Ok(())
        })
    }
}
