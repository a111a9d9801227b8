//! Local backend: fixture-driven, network-free execution for test suites.
//!
//! Resources read their records from fixture files named in the app config,
//! writes are logged, and functions run in-process on the batch itself.

mod fixtures;
mod resource;

use std::path::Path;
use std::sync::Arc;

use turbine_api::{
    AppConfig, BoxFuture, Function, Records, RecordsWithErrors, Resource, Turbine, TurbineError,
    read_secret,
};

pub use resource::LocalResource;

pub struct LocalTurbine {
    config: AppConfig,
}

impl LocalTurbine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Build from an `app.json` / `app.toml` file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, TurbineError> {
        Ok(Self::new(AppConfig::load(path)?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Turbine for LocalTurbine {
    /// Bind `name` to its fixture file. Never fails; a missing file surfaces
    /// on the first read.
    fn resources<'a>(
        &'a mut self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Resource>, TurbineError>> {
        Box::pin(async move {
            let path = self.config.fixture_path(name);
            tracing::debug!(resource = %name, fixtures = %path.display(), "bound local resource");
            Ok(Box::new(LocalResource::new(name, path)) as Box<dyn Resource>)
        })
    }

    /// Run `function` directly on the batch's record sequence, without a copy.
    fn process<'a>(
        &'a mut self,
        mut records: Records,
        function: Arc<dyn Function>,
    ) -> BoxFuture<'a, Result<(Records, RecordsWithErrors), TurbineError>> {
        Box::pin(async move {
            let input = records.take_records();
            let (output, errors) = function.process(input);
            records.set_records(output);
            Ok((records, errors))
        })
    }

    /// Validate that the secret is present. Local runs read secrets from the
    /// environment directly, so nothing is stored.
    fn register_secret<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            read_secret(name)?;
            Ok(())
        })
    }
}
