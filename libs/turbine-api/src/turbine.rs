use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ResourceConfigs;
use crate::error::TurbineError;
use crate::record::{Record, Records, RecordsWithErrors};

/// Boxed future returned by the object-safe backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A named transformation applied to a batch.
///
/// `name()` must be stable and deterministic: backends use it (lower-cased)
/// to identify the function to the build service and the platform.
pub trait Function: Send + Sync {
    fn name(&self) -> &str;

    /// Transform the record sequence. The sequence is handed over by value;
    /// implementations may mutate it in place and return it.
    fn process(&self, records: Vec<Record>) -> (Vec<Record>, RecordsWithErrors);
}

/// Handle to an external system bound by [`Turbine::resources`].
///
/// Owned by the backend that created it; never shared across backends.
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;

    /// Read side: a batch representing `collection`'s content.
    fn records<'a>(
        &'a self,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<Records, TurbineError>>;

    /// Write side: persist or forward `records` into `collection`.
    fn write<'a>(
        &'a self,
        records: &'a Records,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<(), TurbineError>>;
}

/// Capability set every runtime exposes: local, build and platform.
///
/// Calls are issued sequentially by the application while it defines the
/// pipeline; implementations hold no state shared with other backends.
pub trait Turbine: Send {
    /// Resolve a pipeline-declared resource name to a live handle.
    fn resources<'a>(
        &'a mut self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Resource>, TurbineError>>;

    /// Apply `function` to `records`.
    fn process<'a>(
        &'a mut self,
        records: Records,
        function: Arc<dyn Function>,
    ) -> BoxFuture<'a, Result<(Records, RecordsWithErrors), TurbineError>>;

    /// Bind the environment value `name` for later use.
    ///
    /// Fails with [`TurbineError::SecretNotSet`] when unset or empty.
    fn register_secret<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, Result<(), TurbineError>>;
}

/// A pipeline application, written once against [`Turbine`].
pub trait App: Send + Sync {
    fn run<'a>(&'a self, turbine: &'a mut dyn Turbine) -> BoxFuture<'a, Result<(), TurbineError>>;
}

/// Canonical function identifier: the function's name, lower-cased.
pub fn function_name(function: &dyn Function) -> String {
    function.name().to_lowercase()
}

/// Read environment value `name`, rejecting unset and empty values.
pub fn read_secret(name: &str) -> Result<String, TurbineError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(TurbineError::SecretNotSet(name.to_owned())),
    }
}
