//! Platform backend.
//!
//! Provisions source and destination connectors and deploys each processing
//! function as a container image. Without a client the backend runs dry:
//! resources are inert and `process` is the identity, so the pipeline shape can
//! be inspected without touching the platform.

pub mod client;
pub mod connector;
mod resource;

use std::collections::BTreeMap;
use std::sync::Arc;

use turbine_api::{
    BoxFuture, Function, Records, RecordsWithErrors, Resource, Turbine, TurbineError,
    function_name, read_secret,
};

pub use client::{
    ClientError, ConnectorType, CreateConnectorInput, CreateFunctionInput, DeployedFunction,
    PipelineIdentifier, PlatformClient, PlatformResource,
};
pub use connector::ResourceType;
pub use resource::ManagedResource;

pub struct PlatformTurbine {
    client: Option<Arc<dyn PlatformClient>>,
    pipeline: String,
    image: String,
    functions: BTreeMap<String, Arc<dyn Function>>,
    secrets: BTreeMap<String, String>,
}

impl PlatformTurbine {
    /// Deploying backend: every call provisions on the platform.
    pub fn deploy(
        client: Arc<dyn PlatformClient>,
        pipeline: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            client: Some(client),
            pipeline: pipeline.into(),
            image: image.into(),
            functions: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn dry_run(pipeline: impl Into<String>) -> Self {
        Self {
            client: None,
            pipeline: pipeline.into(),
            image: String::new(),
            functions: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn is_deploying(&self) -> bool {
        self.client.is_some()
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Registered function by its lower-cased name.
    pub fn get_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    /// Names of every function seen by `process`, sorted.
    pub fn list_functions(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

impl Turbine for PlatformTurbine {
    fn resources<'a>(
        &'a mut self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Resource>, TurbineError>> {
        Box::pin(async move {
            let Some(client) = &self.client else {
                return Ok(Box::new(ManagedResource::dry_run(name)) as Box<dyn Resource>);
            };

            let resource =
                client
                    .get_resource(name)
                    .await
                    .map_err(|e| TurbineError::ResourceLookup {
                        name: name.to_owned(),
                        reason: e.to_string(),
                    })?;
            tracing::info!(
                resource = %resource.name,
                id = resource.id,
                "retrieved resource {} ({})",
                resource.name,
                resource.id
            );

            Ok(Box::new(ManagedResource::bound(
                client.clone(),
                resource,
                self.pipeline.clone(),
            )) as Box<dyn Resource>)
        })
    }

    fn process<'a>(
        &'a mut self,
        mut records: Records,
        function: Arc<dyn Function>,
    ) -> BoxFuture<'a, Result<(Records, RecordsWithErrors), TurbineError>> {
        Box::pin(async move {
            let name = function_name(function.as_ref());
            self.functions.insert(name.clone(), function);

            let Some(client) = &self.client else {
                return Ok((records, Vec::new()));
            };

            tracing::info!(function = %name, "creating function {} ...", name);
            let input = CreateFunctionInput {
                input_stream: records.stream.clone(),
                image: self.image.clone(),
                env_vars: self.secrets.clone(),
                args: vec![name.clone()],
                pipeline: PipelineIdentifier {
                    name: self.pipeline.clone(),
                },
            };
            let deployed =
                client
                    .create_function(input)
                    .await
                    .map_err(|e| TurbineError::FunctionDeploy {
                        function: name.clone(),
                        reason: e.to_string(),
                    })?;
            tracing::info!(
                function = %name,
                uuid = %deployed.uuid,
                "function {} created ({})",
                name,
                deployed.uuid
            );

            records.stream = deployed.output_stream;
            Ok((records, Vec::new()))
        })
    }

    fn register_secret<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            let value = read_secret(name)?;
            self.secrets.insert(name.to_owned(), value);
            Ok(())
        })
    }
}
