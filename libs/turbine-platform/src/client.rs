//! Seam to the managed platform's API.
//!
//! The backend only needs three calls. Anything that can look up resources,
//! create connectors and create functions can drive a deploy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use turbine_api::BoxFuture;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

/// A resource registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformResource {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    Source,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConnectorInput {
    pub resource_id: i64,
    pub configuration: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    /// Collection for sources, upstream stream for destinations.
    pub input: String,
    pub pipeline_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStreams {
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    #[serde(default)]
    pub streams: ConnectorStreams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineIdentifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFunctionInput {
    pub input_stream: String,
    pub image: String,
    pub env_vars: BTreeMap<String, String>,
    pub args: Vec<String>,
    pub pipeline: PipelineIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedFunction {
    pub uuid: String,
    pub output_stream: String,
}

pub trait PlatformClient: Send + Sync {
    /// Look up a resource by name or identifier.
    fn get_resource<'a>(&'a self, name_or_id: &'a str)
    -> BoxFuture<'a, Result<PlatformResource, ClientError>>;

    fn create_connector<'a>(
        &'a self,
        input: CreateConnectorInput,
    ) -> BoxFuture<'a, Result<Connector, ClientError>>;

    fn create_function<'a>(
        &'a self,
        input: CreateFunctionInput,
    ) -> BoxFuture<'a, Result<DeployedFunction, ClientError>>;
}
