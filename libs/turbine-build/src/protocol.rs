//! Messages exchanged with the build service.
//!
//! Every request is one frame holding `{"method": ..., "params": {...}}`; every
//! reply is `{"status": "ok", "result": ...}` or
//! `{"status": "error", "message": "..."}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use turbine_api::{Collection, ResourceConfig, TurbineError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    /// Opens the build session.
    Init {
        app_name: String,
        git_sha: String,
        app_path: String,
        language: String,
    },
    ReadCollection {
        resource: String,
        collection: String,
        configs: Vec<ResourceConfig>,
    },
    WriteCollection {
        resource: String,
        source: Collection,
        target: String,
        configs: Vec<ResourceConfig>,
    },
    /// Attach a process to the topology; the reply carries the collection on
    /// its newly assigned stream.
    AddProcessToCollection {
        process: String,
        collection: Collection,
    },
    RegisterSecret {
        name: String,
        value: String,
    },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::Init { .. } => "init",
            Request::ReadCollection { .. } => "read_collection",
            Request::WriteCollection { .. } => "write_collection",
            Request::AddProcessToCollection { .. } => "add_process_to_collection",
            Request::RegisterSecret { .. } => "register_secret",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok {
        #[serde(default)]
        result: serde_json::Value,
    },
    Error {
        message: String,
    },
}

impl Reply {
    pub fn ok(result: impl Serialize) -> Result<Self, TurbineError> {
        let result = serde_json::to_value(result)
            .map_err(|e| TurbineError::Rpc(format!("unserializable result: {e}")))?;
        Ok(Reply::Ok { result })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            message: message.into(),
        }
    }

    /// Decode the result into `T`, turning a service-side error into
    /// [`TurbineError::Rpc`].
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, TurbineError> {
        match self {
            Reply::Ok { result } => serde_json::from_value(result)
                .map_err(|e| TurbineError::Rpc(format!("unexpected result: {e}"))),
            Reply::Error { message } => Err(TurbineError::Rpc(message)),
        }
    }
}
