use std::fmt;

/// Error returned by every backend, resource and payload operation.
#[derive(Debug, thiserror::Error)]
pub enum TurbineError {
    #[error("config error: {0}")]
    Config(String),

    /// Malformed fixture, payload or wire JSON.
    #[error("decode error: {0}")]
    Decode(String),

    /// A payload path could not be written.
    #[error("write error: {0}")]
    Write(String),

    #[error("secret '{0}' is invalid or not set")]
    SecretNotSet(String),

    #[error("resource '{name}' lookup failed: {reason}")]
    ResourceLookup { name: String, reason: String },

    #[error("connector for resource '{resource}' failed: {reason}")]
    Connector { resource: String, reason: String },

    #[error("connector for resource '{resource}' (collection '{collection}') produced no output stream")]
    NoOutputStream { resource: String, collection: String },

    #[error("unable to create function '{function}': {reason}")]
    FunctionDeploy { function: String, reason: String },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TurbineError {
    /// Add context to the error.
    ///
    /// Message-carrying variants get the context prepended; structured
    /// variants are returned unchanged.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            TurbineError::Config(msg) => TurbineError::Config(format!("{ctx}: {msg}")),
            TurbineError::Decode(msg) => TurbineError::Decode(format!("{ctx}: {msg}")),
            TurbineError::Write(msg) => TurbineError::Write(format!("{ctx}: {msg}")),
            TurbineError::Rpc(msg) => TurbineError::Rpc(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Errors after which the pipeline-definition pass cannot continue.
    ///
    /// A resource without identity cannot get a connector, and a
    /// half-deployed pipeline has no repaired state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TurbineError::ResourceLookup { .. } | TurbineError::FunctionDeploy { .. }
        )
    }
}

impl From<serde_json::Error> for TurbineError {
    fn from(e: serde_json::Error) -> Self {
        TurbineError::Decode(e.to_string())
    }
}
