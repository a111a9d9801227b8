//! Build backend.
//!
//! Validates pipeline topology against a remote build service. Resource reads
//! and writes, process attachment and secret registration go over a single
//! framed TCP session; function bodies still run locally on the sample the
//! service hands back.

pub mod client;
pub mod protocol;
mod resource;

use std::sync::Arc;
use std::time::Duration;

use turbine_api::{
    BoxFuture, Collection, Function, Records, RecordsWithErrors, Resource, Turbine, TurbineError,
    function_name, read_secret,
};

pub use client::{BuildConnection, SharedConnection};
pub use protocol::{Reply, Request};
pub use resource::{BuildResource, connection_options};

/// Session context for a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// `host:port` of the build service.
    pub addr: String,
    pub git_sha: String,
    pub app_path: String,
    pub app_name: String,
    /// Per-call deadline; `None` waits indefinitely.
    pub rpc_timeout: Option<Duration>,
}

pub struct BuildTurbine {
    conn: SharedConnection,
    options: BuildOptions,
}

impl BuildTurbine {
    /// Connect and open the build session.
    pub async fn connect(options: BuildOptions) -> Result<Self, TurbineError> {
        let mut conn = BuildConnection::connect(&options.addr, options.rpc_timeout).await?;
        conn.call::<()>(&Request::Init {
            app_name: options.app_name.clone(),
            git_sha: options.git_sha.clone(),
            app_path: options.app_path.clone(),
            language: "rust".to_owned(),
        })
        .await?;
        tracing::info!(
            addr = %options.addr,
            app = %options.app_name,
            git_sha = %options.git_sha,
            "build session started"
        );
        Ok(Self {
            conn: conn.into_shared(),
            options,
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }
}

impl Turbine for BuildTurbine {
    fn resources<'a>(
        &'a mut self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Resource>, TurbineError>> {
        Box::pin(async move {
            Ok(Box::new(BuildResource::new(name, self.conn.clone())) as Box<dyn Resource>)
        })
    }

    fn process<'a>(
        &'a mut self,
        records: Records,
        function: Arc<dyn Function>,
    ) -> BoxFuture<'a, Result<(Records, RecordsWithErrors), TurbineError>> {
        Box::pin(async move {
            let name = function_name(function.as_ref());
            let request = Request::AddProcessToCollection {
                process: name.clone(),
                collection: Collection::from(&records),
            };
            let reply: Collection = self.conn.lock().await.call(&request).await?;
            tracing::info!(function = %name, stream = %reply.stream, "process attached");

            let mut out = Records::try_from(reply)?;
            let (transformed, errors) = function.process(out.take_records());
            out.set_records(transformed);
            Ok((out, errors))
        })
    }

    fn register_secret<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            let value = read_secret(name)?;
            self.conn
                .lock()
                .await
                .call::<()>(&Request::RegisterSecret {
                    name: name.to_owned(),
                    value,
                })
                .await?;
            tracing::info!(secret = %name, "secret registered");
            Ok(())
        })
    }
}
