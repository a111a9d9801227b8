use turbine_api::{
    BoxFuture, Collection, Records, Resource, ResourceConfig, ResourceConfigs, TurbineError,
};

use crate::client::SharedConnection;
use crate::protocol::Request;

/// Flatten caller options into the ordered pair list the build service
/// expects. Order is significant and kept as declared.
pub fn connection_options(config: &ResourceConfigs) -> Vec<ResourceConfig> {
    config.iter().cloned().collect()
}

/// Resource bound through the build service session.
pub struct BuildResource {
    name: String,
    conn: SharedConnection,
}

impl BuildResource {
    pub(crate) fn new(name: impl Into<String>, conn: SharedConnection) -> Self {
        Self {
            name: name.into(),
            conn,
        }
    }
}

impl Resource for BuildResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn records<'a>(
        &'a self,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<Records, TurbineError>> {
        Box::pin(async move {
            let request = Request::ReadCollection {
                resource: self.name.clone(),
                collection: collection.to_owned(),
                configs: connection_options(&config),
            };
            let reply: Collection = self.conn.lock().await.call(&request).await?;
            tracing::info!(
                resource = %self.name,
                collection = %collection,
                stream = %reply.stream,
                records = reply.records.len(),
                "read collection"
            );
            Records::try_from(reply)
        })
    }

    fn write<'a>(
        &'a self,
        records: &'a Records,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            let request = Request::WriteCollection {
                resource: self.name.clone(),
                source: Collection::from(records),
                target: collection.to_owned(),
                configs: connection_options(&config),
            };
            self.conn.lock().await.call::<()>(&request).await?;
            tracing::info!(
                resource = %self.name,
                collection = %collection,
                stream = %records.stream,
                "wrote collection"
            );
            Ok(())
        })
    }
}
