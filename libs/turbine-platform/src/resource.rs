use std::sync::Arc;

use turbine_api::{BoxFuture, Records, Resource, ResourceConfigs, TurbineError};

use crate::client::{ConnectorType, CreateConnectorInput, PlatformClient, PlatformResource};
use crate::connector::ResourceType;

struct Binding {
    client: Arc<dyn PlatformClient>,
    resource: PlatformResource,
    pipeline: String,
}

/// Resource handle bound to a platform resource. A handle without a binding
/// belongs to a dry run: reads return an empty batch, writes do nothing.
pub struct ManagedResource {
    name: String,
    binding: Option<Binding>,
}

impl ManagedResource {
    pub(crate) fn dry_run(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: None,
        }
    }

    pub(crate) fn bound(
        client: Arc<dyn PlatformClient>,
        resource: PlatformResource,
        pipeline: impl Into<String>,
    ) -> Self {
        Self {
            name: resource.name.clone(),
            binding: Some(Binding {
                client,
                resource,
                pipeline: pipeline.into(),
            }),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.binding.is_none()
    }
}

impl Resource for ManagedResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn records<'a>(
        &'a self,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<Records, TurbineError>> {
        Box::pin(async move {
            let Some(b) = &self.binding else {
                return Ok(Records::default());
            };

            let family = ResourceType::parse(&b.resource.resource_type);
            let input = CreateConnectorInput {
                resource_id: b.resource.id,
                configuration: family.source_config(&config),
                connector_type: ConnectorType::Source,
                input: collection.to_owned(),
                pipeline_name: b.pipeline.clone(),
            };
            let connector = b
                .client
                .create_connector(input)
                .await
                .map_err(|e| TurbineError::Connector {
                    resource: self.name.clone(),
                    reason: e.to_string(),
                })?;

            let stream = connector.streams.output.into_iter().next().ok_or_else(|| {
                TurbineError::NoOutputStream {
                    resource: self.name.clone(),
                    collection: collection.to_owned(),
                }
            })?;

            tracing::info!(
                resource = %self.name,
                stream = %stream,
                collection = %collection,
                "created source connector to resource {} and write records to stream {} from collection {}",
                self.name,
                stream,
                collection
            );
            Ok(Records::on_stream(stream))
        })
    }

    fn write<'a>(
        &'a self,
        records: &'a Records,
        collection: &'a str,
        config: ResourceConfigs,
    ) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            let Some(b) = &self.binding else {
                return Ok(());
            };

            let family = ResourceType::parse(&b.resource.resource_type);
            let input = CreateConnectorInput {
                resource_id: b.resource.id,
                configuration: family.destination_config(&config, collection),
                connector_type: ConnectorType::Destination,
                input: records.stream.clone(),
                pipeline_name: b.pipeline.clone(),
            };
            b.client
                .create_connector(input)
                .await
                .map_err(|e| TurbineError::Connector {
                    resource: self.name.clone(),
                    reason: e.to_string(),
                })?;

            tracing::info!(
                resource = %self.name,
                stream = %records.stream,
                collection = %collection,
                "created destination connector"
            );
            Ok(())
        })
    }
}
