pub mod config;
pub mod error;
pub mod payload;
pub mod record;
pub mod schema;
pub mod turbine;
pub mod wire;

pub use config::{AppConfig, ResourceConfig, ResourceConfigs};
pub use error::TurbineError;
pub use payload::Payload;
pub use record::{Record, RecordWithError, Records, RecordsWithErrors};
pub use schema::{FieldType, FieldValue, SchemaField};
pub use turbine::{App, BoxFuture, Function, Resource, Turbine, function_name, read_secret};
pub use wire::Collection;
