use std::collections::BTreeMap;

use turbine_api::ResourceConfigs;

/// Resource families that receive connector configuration overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Postgres,
    Mysql,
    Redshift,
    S3,
    Other,
}

impl ResourceType {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => ResourceType::Postgres,
            "mysql" => ResourceType::Mysql,
            "redshift" => ResourceType::Redshift,
            "s3" => ResourceType::S3,
            _ => ResourceType::Other,
        }
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            ResourceType::Postgres | ResourceType::Mysql | ResourceType::Redshift
        )
    }

    /// Redshift sinks do not support upserts.
    fn supports_upsert(self) -> bool {
        matches!(self, ResourceType::Postgres | ResourceType::Mysql)
    }

    /// Source connector configuration: caller options plus the key-extraction
    /// transforms relational sources need to key records by `id`.
    pub fn source_config(self, config: &ResourceConfigs) -> BTreeMap<String, String> {
        let mut out = config.to_map();
        if self.is_relational() {
            for (k, v) in [
                ("transforms", "createKey,extractInt"),
                ("transforms.createKey.fields", "id"),
                (
                    "transforms.createKey.type",
                    "org.apache.kafka.connect.transforms.ValueToKey",
                ),
                ("transforms.extractInt.field", "id"),
                (
                    "transforms.extractInt.type",
                    "org.apache.kafka.connect.transforms.ExtractField$Key",
                ),
            ] {
                out.insert(k.to_owned(), v.to_owned());
            }
        }
        out
    }

    /// Destination connector configuration for writing into `collection`.
    pub fn destination_config(
        self,
        config: &ResourceConfigs,
        collection: &str,
    ) -> BTreeMap<String, String> {
        let mut out = config.to_map();
        let collection = collection.to_lowercase();

        if self.is_relational() {
            out.insert("table.name.format".into(), collection);
            out.insert("pk.mode".into(), "record_value".into());
            out.insert("pk.fields".into(), "id".into());
            if self.supports_upsert() {
                out.insert("insert.mode".into(), "upsert".into());
            }
        } else if self == ResourceType::S3 {
            out.insert("aws_s3_prefix".into(), format!("{collection}/"));
            out.insert(
                "value.converter".into(),
                "org.apache.kafka.connect.json.JsonConverter".into(),
            );
            out.insert("value.converter.schemas.enable".into(), "true".into());
            out.insert("format.output.type".into(), "jsonl".into());
            out.insert("format.output.envelope".into(), "true".into());
        }
        out
    }
}
