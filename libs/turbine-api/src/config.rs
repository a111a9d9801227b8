use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TurbineError;

// ════════════════════════════════════════════════════════════════
//  Resource configs
// ════════════════════════════════════════════════════════════════

/// One `field = value` option passed to a resource read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub field: String,
    pub value: String,
}

/// Ordered resource options declared by the pipeline.
///
/// Insertion order is kept because the build service loads configuration
/// positionally. Setting an existing field replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceConfigs {
    entries: Vec<ResourceConfig>,
}

impl ResourceConfigs {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.field == field) {
            entry.value = value;
        } else {
            self.entries.push(ResourceConfig { field, value });
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat string-keyed map, as expected by connector configuration.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.field.clone(), e.value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResourceConfigs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut configs = Self::new();
        for (field, value) in iter {
            configs.set(field, value);
        }
        configs
    }
}

// ════════════════════════════════════════════════════════════════
//  Application config
// ════════════════════════════════════════════════════════════════

/// Application description shared by all backends (`app.json` / `app.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub language: String,

    #[serde(default)]
    pub environment: String,

    /// Platform pipeline that connectors and functions are attached to.
    #[serde(default)]
    pub pipeline: String,

    /// Resource name → fixture file, used by the local backend.
    #[serde(default)]
    pub resources: HashMap<String, PathBuf>,

    /// Directory searched for `<resource>.json` when a resource has no
    /// explicit fixture entry. Defaults to `fixtures` next to the config file.
    #[serde(default)]
    pub fixtures_dir: Option<PathBuf>,

    /// Directory the config was loaded from; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl AppConfig {
    /// Load from a file; the extension selects the format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TurbineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TurbineError::Config(format!("{}: {e}", path.display())))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mut config = Self::parse(ext, &content)
            .map_err(|e| e.with_context(path.display()))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse content in the format named by `ext` (`json` or `toml`).
    pub fn parse(ext: &str, content: &str) -> Result<Self, TurbineError> {
        match ext {
            "json" => serde_json::from_str(content).map_err(|e| TurbineError::Config(e.to_string())),
            "toml" => toml::from_str(content).map_err(|e| TurbineError::Config(e.to_string())),
            other => Err(TurbineError::Config(format!(
                "unsupported config format '{other}' (expected json or toml)"
            ))),
        }
    }

    /// Fixture file backing resource `name`.
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        match self.resources.get(name) {
            Some(path) => self.base_dir.join(path),
            None => {
                let dir = self
                    .fixtures_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("fixtures"));
                self.base_dir.join(dir).join(format!("{name}.json"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn set_keeps_insertion_order_and_upserts() {
        let mut cfg = ResourceConfigs::new()
            .with("incrementing.field.name", "id")
            .with("batch.size", "100")
            .with("mode", "bulk");
        cfg.set("batch.size", "500");

        let fields: Vec<(&str, &str)> = cfg
            .iter()
            .map(|e| (e.field.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            fields,
            [
                ("incrementing.field.name", "id"),
                ("batch.size", "500"),
                ("mode", "bulk"),
            ]
        );
        assert_eq!(cfg.get("mode"), Some("bulk"));
        assert_eq!(cfg.get("missing"), None);
    }

    #[test]
    fn serializes_as_array_of_pairs() {
        let cfg: ResourceConfigs = [("a", "1"), ("b", "2")].into_iter().collect();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"field": "a", "value": "1"}, {"field": "b", "value": "2"}])
        );
    }

    #[test]
    fn parse_json_config() {
        let cfg = AppConfig::parse(
            "json",
            r#"{"name":"demo","language":"rust","pipeline":"turbine-pipeline-demo",
                "resources":{"pg":"fixtures/pg.json"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.name, "demo");
        assert_eq!(cfg.pipeline, "turbine-pipeline-demo");
        assert_eq!(cfg.resources["pg"], PathBuf::from("fixtures/pg.json"));
    }

    #[test]
    fn parse_toml_config() {
        let cfg = AppConfig::parse(
            "toml",
            r#"
                name = "demo"
                pipeline = "p"
                [resources]
                pg = "data/pg.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.resources["pg"], PathBuf::from("data/pg.json"));
    }

    #[test]
    fn unknown_extension_is_config_error() {
        let err = AppConfig::parse("yaml", "name: x").unwrap_err();
        assert!(matches!(err, TurbineError::Config(_)));
    }

    #[test]
    fn load_resolves_fixture_paths_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"name":"demo","resources":{{"pg":"pg.json"}}}}"#).unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.fixture_path("pg"), dir.path().join("pg.json"));
        assert_eq!(
            cfg.fixture_path("s3"),
            dir.path().join("fixtures").join("s3.json")
        );
    }
}
