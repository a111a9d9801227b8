use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use turbine_api::{Payload, Record, Records, TurbineError};

// ════════════════════════════════════════════════════════════════
//  On-disk fixture format
// ════════════════════════════════════════════════════════════════

/// One fixture entry: `{"Key": "...", "Value": {...}, "Timestamp": "..."}`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FixtureRecord {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub timestamp: String,
}

/// Fixture file: collection name → ordered entries.
pub(crate) type FixtureFile = HashMap<String, Vec<FixtureRecord>>;

/// Load `collection` from the fixture file at `path`.
///
/// Entry order becomes batch order. A collection absent from the file
/// yields an empty batch.
pub(crate) fn read_fixtures(path: &Path, collection: &str) -> Result<Records, TurbineError> {
    let bytes = std::fs::read(path).map_err(|e| {
        TurbineError::Io(std::io::Error::new(
            e.kind(),
            format!("fixture '{}': {e}", path.display()),
        ))
    })?;
    let mut fixtures: FixtureFile = serde_json::from_slice(&bytes)
        .map_err(|e| TurbineError::Decode(format!("fixture '{}': {e}", path.display())))?;

    let loaded_at = Utc::now();
    let records = fixtures
        .remove(collection)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| wrap_record(entry, loaded_at))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Records::new(collection, "", records))
}

fn wrap_record(entry: FixtureRecord, loaded_at: DateTime<Utc>) -> Result<Record, TurbineError> {
    let payload = serde_json::to_vec(&entry.value)?;

    let timestamp = if entry.timestamp.is_empty() {
        loaded_at
    } else {
        // TODO: parse fixture timestamps (RFC 3339) instead of leaving them at the epoch.
        tracing::warn!(
            key = %entry.key,
            timestamp = %entry.timestamp,
            "fixture timestamps are not parsed yet, using default"
        );
        DateTime::<Utc>::default()
    };

    Ok(Record::with_timestamp(entry.key, Payload::new(payload), timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let file = fixture(r#"{"orders": [{"Key":"1","Value":{"id":1},"Timestamp":""}]}"#);

        let before = Utc::now();
        let records = read_fixtures(file.path(), "orders").unwrap();
        let after = Utc::now();

        assert_eq!(records.len(), 1);
        let record = &records.records()[0];
        assert_eq!(record.key, "1");
        assert_eq!(
            record.payload.as_map().unwrap(),
            serde_json::json!({"id": 1}).as_object().cloned().unwrap()
        );
        assert!(record.timestamp >= before && record.timestamp <= after);
    }

    #[test]
    fn entry_order_is_batch_order() {
        let file = fixture(
            r#"{"orders": [
                {"Key":"3","Value":{"id":3}},
                {"Key":"1","Value":{"id":1}},
                {"Key":"2","Value":{"id":2}}
            ]}"#,
        );

        let records = read_fixtures(file.path(), "orders").unwrap();
        let keys: Vec<&str> = records.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["3", "1", "2"]);
        assert_eq!(records.name, "orders");
    }

    #[test]
    fn explicit_timestamp_is_not_parsed() {
        let file = fixture(
            r#"{"orders": [{"Key":"1","Value":{},"Timestamp":"2022-01-01T00:00:00Z"}]}"#,
        );
        let records = read_fixtures(file.path(), "orders").unwrap();
        assert_eq!(records.records()[0].timestamp, DateTime::<Utc>::default());
    }

    #[test]
    fn unknown_collection_is_empty() {
        let file = fixture(r#"{"orders": []}"#);
        let records = read_fixtures(file.path(), "customers").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_fixture_is_decode_error() {
        let file = fixture(r#"{"orders": [{"Key": 1}"#);
        let err = read_fixtures(file.path(), "orders").unwrap_err();
        assert!(matches!(err, TurbineError::Decode(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_fixtures(Path::new("/definitely/not/here.json"), "orders").unwrap_err();
        assert!(
            matches!(&err, TurbineError::Io(e) if e.kind() == std::io::ErrorKind::NotFound),
            "{err}"
        );
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
