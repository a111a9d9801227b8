//! Wire form of a batch, exchanged with the build service.
//!
//! `value` travels as base64 text so arbitrary payload bytes survive the JSON
//! transport unmodified. Timestamps use the protobuf `{seconds, nanos}` shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TurbineError;
use crate::payload::Payload;
use crate::record::{Record, Records};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub stream: String,
    #[serde(default)]
    pub records: Vec<WireRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub key: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    pub timestamp: WireTimestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        Self {
            seconds: ts.timestamp(),
            nanos: ts.timestamp_subsec_nanos() as i32,
        }
    }
}

impl TryFrom<WireTimestamp> for DateTime<Utc> {
    type Error = TurbineError;

    /// `nanos` must be in `0..1_000_000_000` and `seconds` within chrono's range.
    fn try_from(ts: WireTimestamp) -> Result<Self, Self::Error> {
        u32::try_from(ts.nanos)
            .ok()
            .filter(|n| *n < 1_000_000_000)
            .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
            .ok_or_else(|| {
                TurbineError::Decode(format!(
                    "invalid timestamp {{seconds: {}, nanos: {}}}",
                    ts.seconds, ts.nanos
                ))
            })
    }
}

impl TryFrom<Collection> for Records {
    type Error = TurbineError;

    fn try_from(c: Collection) -> Result<Self, Self::Error> {
        let records = c
            .records
            .into_iter()
            .map(|r| {
                let timestamp = DateTime::<Utc>::try_from(r.timestamp)
                    .map_err(|e| e.with_context(format!("record '{}'", r.key)))?;
                Ok(Record::with_timestamp(r.key, Payload::new(r.value), timestamp))
            })
            .collect::<Result<Vec<_>, TurbineError>>()?;
        Ok(Records::new(c.name, c.stream, records))
    }
}

impl From<&Records> for Collection {
    fn from(rs: &Records) -> Self {
        let records = rs
            .records()
            .iter()
            .map(|r| WireRecord {
                key: r.key.clone(),
                value: r.payload.as_bytes().to_vec(),
                timestamp: r.timestamp.into(),
            })
            .collect();
        Collection {
            name: rs.name.clone(),
            stream: rs.stream.clone(),
            records,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Records {
        let ts = Utc.with_ymd_and_hms(2022, 3, 14, 15, 9, 26).unwrap()
            + chrono::Duration::nanoseconds(535_897_932);
        Records::new(
            "user_activity",
            "stream-7f3a",
            vec![
                Record::with_timestamp("2", r#"{"payload":{"id":2}}"#, ts),
                Record::with_timestamp("1", r#"{"payload":{"id":1}}"#, ts),
                Record::with_timestamp("", vec![0u8, 159, 255], ts),
            ],
        )
    }

    #[test]
    fn round_trip_through_json() {
        let records = sample();
        let wire = serde_json::to_vec(&Collection::from(&records)).unwrap();
        let decoded: Collection = serde_json::from_slice(&wire).unwrap();
        assert_eq!(Records::try_from(decoded).unwrap(), records);
    }

    #[test]
    fn value_is_base64_on_the_wire() {
        let records = Records::new("n", "s", vec![Record::new("k", "hi")]);
        let json = serde_json::to_value(Collection::from(&records)).unwrap();
        assert_eq!(json["records"][0]["value"], "aGk=");
        assert!(json["records"][0]["timestamp"]["seconds"].is_i64());
    }

    #[test]
    fn missing_records_decode_as_empty_batch() {
        let c: Collection = serde_json::from_str(r#"{"name":"n","stream":"out"}"#).unwrap();
        let records = Records::try_from(c).unwrap();
        assert!(records.is_empty());
        assert_eq!(records.stream, "out");
    }

    #[test]
    fn invalid_timestamps_are_decode_errors() {
        for (seconds, nanos) in [(0, -1), (0, 1_000_000_000), (i64::MAX, 0)] {
            let c = Collection {
                name: "n".into(),
                stream: "s".into(),
                records: vec![WireRecord {
                    key: "k".into(),
                    value: b"{}".to_vec(),
                    timestamp: WireTimestamp { seconds, nanos },
                }],
            };
            let err = Records::try_from(c).unwrap_err();
            assert!(
                matches!(&err, TurbineError::Decode(msg) if msg.starts_with("record 'k'")),
                "{seconds}/{nanos}: {err}"
            );
        }
    }
}
