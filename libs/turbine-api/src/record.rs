use chrono::{DateTime, Utc};

use crate::payload::Payload;

/// A single record moving through a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque identifier. Uniqueness is not enforced.
    pub key: String,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time.
    pub fn new(key: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::with_timestamp(key, payload, Utc::now())
    }

    pub fn with_timestamp(
        key: impl Into<String>,
        payload: impl Into<Payload>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            timestamp,
        }
    }
}

/// Ordered batch of records produced at a pipeline step boundary.
///
/// Order is significant and is preserved by every backend and by the wire
/// codec. The record sequence itself is reached through the accessors so
/// that functions can work on it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    /// Pipeline-assigned label.
    pub name: String,
    /// Stream this batch belongs to.
    pub stream: String,
    records: Vec<Record>,
}

impl Records {
    pub fn new(name: impl Into<String>, stream: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            records,
        }
    }

    /// An empty batch bound to `stream`.
    pub fn on_stream(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }

    /// Replace the record sequence, returning the previous one.
    pub fn set_records(&mut self, records: Vec<Record>) -> Vec<Record> {
        std::mem::replace(&mut self.records, records)
    }

    /// Move the record sequence out, leaving the batch empty.
    pub fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-record failure reported by a function or backend.
///
/// No backend produces these yet; the slot exists so that partial failures
/// can be reported without changing the contract.
#[derive(Debug)]
pub struct RecordWithError {
    pub record: Record,
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl RecordWithError {
    pub fn new(record: Record, error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            record,
            error: error.into(),
        }
    }
}

pub type RecordsWithErrors = Vec<RecordWithError>;
