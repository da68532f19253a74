//! Core types for log records.
//!
//! This module provides:
//! - [`RecordId`] — Totally ordered unique identifier assigned by the store
//! - [`LogLevel`] — Severity levels emitted by workflow workers
//! - [`LogRecord`] — Opaque semi-structured log document
//! - [`TimeRange`] — Closed time interval used by filters

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LogError, Result};

/// Unique identifier for a log record.
///
/// Identifiers are 24 lowercase hexadecimal characters. Because every
/// identifier has the same width, lexicographic order is numeric order,
/// and the store hands them out in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Width of an identifier in hex characters.
    pub const LEN: usize = 24;

    /// Parses an identifier, normalising it to lowercase.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `raw` is exactly 24 hex characters.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() == Self::LEN && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(LogError::validation(format!("invalid record id: {raw}")))
        }
    }

    /// Builds the identifier for the given insertion sequence number.
    #[must_use]
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{sequence:024x}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log severity levels, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error conditions
    Error = 0,
    /// Warning conditions
    Warn = 1,
    /// General information
    Info = 2,
    /// HTTP access information
    Http = 3,
    /// Verbose diagnostics
    Verbose = 4,
    /// Debugging information
    Debug = 5,
    /// Everything else
    Silly = 6,
}

impl LogLevel {
    /// Returns the string representation of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Http => "http",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Silly => "silly",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "http" => Ok(Self::Http),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            "silly" => Ok(Self::Silly),
            other => Err(LogError::validation(format!("invalid log level: {other}"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed time interval; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive)
    pub start: DateTime<Utc>,
    /// End of the range (inclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Checks if a timestamp falls within this range.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Parses a date-time the way query parameters and stored documents
/// express them.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC),
/// and a bare `YYYY-MM-DD` (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Returns whether a JSON value counts as "set".
///
/// `null`, `false`, `0` and the empty string are treated as absent.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a JSON scalar as a URL path segment.
#[must_use]
pub fn id_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An opaque, semi-structured log document.
///
/// The engine only inspects a handful of optional fields (`_id`,
/// `timestamp`, `level`, `message` and a few `meta.*` keys); everything
/// else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(Map<String, Value>);

impl LogRecord {
    /// Wraps an existing JSON object.
    #[must_use]
    pub const fn new(document: Map<String, Value>) -> Self {
        Self(document)
    }

    /// Creates a new record builder.
    #[must_use]
    pub fn builder() -> LogRecordBuilder {
        LogRecordBuilder::default()
    }

    /// Converts an arbitrary JSON value into a record.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(LogError::validation("log record must be a JSON object")),
        }
    }

    /// Parses one JSON document, such as a line of an NDJSON export.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON, or a validation
    /// error if the document is not an object.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Looks up a dotted field path such as `meta.payload.id`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns true if the field at `path` is present and truthy.
    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some_and(is_truthy)
    }

    /// Returns the string at `path`, if it is one.
    #[must_use]
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns the store-assigned identifier, if present and well formed.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.str_at("_id").and_then(|raw| RecordId::parse(raw).ok())
    }

    /// Sets the store-assigned identifier.
    pub fn set_id(&mut self, id: &RecordId) {
        self.0
            .insert("_id".to_string(), Value::String(id.as_str().to_string()));
    }

    /// Returns the top-level `timestamp`.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.str_at("timestamp").and_then(parse_timestamp)
    }

    /// Returns `meta.timestamp`.
    #[must_use]
    pub fn meta_timestamp(&self) -> Option<DateTime<Utc>> {
        self.str_at("meta.timestamp").and_then(parse_timestamp)
    }

    /// Returns the severity level, if recognised.
    #[must_use]
    pub fn level(&self) -> Option<LogLevel> {
        self.str_at("level").and_then(|raw| raw.parse().ok())
    }

    /// Returns the log message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.str_at("message")
    }

}

/// Builder for constructing log records.
#[derive(Debug, Default)]
pub struct LogRecordBuilder {
    fields: Map<String, Value>,
    meta: Map<String, Value>,
}

impl LogRecordBuilder {
    /// Sets the record identifier.
    #[must_use]
    pub fn id(mut self, id: &RecordId) -> Self {
        self.fields
            .insert("_id".to_string(), Value::String(id.as_str().to_string()));
        self
    }

    /// Sets the top-level timestamp.
    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.fields
            .insert("timestamp".to_string(), Value::String(timestamp.to_rfc3339()));
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.fields
            .insert("level".to_string(), Value::String(level.as_str().to_string()));
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.fields
            .insert("message".to_string(), Value::String(message.into()));
        self
    }

    /// Adds a field under `meta`.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Adds a top-level field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Builds the record.
    #[must_use]
    pub fn build(mut self) -> LogRecord {
        if !self.meta.is_empty() {
            self.fields
                .insert("meta".to_string(), Value::Object(self.meta));
        }
        LogRecord(self.fields)
    }
}
