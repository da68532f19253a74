//! Query filter construction and evaluation.
//!
//! A [`QueryFilter`] is a typed conjunction of optional constraints. The
//! `set_filter_*` functions fold validated request parameters into a
//! filter and fail fast on malformed input, before any store access.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LogError, Result};
use crate::params::QueryParams;
use crate::types::{LogLevel, LogRecord, RecordId, TimeRange, parse_timestamp};

/// Validation message for a bad `startTime`/`endTime` pair.
pub const TIMESTAMP_ERROR: &str = "startTime and endTime must be provided together and be valid";

/// Validation message for a bad dead-letter `type`.
pub const DEAD_LETTER_TYPE_ERROR: &str =
    "Invalid 'type' query parameter. Value must be 'function', 'event', or 'all'.";

/// Message written when an event is fired.
pub const EVENT_FIRED_MESSAGE: &str = "Event fired";

/// Messages written when a job is moved to the dead-letter queue.
pub const DEAD_LETTER_MESSAGES: [&str; 2] = [
    "Dead letter: Invalid payload",
    "Dead letter: Max attempts limit reached",
];

/// Equality or set-membership on a string field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Field equals the value.
    Exact(String),
    /// Field equals one of the values.
    AnyOf(Vec<String>),
}

impl TextMatch {
    /// Checks a candidate value.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(value) => value == candidate,
            Self::AnyOf(values) => values.iter().any(|v| v == candidate),
        }
    }
}

/// Kind of job a worker log refers to (`meta.taskType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Event processing job
    Event,
    /// Function execution job
    Function,
}

impl TaskType {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Function => "function",
        }
    }
}

/// Accepted values of the dead-letter `type` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeadLetterType {
    /// Event jobs only
    Event,
    /// Function jobs only
    Function,
    /// No narrowing
    #[default]
    All,
}

impl DeadLetterType {
    /// Parses the `type` parameter.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything but `event`, `function` or `all`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "event" => Ok(Self::Event),
            "function" => Ok(Self::Function),
            "all" => Ok(Self::All),
            _ => Err(LogError::validation(DEAD_LETTER_TYPE_ERROR)),
        }
    }

    /// Returns the parameter form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Function => "function",
            Self::All => "all",
        }
    }

    /// Returns the task type this value narrows to, if any.
    #[must_use]
    pub const fn task_type(&self) -> Option<TaskType> {
        match self {
            Self::Event => Some(TaskType::Event),
            Self::Function => Some(TaskType::Function),
            Self::All => None,
        }
    }
}

/// Which view a `name` parameter narrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Matches `meta.funcName`
    Functions,
    /// Matches `meta.eventName`
    Events,
}

/// Filter criteria for querying the log collection.
///
/// Every set field must match; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Closed range on `timestamp`
    #[serde(default)]
    pub timestamp: Option<TimeRange>,
    /// Only records whose `_id` is strictly greater
    #[serde(default)]
    pub after_id: Option<RecordId>,
    /// Constraint on `message`
    #[serde(default)]
    pub message: Option<TextMatch>,
    /// Constraint on `level`
    #[serde(default)]
    pub level: Option<LogLevel>,
    /// Constraint on `meta.eventId`
    #[serde(default)]
    pub event_id: Option<String>,
    /// Constraint on `meta.funcId`
    #[serde(default)]
    pub func_ids: Option<TextMatch>,
    /// Constraint on `meta.taskType`
    #[serde(default)]
    pub task_type: Option<TaskType>,
    /// Constraint on `meta.funcName`
    #[serde(default)]
    pub func_name: Option<String>,
    /// Constraint on `meta.eventName`
    #[serde(default)]
    pub event_name: Option<String>,
}

impl QueryFilter {
    /// Creates an empty filter that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `timestamp` to a closed range.
    #[must_use]
    pub const fn with_time_range(mut self, range: TimeRange) -> Self {
        self.timestamp = Some(range);
        self
    }

    /// Restricts to records after the given id.
    #[must_use]
    pub fn with_after_id(mut self, id: RecordId) -> Self {
        self.after_id = Some(id);
        self
    }

    /// Requires an exact message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(TextMatch::Exact(message.into()));
        self
    }

    /// Requires one of several messages.
    #[must_use]
    pub fn with_message_in<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message = Some(TextMatch::AnyOf(messages.into_iter().map(Into::into).collect()));
        self
    }

    /// Requires a log level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Requires `meta.eventId`.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Requires `meta.funcId`.
    #[must_use]
    pub fn with_func_id(mut self, func_id: impl Into<String>) -> Self {
        self.func_ids = Some(TextMatch::Exact(func_id.into()));
        self
    }

    /// Requires `meta.funcId` to be one of several ids.
    #[must_use]
    pub fn with_func_ids<I, S>(mut self, func_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.func_ids = Some(TextMatch::AnyOf(func_ids.into_iter().map(Into::into).collect()));
        self
    }

    /// Requires `meta.taskType`.
    #[must_use]
    pub const fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Checks if a record satisfies every constraint.
    #[must_use]
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(range) = &self.timestamp {
            if !record.timestamp().is_some_and(|ts| range.contains(ts)) {
                return false;
            }
        }

        if let Some(after) = &self.after_id {
            if !record.id().is_some_and(|id| id > *after) {
                return false;
            }
        }

        if let Some(message) = &self.message {
            if !record.message().is_some_and(|m| message.matches(m)) {
                return false;
            }
        }

        if let Some(level) = self.level {
            if record.level() != Some(level) {
                return false;
            }
        }

        if let Some(event_id) = &self.event_id {
            if record.str_at("meta.eventId") != Some(event_id.as_str()) {
                return false;
            }
        }

        if let Some(func_ids) = &self.func_ids {
            if !record.str_at("meta.funcId").is_some_and(|f| func_ids.matches(f)) {
                return false;
            }
        }

        if let Some(task_type) = self.task_type {
            if record.str_at("meta.taskType") != Some(task_type.as_str()) {
                return false;
            }
        }

        if let Some(name) = &self.func_name {
            if record.str_at("meta.funcName") != Some(name.as_str()) {
                return false;
            }
        }

        if let Some(name) = &self.event_name {
            if record.str_at("meta.eventName") != Some(name.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Applies `startTime`/`endTime` as a closed range on `timestamp`.
///
/// Neither given is a no-op. Exactly one given, or either unparseable,
/// is a validation error.
pub fn set_filter_timestamp(params: &QueryParams, filter: &mut QueryFilter) -> Result<()> {
    let (start, end) = match (params.get("startTime"), params.get("endTime")) {
        (None, None) => return Ok(()),
        (Some(start), Some(end)) => (parse_timestamp(start), parse_timestamp(end)),
        _ => return Err(LogError::validation(TIMESTAMP_ERROR)),
    };

    match (start, end) {
        (Some(start), Some(end)) => {
            debug!(%start, %end, "filtering by time range");
            filter.timestamp = Some(TimeRange::new(start, end));
            Ok(())
        }
        _ => Err(LogError::validation(TIMESTAMP_ERROR)),
    }
}

/// Applies `cursor` as a strict lower bound on `_id`.
pub fn set_filter_cursor(params: &QueryParams, filter: &mut QueryFilter) -> Result<()> {
    let Some(raw) = params.get("cursor") else {
        return Ok(());
    };
    let cursor = RecordId::parse(raw)
        .map_err(|_| LogError::validation(format!("invalid cursor: {raw}")))?;
    filter.after_id = Some(cursor);
    Ok(())
}

/// Applies `name` to the function or event name, depending on the view.
pub fn set_filter_name(params: &QueryParams, filter: &mut QueryFilter, scope: NameScope) {
    let Some(name) = params.get("name") else {
        return;
    };
    match scope {
        NameScope::Functions => filter.func_name = Some(name.to_string()),
        NameScope::Events => filter.event_name = Some(name.to_string()),
    }
}

/// Folds every `id` parameter into a set-membership constraint on
/// `meta.funcId`, returning the ids in request order.
pub fn set_filter_func_ids(params: &QueryParams, filter: &mut QueryFilter) -> Vec<String> {
    let ids: Vec<String> = params.get_all("id").into_iter().map(str::to_string).collect();
    if !ids.is_empty() {
        filter.func_ids = Some(TextMatch::AnyOf(ids.clone()));
    }
    ids
}

/// Builds the dead-letter filter.
///
/// The `type` parameter is validated first; the time range after it.
/// Returns the filter and the effective type (`all` when omitted).
pub fn dead_letter_filter(params: &QueryParams) -> Result<(QueryFilter, DeadLetterType)> {
    let dead_letter_type = params
        .get("type")
        .map(DeadLetterType::parse)
        .transpose()?
        .unwrap_or_default();

    let mut filter = QueryFilter::new().with_message_in(DEAD_LETTER_MESSAGES);
    filter.task_type = dead_letter_type.task_type();
    set_filter_timestamp(params, &mut filter)?;

    Ok((filter, dead_letter_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use test_case::test_case;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::from_pairs(pairs.iter().copied())
    }

    // ===========================================
    // Timestamp
    // ===========================================

    #[test]
    fn timestamp_neither_is_noop() {
        let mut filter = QueryFilter::new();
        set_filter_timestamp(&params(&[("limit", "5")]), &mut filter).unwrap();
        assert_eq!(filter, QueryFilter::new());
    }

    #[test_case(&[("startTime", "2024-01-01T00:00:00Z")]; "start only")]
    #[test_case(&[("endTime", "2024-01-01T00:00:00Z")]; "end only")]
    #[test_case(&[("startTime", "2024-01-01T00:00:00Z"), ("endTime", "soon")]; "bad end")]
    #[test_case(&[("startTime", "nope"), ("endTime", "2024-01-01T00:00:00Z")]; "bad start")]
    #[test_case(&[("startTime", ""), ("endTime", "2024-01-01T00:00:00Z")]; "empty start")]
    fn timestamp_rejects(pairs: &[(&str, &str)]) {
        let mut filter = QueryFilter::new();
        let err = set_filter_timestamp(&params(pairs), &mut filter).unwrap_err();
        assert_eq!(err.to_string(), TIMESTAMP_ERROR);
        assert!(filter.timestamp.is_none());
    }

    #[test]
    fn timestamp_both_sets_closed_range() {
        let mut filter = QueryFilter::new();
        set_filter_timestamp(
            &params(&[
                ("startTime", "2024-01-01T00:00:00Z"),
                ("endTime", "2024-01-02T00:00:00Z"),
            ]),
            &mut filter,
        )
        .unwrap();

        let range = filter.timestamp.unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    // ===========================================
    // Cursor
    // ===========================================

    #[test]
    fn cursor_absent_is_noop() {
        let mut filter = QueryFilter::new();
        set_filter_cursor(&params(&[]), &mut filter).unwrap();
        assert!(filter.after_id.is_none());
    }

    #[test]
    fn cursor_sets_strict_lower_bound() {
        let mut filter = QueryFilter::new();
        let id = RecordId::from_sequence(2);
        set_filter_cursor(&params(&[("cursor", id.as_str())]), &mut filter).unwrap();
        assert_eq!(filter.after_id, Some(id.clone()));

        let mut at = LogRecord::builder().build();
        at.set_id(&id);
        let mut after = LogRecord::builder().build();
        after.set_id(&RecordId::from_sequence(3));
        assert!(!filter.matches(&at));
        assert!(filter.matches(&after));
    }

    #[test]
    fn cursor_rejects_malformed() {
        let mut filter = QueryFilter::new();
        let err = set_filter_cursor(&params(&[("cursor", "not-an-id")]), &mut filter).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("not-an-id"));
    }

    // ===========================================
    // Name and id narrowing
    // ===========================================

    #[test]
    fn name_targets_scope() {
        let p = params(&[("name", "resize")]);

        let mut filter = QueryFilter::new();
        set_filter_name(&p, &mut filter, NameScope::Functions);
        assert_eq!(filter.func_name.as_deref(), Some("resize"));
        assert!(filter.event_name.is_none());

        let mut filter = QueryFilter::new();
        set_filter_name(&p, &mut filter, NameScope::Events);
        assert_eq!(filter.event_name.as_deref(), Some("resize"));
    }

    #[test]
    fn repeated_ids_fold_into_set() {
        let mut filter = QueryFilter::new();
        let ids = set_filter_func_ids(&params(&[("id", "a"), ("id", "b")]), &mut filter);
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            filter.func_ids,
            Some(TextMatch::AnyOf(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn single_id_is_still_a_set() {
        let mut filter = QueryFilter::new();
        set_filter_func_ids(&params(&[("id", "a")]), &mut filter);
        assert_eq!(filter.func_ids, Some(TextMatch::AnyOf(vec!["a".into()])));
    }

    #[test]
    fn no_ids_leaves_filter_untouched() {
        let mut filter = QueryFilter::new();
        assert!(set_filter_func_ids(&params(&[]), &mut filter).is_empty());
        assert!(filter.func_ids.is_none());
    }

    // ===========================================
    // Dead letter
    // ===========================================

    #[test_case(None, DeadLetterType::All, None)]
    #[test_case(Some("all"), DeadLetterType::All, None)]
    #[test_case(Some("event"), DeadLetterType::Event, Some(TaskType::Event))]
    #[test_case(Some("function"), DeadLetterType::Function, Some(TaskType::Function))]
    fn dead_letter_type_narrowing(
        raw: Option<&str>,
        expected: DeadLetterType,
        task_type: Option<TaskType>,
    ) {
        let p = raw.map_or_else(QueryParams::default, |t| params(&[("type", t)]));
        let (filter, kind) = dead_letter_filter(&p).unwrap();
        assert_eq!(kind, expected);
        assert_eq!(filter.task_type, task_type);
        assert_eq!(
            filter.message,
            Some(TextMatch::AnyOf(
                DEAD_LETTER_MESSAGES.iter().map(|m| (*m).to_string()).collect()
            ))
        );
    }

    #[test]
    fn dead_letter_rejects_bogus_type() {
        let err = dead_letter_filter(&params(&[("type", "bogus")])).unwrap_err();
        assert_eq!(err.to_string(), DEAD_LETTER_TYPE_ERROR);
    }

    #[test]
    fn dead_letter_checks_type_before_time() {
        let err = dead_letter_filter(&params(&[("type", "bogus"), ("startTime", "x")])).unwrap_err();
        assert_eq!(err.to_string(), DEAD_LETTER_TYPE_ERROR);

        let err = dead_letter_filter(&params(&[("type", "all"), ("startTime", "x")])).unwrap_err();
        assert_eq!(err.to_string(), TIMESTAMP_ERROR);
    }

    // ===========================================
    // Matching
    // ===========================================

    #[test]
    fn matches_all_by_default() {
        let record = LogRecord::builder().message("anything").build();
        assert!(QueryFilter::new().matches(&record));
    }

    #[test]
    fn matches_combined_constraints() {
        let record = LogRecord::from_value(json!({
            "timestamp": "2024-01-01T12:00:00Z",
            "level": "error",
            "message": "Dead letter: Invalid payload",
            "meta": {
                "eventId": "ev-1",
                "funcId": "fn-1",
                "taskType": "function",
                "funcName": "resize",
                "eventName": "upload"
            }
        }))
        .unwrap();

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        );
        let mut filter = QueryFilter::new()
            .with_time_range(range)
            .with_level(LogLevel::Error)
            .with_message_in(DEAD_LETTER_MESSAGES)
            .with_event_id("ev-1")
            .with_func_ids(["fn-0", "fn-1"])
            .with_task_type(TaskType::Function);
        filter.func_name = Some("resize".into());
        filter.event_name = Some("upload".into());
        assert!(filter.matches(&record));

        assert!(!filter.clone().with_level(LogLevel::Info).matches(&record));
        assert!(!filter.clone().with_func_id("fn-2").matches(&record));
        assert!(!filter.clone().with_task_type(TaskType::Event).matches(&record));
        assert!(!filter.clone().with_message("Event fired").matches(&record));
    }

    #[test]
    fn time_range_requires_timestamp() {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        );
        let filter = QueryFilter::new().with_time_range(range);
        assert!(!filter.matches(&LogRecord::builder().message("no time").build()));
    }
}
