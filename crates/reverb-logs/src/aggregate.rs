//! Function-status aggregation.
//!
//! Worker logs for a function are folded into one [`AggregateGroup`] per
//! `meta.funcId`, and each group yields a status document:
//!
//! ```json
//! {"funcId": "...", "lastUpdate": "...", "status": "running", "funcName": "...", "invoked": "..."}
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::classify::{ClassifiedLog, LogKind};
use crate::links::RecordLinks;
use crate::types::{LogLevel, LogRecord, id_segment};

/// Message a worker writes when a function finishes successfully.
pub const FUNCTION_COMPLETED_MESSAGE: &str = "Function completed";

/// Derived state of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionStatus {
    /// Last log says the function completed.
    Completed,
    /// Last log was at error level.
    Error,
    /// Anything else. Also covers functions that stopped without
    /// writing an error log.
    Running,
}

impl FunctionStatus {
    /// Returns the string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Running => "running",
        }
    }
}

/// Summary of all logs sharing one `meta.funcId`.
///
/// `name` and `invoked` come from the first log in the group; the
/// `last_*` fields from the last one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateGroup {
    /// Group key. `None` when the logs had no function id.
    pub func_id: Option<String>,
    /// First `meta.funcName`.
    pub name: Option<String>,
    /// First `meta.timestamp`.
    pub invoked: Option<DateTime<Utc>>,
    /// Last `message`.
    pub last_message: Option<String>,
    /// Last `level`.
    pub last_level: Option<LogLevel>,
    /// Last `meta.timestamp`.
    pub last_update: Option<DateTime<Utc>>,
}

impl AggregateGroup {
    fn open(func_id: Option<String>, first: &LogRecord) -> Self {
        let mut group = Self {
            func_id,
            name: first.str_at("meta.funcName").map(str::to_string),
            invoked: first.meta_timestamp(),
            ..Self::default()
        };
        group.absorb(first);
        group
    }

    fn absorb(&mut self, record: &LogRecord) {
        self.last_message = record.message().map(str::to_string);
        self.last_level = record.level();
        self.last_update = record.meta_timestamp();
    }

    /// Derives the function status from the last log in the group.
    #[must_use]
    pub fn status(&self) -> FunctionStatus {
        if self.last_message.as_deref() == Some(FUNCTION_COMPLETED_MESSAGE) {
            FunctionStatus::Completed
        } else if self.last_level == Some(LogLevel::Error) {
            FunctionStatus::Error
        } else {
            FunctionStatus::Running
        }
    }

    /// Builds the status document for this group, tagged as a function
    /// record and linked to its status resource.
    #[must_use]
    pub fn into_status_log(self) -> ClassifiedLog {
        let status = self.status();
        let links = RecordLinks {
            logs: self
                .func_id
                .as_ref()
                .map(|id| format!("/functions/{id}")),
            ..RecordLinks::default()
        };

        let mut doc = Map::new();
        doc.insert("funcId".into(), json!(self.func_id));
        doc.insert("lastUpdate".into(), iso(self.last_update));
        doc.insert("status".into(), json!(status.as_str()));
        doc.insert("funcName".into(), json!(self.name));
        doc.insert("invoked".into(), iso(self.invoked));

        ClassifiedLog::with_kind(LogKind::Function, LogRecord::new(doc)).with_links(links)
    }
}

fn iso(ts: Option<DateTime<Utc>>) -> Value {
    ts.map_or(Value::Null, |t| {
        Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))
    })
}

/// Groups records by `meta.funcId`, in order of first appearance.
#[must_use]
pub fn group_by_function<I>(records: I) -> Vec<AggregateGroup>
where
    I: IntoIterator<Item = LogRecord>,
{
    let mut groups: Vec<AggregateGroup> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    for record in records {
        let key = record.get("meta.funcId").and_then(id_segment);
        match index.get(&key) {
            Some(&slot) => groups[slot].absorb(&record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(AggregateGroup::open(key, &record));
            }
        }
    }
    groups
}

/// Drops groups without a function id and orders the rest by `invoked`
/// ascending. Groups without an `invoked` time sort last.
pub fn finalize_groups(groups: &mut Vec<AggregateGroup>) {
    groups.retain(|g| g.func_id.is_some());
    groups.sort_by(|a, b| match (a.invoked, b.invoked) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    fn worker_log(func_id: Option<&str>, minute: u32, level: LogLevel, message: &str) -> LogRecord {
        let mut builder = LogRecord::builder()
            .level(level)
            .message(message)
            .meta("timestamp", json!(at(minute).to_rfc3339()))
            .meta("funcName", json!(format!("name-{minute}")));
        if let Some(id) = func_id {
            builder = builder.meta("funcId", json!(id));
        }
        builder.build()
    }

    #[test]
    fn groups_keep_first_and_last() {
        let groups = group_by_function(vec![
            worker_log(Some("a"), 1, LogLevel::Info, "Function started"),
            worker_log(Some("b"), 2, LogLevel::Info, "Function started"),
            worker_log(Some("a"), 3, LogLevel::Info, FUNCTION_COMPLETED_MESSAGE),
        ]);

        assert_eq!(groups.len(), 2);
        let a = &groups[0];
        assert_eq!(a.func_id.as_deref(), Some("a"));
        assert_eq!(a.name.as_deref(), Some("name-1"));
        assert_eq!(a.invoked, Some(at(1)));
        assert_eq!(a.last_update, Some(at(3)));
        assert_eq!(a.status(), FunctionStatus::Completed);
    }

    #[test]
    fn many_interleaved_functions_group_in_first_seen_order() {
        let count = 20_000;
        let records = (0..count)
            .map(|n| worker_log(Some(&format!("f{n}")), 1, LogLevel::Info, "Function started"))
            .chain((0..count).rev().map(|n| {
                worker_log(Some(&format!("f{n}")), 2, LogLevel::Info, FUNCTION_COMPLETED_MESSAGE)
            }));

        let groups = group_by_function(records);

        assert_eq!(groups.len(), count);
        assert_eq!(groups[0].func_id.as_deref(), Some("f0"));
        assert_eq!(groups[count - 1].func_id.as_deref(), Some("f19999"));
        assert!(groups.iter().all(|g| g.status() == FunctionStatus::Completed));
        assert!(groups.iter().all(|g| g.last_update == Some(at(2))));
    }

    #[test_case("Function completed", LogLevel::Info, FunctionStatus::Completed; "completed")]
    #[test_case("Function completed", LogLevel::Error, FunctionStatus::Completed; "completed wins over error")]
    #[test_case("Timeout", LogLevel::Error, FunctionStatus::Error; "error")]
    #[test_case("Function started", LogLevel::Info, FunctionStatus::Running; "in flight")]
    fn status_derivation(message: &str, level: LogLevel, expected: FunctionStatus) {
        let groups = group_by_function(vec![worker_log(Some("a"), 1, level, message)]);
        assert_eq!(groups[0].status(), expected);
    }

    #[test]
    fn stopped_without_error_log_still_reads_running() {
        // A worker that died after "Function retried" never wrote an error
        // log, so it is indistinguishable from one still in flight.
        let groups = group_by_function(vec![
            worker_log(Some("a"), 1, LogLevel::Info, "Function started"),
            worker_log(Some("a"), 2, LogLevel::Warn, "Function retried"),
        ]);
        assert_eq!(groups[0].status(), FunctionStatus::Running);
    }

    #[test]
    fn finalize_drops_null_keys_and_orders_by_invoked() {
        let mut groups = group_by_function(vec![
            worker_log(Some("late"), 9, LogLevel::Info, "x"),
            worker_log(None, 0, LogLevel::Info, "orphan"),
            worker_log(Some("early"), 2, LogLevel::Info, "x"),
        ]);
        groups.push(AggregateGroup {
            func_id: Some("never".into()),
            ..AggregateGroup::default()
        });

        finalize_groups(&mut groups);

        let ids: Vec<_> = groups.iter().filter_map(|g| g.func_id.as_deref()).collect();
        assert_eq!(ids, vec!["early", "late", "never"]);
    }

    #[test]
    fn status_log_shape() {
        let group = group_by_function(vec![worker_log(Some("a"), 1, LogLevel::Error, "Timeout")])
            .remove(0);
        let log = group.into_status_log();

        assert_eq!(log.kind(), LogKind::Function);
        assert_eq!(
            serde_json::to_value(&log).unwrap(),
            json!({
                "function": {
                    "funcId": "a",
                    "lastUpdate": "2024-01-01T00:01:00.000Z",
                    "status": "error",
                    "funcName": "name-1",
                    "invoked": "2024-01-01T00:01:00.000Z"
                },
                "links": { "logs": "/functions/a" }
            })
        );
    }
}
