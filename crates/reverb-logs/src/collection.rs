//! Response envelope for classified log pages.

use serde::Serialize;

use crate::classify::ClassifiedLog;
use crate::links::CollectionLinks;
use crate::types::{LogRecord, RecordId};

/// A page of classified records plus optional navigation links.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HateoasLogCollection {
    /// Classified records, in store order.
    pub logs: Vec<ClassifiedLog>,
    /// Links to neighbouring pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<CollectionLinks>,
}

impl HateoasLogCollection {
    /// Wraps already-classified records.
    #[must_use]
    pub const fn new(logs: Vec<ClassifiedLog>) -> Self {
        Self { logs, links: None }
    }

    /// Classifies raw records in order.
    #[must_use]
    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self::new(records.into_iter().map(ClassifiedLog::classify).collect())
    }

    /// Number of records on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Returns true if the page holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Drops records beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        self.logs.truncate(len);
    }

    /// Recomputes per-record links, replacing any already attached.
    pub fn set_log_links(&mut self) {
        for log in &mut self.logs {
            log.refresh_links();
        }
    }

    /// Identifier of the last classified record, used as the next cursor.
    #[must_use]
    pub fn next_cursor(&self) -> Option<RecordId> {
        self.logs.last().and_then(ClassifiedLog::cursor_id)
    }
}
