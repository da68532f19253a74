//! HATEOAS link synthesis.
//!
//! Records get navigation links derived from their contents, and
//! collections get `previous`/`next` links built with [`LinkBuilder`].

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::classify::{ClassifiedLog, LogKind};
use crate::types::{LogRecord, id_segment};

/// Links attached to a single classified record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLinks {
    /// Link to the owning event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Link to the related function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Link from an event to its functions.
    ///
    /// Kept plural for compatibility with existing clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<String>,
    /// Link to the full log history of a function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl RecordLinks {
    /// Returns true if no link is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.event.is_none()
            && self.function.is_none()
            && self.functions.is_none()
            && self.logs.is_none()
    }
}

/// Navigation links for a paginated collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLinks {
    /// Link to the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Link to the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

fn event_link(record: &LogRecord, path: &str) -> Option<String> {
    record
        .get(path)
        .and_then(id_segment)
        .map(|id| format!("/logs/events/{id}"))
}

fn function_link(record: &LogRecord, path: &str) -> Option<String> {
    record
        .get(path)
        .and_then(id_segment)
        .map(|id| format!("/logs/functions/{id}"))
}

/// Derives the links for one classified record.
///
/// Rules are evaluated in order and the first match wins. A link whose
/// id component is missing is left out.
#[must_use]
pub fn synthesize_links(log: &ClassifiedLog) -> RecordLinks {
    let record = log.record();
    let mut links = RecordLinks::default();

    match log.kind() {
        LogKind::Error if record.has("meta.payload.id") => {
            links.event = event_link(record, "meta.payload.event.id");
            links.function = function_link(record, "meta.payload.id");
        }
        LogKind::Error => {
            links.event = event_link(record, "meta.eventId");
            links.function = function_link(record, "meta.funcId");
        }
        LogKind::Event if record.has("meta.eventId") => {
            links.functions = event_link(record, "meta.eventId");
        }
        LogKind::Function if record.has("meta.eventId") => {
            links.event = event_link(record, "meta.eventId");
        }
        LogKind::Function if record.has("funcId") => {
            links.logs = function_link(record, "funcId");
        }
        LogKind::Event | LogKind::Function | LogKind::Unknown => {}
    }

    links
}

/// Builds a link from a base path and an ordered list of query parameters.
///
/// ```
/// use reverb_logs::LinkBuilder;
///
/// let link = LinkBuilder::new("/logs/dead-letter")
///     .param("page", 2)
///     .param("limit", 10)
///     .param("type", "all")
///     .build();
/// assert_eq!(link, "/logs/dead-letter?page=2&limit=10&type=all");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    path: String,
    params: Vec<(String, String)>,
}

impl LinkBuilder {
    /// Starts a link at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Appends a query parameter once per value, keeping their order.
    #[must_use]
    pub fn params<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.params
            .extend(values.into_iter().map(|v| (key.to_string(), v.to_string())));
        self
    }

    /// Replaces the value of `key`, or appends it if absent.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        self
    }

    /// Renders the link.
    #[must_use]
    pub fn build(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}
