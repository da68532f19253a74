//! Record classification.
//!
//! Every raw record is tagged as exactly one of [`LogKind::Error`],
//! [`LogKind::Function`], [`LogKind::Event`] or [`LogKind::Unknown`].
//! The first matching rule wins:
//!
//! 1. `meta.error` is set → error
//! 2. `meta.funcId` or `funcId` is set → function
//! 3. `meta.eventId` or `eventId` is set → event
//! 4. otherwise → unknown

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::links::{RecordLinks, synthesize_links};
use crate::types::{LogRecord, RecordId};

/// The category a log record falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Workflow event log
    Event,
    /// Function execution log
    Function,
    /// Error raised while processing an event or function
    Error,
    /// Anything else
    Unknown,
}

impl LogKind {
    /// All kinds, in classification priority order.
    pub const ALL: [Self; 4] = [Self::Error, Self::Function, Self::Event, Self::Unknown];

    /// Returns the key used for this kind in response envelopes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Function => "function",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifies a record. Pure and total.
#[must_use]
pub fn classify(record: &LogRecord) -> LogKind {
    if record.has("meta.error") {
        LogKind::Error
    } else if record.has("meta.funcId") || record.has("funcId") {
        LogKind::Function
    } else if record.has("meta.eventId") || record.has("eventId") {
        LogKind::Event
    } else {
        LogKind::Unknown
    }
}

/// A record tagged with its category and, once synthesized, its links.
///
/// Serializes as `{"<kind>": <record>, "links": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLog {
    kind: LogKind,
    record: LogRecord,
    links: Option<RecordLinks>,
}

impl ClassifiedLog {
    /// Classifies a raw record.
    #[must_use]
    pub fn classify(record: LogRecord) -> Self {
        Self {
            kind: classify(&record),
            record,
            links: None,
        }
    }

    /// Wraps a derived document under an explicit kind.
    #[must_use]
    pub const fn with_kind(kind: LogKind, record: LogRecord) -> Self {
        Self {
            kind,
            record,
            links: None,
        }
    }

    /// Attaches links, replacing any already present.
    #[must_use]
    pub fn with_links(mut self, links: RecordLinks) -> Self {
        self.links = Some(links);
        self
    }

    /// Returns the classification.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        self.kind
    }

    /// Returns the underlying record.
    #[must_use]
    pub const fn record(&self) -> &LogRecord {
        &self.record
    }

    /// Returns the attached links, if any.
    #[must_use]
    pub const fn links(&self) -> Option<&RecordLinks> {
        self.links.as_ref()
    }

    /// Recomputes this record's links from its contents.
    pub fn refresh_links(&mut self) {
        self.links = Some(synthesize_links(self));
    }

    /// Returns the identifier usable as a traversal cursor.
    ///
    /// Only classified (non-unknown) records expose one.
    #[must_use]
    pub fn cursor_id(&self) -> Option<RecordId> {
        match self.kind {
            LogKind::Unknown => None,
            LogKind::Error | LogKind::Function | LogKind::Event => self.record.id(),
        }
    }
}

impl Serialize for ClassifiedLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.links.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.kind.as_str(), &self.record)?;
        if let Some(links) = &self.links {
            map.serialize_entry("links", links)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> LogRecord {
        LogRecord::from_value(value).unwrap()
    }

    #[test]
    fn error_wins_over_everything() {
        let r = record(json!({
            "meta": { "error": "boom", "funcId": "f1", "eventId": "e1" },
            "funcId": "f1",
            "eventId": "e1"
        }));
        assert_eq!(classify(&r), LogKind::Error);
    }

    #[test]
    fn function_from_meta_or_top_level() {
        assert_eq!(
            classify(&record(json!({ "meta": { "funcId": "f1", "eventId": "e1" } }))),
            LogKind::Function
        );
        assert_eq!(classify(&record(json!({ "funcId": "f1" }))), LogKind::Function);
    }

    #[test]
    fn event_from_meta_or_top_level() {
        assert_eq!(
            classify(&record(json!({ "meta": { "eventId": "e1" } }))),
            LogKind::Event
        );
        assert_eq!(classify(&record(json!({ "eventId": "e1" }))), LogKind::Event);
    }

    #[test]
    fn falsy_fields_do_not_count() {
        let r = record(json!({ "meta": { "error": null, "funcId": "", "eventId": 0 } }));
        assert_eq!(classify(&r), LogKind::Unknown);
    }

    #[test]
    fn serializes_under_kind_key() {
        let log = ClassifiedLog::classify(record(json!({ "eventId": "e1" })));
        assert_eq!(
            serde_json::to_value(&log).unwrap(),
            json!({ "event": { "eventId": "e1" } })
        );

        let log = log.with_links(RecordLinks::default());
        assert_eq!(
            serde_json::to_value(&log).unwrap(),
            json!({ "event": { "eventId": "e1" }, "links": {} })
        );
    }

    #[test]
    fn unknown_records_have_no_cursor() {
        let id = RecordId::from_sequence(3);
        let mut unknown = LogRecord::builder().message("hello").build();
        unknown.set_id(&id);
        assert_eq!(ClassifiedLog::classify(unknown).cursor_id(), None);

        let mut event = LogRecord::builder().field("eventId", json!("e1")).build();
        event.set_id(&id);
        assert_eq!(ClassifiedLog::classify(event).cursor_id(), Some(id));
    }

    fn optional_field() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(Value::Null)),
            Just(Some(json!(""))),
            Just(Some(json!(0))),
            Just(Some(json!(false))),
            "[a-z0-9]{1,8}".prop_map(|s| Some(Value::String(s))),
            (1i64..1000).prop_map(|n| Some(json!(n))),
        ]
    }

    proptest! {
        #[test]
        fn classification_is_total_and_exclusive(
            meta_error in optional_field(),
            meta_func in optional_field(),
            top_func in optional_field(),
            meta_event in optional_field(),
            top_event in optional_field(),
        ) {
            let mut doc = serde_json::Map::new();
            let mut meta = serde_json::Map::new();
            if let Some(v) = meta_error { meta.insert("error".into(), v); }
            if let Some(v) = meta_func { meta.insert("funcId".into(), v); }
            if let Some(v) = meta_event { meta.insert("eventId".into(), v); }
            if let Some(v) = top_func { doc.insert("funcId".into(), v); }
            if let Some(v) = top_event { doc.insert("eventId".into(), v); }
            doc.insert("meta".into(), Value::Object(meta));
            let r = LogRecord::new(doc);

            let kind = classify(&r);
            prop_assert!(LogKind::ALL.contains(&kind));

            let serialized = serde_json::to_value(ClassifiedLog::classify(r)).unwrap();
            let keys: Vec<_> = LogKind::ALL
                .iter()
                .filter(|k| serialized.get(k.as_str()).is_some())
                .collect();
            prop_assert_eq!(keys, vec![&kind]);
        }
    }
}
