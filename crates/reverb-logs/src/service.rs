//! Log query service.
//!
//! Executes one store query per call over a connection obtained from the
//! injected [`StoreClientFactory`]. The connection is dropped before the
//! call returns, whether it succeeded or not.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::aggregate::{AggregateGroup, finalize_groups};
use crate::collection::HateoasLogCollection;
use crate::error::Result;
use crate::filter::QueryFilter;
use crate::store::{AggregatePipeline, FindQuery, PipelineStage, SortOrder, StoreClientFactory};

/// Runs paginated and aggregated reads against the document store.
#[derive(Clone)]
pub struct LogQueryService {
    factory: Arc<dyn StoreClientFactory>,
}

impl fmt::Debug for LogQueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogQueryService").finish_non_exhaustive()
    }
}

impl LogQueryService {
    /// Creates a service over the given store.
    #[must_use]
    pub fn new(factory: Arc<dyn StoreClientFactory>) -> Self {
        Self { factory }
    }

    /// Fetches one offset page.
    ///
    /// With a `limit`, up to `limit + 1` records are returned so the
    /// caller can tell whether another page exists.
    pub async fn get_offset_paginated_logs(
        &self,
        offset: usize,
        limit: Option<usize>,
        filter: QueryFilter,
        sort: Option<SortOrder>,
    ) -> Result<HateoasLogCollection> {
        let query = FindQuery::new(filter)
            .sort(sort)
            .skip(offset)
            .limit(limit.map(|l| l.saturating_add(1)));

        let conn = self.factory.connect().await?;
        let records = conn.find(query).await.inspect_err(|e| {
            error!(error = %e, offset, "offset query failed");
        })?;
        drop(conn);

        debug!(offset, ?limit, fetched = records.len(), "offset page fetched");
        Ok(HateoasLogCollection::from_records(records))
    }

    /// Fetches at most `limit` records.
    pub async fn get_cursor_paginated_logs(
        &self,
        limit: usize,
        filter: QueryFilter,
        sort: Option<SortOrder>,
    ) -> Result<HateoasLogCollection> {
        let after = filter.after_id.clone();
        let query = FindQuery::new(filter).sort(sort).limit(Some(limit));

        let conn = self.factory.connect().await?;
        let records = conn.find(query).await.inspect_err(|e| {
            error!(error = %e, "cursor query failed");
        })?;
        drop(conn);

        debug!(cursor = ?after, limit, fetched = records.len(), "cursor page fetched");
        Ok(HateoasLogCollection::from_records(records))
    }

    /// Summarises function status from worker logs.
    ///
    /// Logs are grouped per function in timestamp order, windowed by
    /// `offset` and `limit + 1`, then groups without a function id are
    /// dropped and the rest ordered by first invocation.
    pub async fn get_functions_status(
        &self,
        filter: QueryFilter,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<HateoasLogCollection> {
        let mut pipeline = AggregatePipeline::new()
            .stage(PipelineStage::Match(filter))
            .stage(PipelineStage::Sort(SortOrder::TIMESTAMP_ASC))
            .stage(PipelineStage::GroupByFunction)
            .stage(PipelineStage::Skip(offset));
        if let Some(limit) = limit {
            pipeline = pipeline.stage(PipelineStage::Limit(limit.saturating_add(1)));
        }

        let conn = self.factory.connect().await?;
        let mut groups = conn.aggregate(pipeline).await.inspect_err(|e| {
            error!(error = %e, offset, "function status aggregation failed");
        })?;
        drop(conn);

        finalize_groups(&mut groups);
        debug!(offset, ?limit, groups = groups.len(), "function status aggregated");

        Ok(HateoasLogCollection::new(
            groups
                .into_iter()
                .map(AggregateGroup::into_status_log)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LogKind;
    use crate::error::LogError;
    use crate::memory::MemoryStore;
    use crate::types::{LogLevel, LogRecord, RecordId};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn service(store: &MemoryStore) -> LogQueryService {
        LogQueryService::new(Arc::new(store.clone()))
    }

    fn fired(minute: u32) -> LogRecord {
        LogRecord::builder()
            .timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap())
            .message("Event fired")
            .meta("eventId", json!(format!("ev-{minute}")))
            .build()
    }

    fn worker(func_id: &str, minute: u32, level: LogLevel, message: &str) -> LogRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap();
        LogRecord::builder()
            .timestamp(ts)
            .level(level)
            .message(message)
            .meta("funcId", json!(func_id))
            .meta("funcName", json!("resize"))
            .meta("timestamp", json!(ts.to_rfc3339()))
            .build()
    }

    #[tokio::test]
    async fn offset_fetches_lookahead() {
        let store = MemoryStore::default();
        store.extend((0..5).map(fired));

        let page = service(&store)
            .get_offset_paginated_logs(2, Some(2), QueryFilter::new(), None)
            .await
            .unwrap();

        assert_eq!(page.len(), 3);
        assert_eq!(page.logs[0].kind(), LogKind::Event);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn offset_unbounded_returns_everything() {
        let store = MemoryStore::default();
        store.extend((0..5).map(fired));

        let page = service(&store)
            .get_offset_paginated_logs(0, None, QueryFilter::new(), Some(SortOrder::TIMESTAMP_DESC))
            .await
            .unwrap();

        assert_eq!(page.len(), 5);
        assert_eq!(
            page.logs[0].record().str_at("meta.eventId"),
            Some("ev-4")
        );
    }

    #[tokio::test]
    async fn cursor_walk_is_monotonic_and_terminates() {
        let store = MemoryStore::default();
        store.extend((0..7).map(fired));
        let svc = service(&store);

        let mut seen: Vec<RecordId> = Vec::new();
        let mut filter = QueryFilter::new();
        for _ in 0..10 {
            let page = svc.get_cursor_paginated_logs(3, filter.clone(), None).await.unwrap();
            seen.extend(page.logs.iter().filter_map(|l| l.cursor_id()));
            if page.len() < 3 {
                break;
            }
            match page.next_cursor() {
                Some(cursor) => filter = filter.with_after_id(cursor),
                None => break,
            }
        }

        assert_eq!(seen.len(), 7);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn function_status_groups_and_orders() {
        let store = MemoryStore::default();
        store.extend(vec![
            worker("b", 5, LogLevel::Info, "Function started"),
            worker("a", 1, LogLevel::Info, "Function started"),
            worker("a", 2, LogLevel::Info, "Function completed"),
            worker("b", 6, LogLevel::Error, "Timeout"),
            LogRecord::builder().message("no function").build(),
        ]);

        let page = service(&store)
            .get_functions_status(QueryFilter::new(), 0, Some(10))
            .await
            .unwrap();

        let statuses: Vec<_> = page
            .logs
            .iter()
            .map(|l| {
                (
                    l.record().str_at("funcId").unwrap_or_default().to_string(),
                    l.record().str_at("status").unwrap_or_default().to_string(),
                )
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a".to_string(), "completed".to_string()),
                ("b".to_string(), "error".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn function_status_fetches_lookahead_group() {
        let store = MemoryStore::default();
        store.extend((1..=4).map(|m| worker(&format!("f{m}"), m, LogLevel::Info, "x")));

        let page = service(&store)
            .get_functions_status(QueryFilter::new(), 1, Some(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page.logs[0].record().str_at("funcId"), Some("f2"));
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_store_error() {
        let store = MemoryStore::default();
        store.set_available(false);

        let err = service(&store)
            .get_offset_paginated_logs(0, Some(10), QueryFilter::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::Store(_)));
        assert_eq!(store.open_connections(), 0);
    }
}
