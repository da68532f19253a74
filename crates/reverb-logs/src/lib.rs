//! # reverb-logs
//!
//! Log query, pagination and classification engine for Reverb workflows.
//!
//! This crate provides:
//!
//! - [`LogRecord`] — Opaque worker log document with dotted field access
//! - [`ClassifiedLog`] — Record tagged as event, function, error or unknown
//! - [`QueryFilter`] — Typed filter built from validated query parameters
//! - [`OffsetPagination`] / [`CursorPagination`] — Paging strategies
//! - [`HateoasLogCollection`] — `{logs, links}` response envelope
//! - [`StoreClientFactory`] / [`StoreConnection`] — Document-store seam
//! - [`MemoryStore`] — Bounded in-memory store
//! - [`LogQueryService`] — Offset, cursor and function-status queries
//!
//! ## Example
//!
//! ```rust
//! use reverb_logs::{
//!     LogQueryService, LogRecord, MemoryStore, OffsetPagination, QueryFilter, QueryParams,
//!     set_filter_timestamp,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::default();
//! for n in 0..3 {
//!     store.insert(
//!         LogRecord::builder()
//!             .message("Event fired")
//!             .meta("eventId", json!(format!("ev-{n}")))
//!             .build(),
//!     );
//! }
//!
//! let params = QueryParams::parse(Some("page=1&limit=2"));
//! let pagination = OffsetPagination::from_params(&params).unwrap();
//! let mut filter = QueryFilter::new().with_message("Event fired");
//! set_filter_timestamp(&params, &mut filter).unwrap();
//!
//! let service = LogQueryService::new(Arc::new(store));
//! let mut page = service
//!     .get_offset_paginated_logs(pagination.offset(), pagination.limit().get(), filter, None)
//!     .await
//!     .unwrap();
//! pagination.apply_links(&mut page, "/logs/events", &[]);
//! page.set_log_links();
//!
//! assert_eq!(page.len(), 2);
//! assert_eq!(
//!     page.links.unwrap().next.as_deref(),
//!     Some("/logs/events?page=2&limit=2")
//! );
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod classify;
pub mod collection;
pub mod error;
pub mod filter;
pub mod links;
pub mod memory;
pub mod pagination;
pub mod params;
pub mod service;
pub mod store;
pub mod types;

// Re-export main types
pub use aggregate::{AggregateGroup, FUNCTION_COMPLETED_MESSAGE, FunctionStatus};
pub use classify::{ClassifiedLog, LogKind, classify};
pub use collection::HateoasLogCollection;
pub use error::{LogError, Result};
pub use filter::{
    DEAD_LETTER_MESSAGES, DEAD_LETTER_TYPE_ERROR, DeadLetterType, EVENT_FIRED_MESSAGE, NameScope,
    QueryFilter, TIMESTAMP_ERROR, TaskType, TextMatch, dead_letter_filter, set_filter_cursor,
    set_filter_func_ids, set_filter_name, set_filter_timestamp,
};
pub use links::{CollectionLinks, LinkBuilder, RecordLinks, synthesize_links};
pub use memory::{DEFAULT_MAX_ENTRIES, MemoryConnection, MemoryStore};
pub use pagination::{
    CursorPagination, DEFAULT_LIMIT, DEFAULT_PAGE, OffsetPagination, PAGE_NOT_FOUND, PageLimit,
};
pub use params::QueryParams;
pub use service::LogQueryService;
pub use store::{
    AggregatePipeline, FindQuery, PipelineStage, SortDirection, SortField, SortOrder,
    StoreClientFactory, StoreConnection, StoreFuture,
};
pub use types::{LogLevel, LogRecord, LogRecordBuilder, RecordId, TimeRange};
