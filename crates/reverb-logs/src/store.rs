//! Document-store abstraction.
//!
//! The query service never talks to a backend directly. It holds a
//! [`StoreClientFactory`] resolved once at startup and asks it for a
//! [`StoreConnection`] per query. Connections are released when dropped,
//! so every exit path gives them back.

use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateGroup, group_by_function};
use crate::error::{LogError, Result};
use crate::filter::QueryFilter;
use crate::types::LogRecord;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Field a result set can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// `_id`, i.e. insertion order
    Id,
    /// Top-level `timestamp`
    Timestamp,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Single-key sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    /// Key to sort on
    pub field: SortField,
    /// Direction
    pub direction: SortDirection,
}

impl SortOrder {
    /// Newest first by `timestamp`.
    pub const TIMESTAMP_DESC: Self = Self {
        field: SortField::Timestamp,
        direction: SortDirection::Descending,
    };

    /// Oldest first by `timestamp`.
    pub const TIMESTAMP_ASC: Self = Self {
        field: SortField::Timestamp,
        direction: SortDirection::Ascending,
    };

    /// Compares two records. Missing keys sort before present ones.
    #[must_use]
    pub fn compare(&self, a: &LogRecord, b: &LogRecord) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id().cmp(&b.id()),
            SortField::Timestamp => a.timestamp().cmp(&b.timestamp()),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A filtered, ordered, windowed read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    /// Records must match this filter.
    pub filter: QueryFilter,
    /// Ordering; store order when `None`.
    pub sort: Option<SortOrder>,
    /// Records to skip after sorting.
    pub skip: usize,
    /// Maximum records to return.
    pub limit: Option<usize>,
}

impl FindQuery {
    /// Creates a query for every record matching `filter`.
    #[must_use]
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Sets the ordering.
    #[must_use]
    pub const fn sort(mut self, sort: Option<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the number of records to skip.
    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum number of records.
    #[must_use]
    pub const fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Runs the query over an in-order record source.
    #[must_use]
    pub fn apply<'a, I>(&self, records: I) -> Vec<LogRecord>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let mut matched: Vec<LogRecord> = records
            .into_iter()
            .filter(|r| self.filter.matches(r))
            .cloned()
            .collect();
        if let Some(sort) = self.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }
        matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    /// Keep records matching the filter.
    Match(QueryFilter),
    /// Order records.
    Sort(SortOrder),
    /// Fold records into one group per `meta.funcId`.
    GroupByFunction,
    /// Skip groups.
    Skip(usize),
    /// Keep at most this many groups.
    Limit(usize),
}

/// Ordered aggregation stages ending in function groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatePipeline {
    stages: Vec<PipelineStage>,
}

impl AggregatePipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Returns the stages in order.
    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Checks the stage order.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pipeline never groups, groups
    /// twice, or has a record stage after grouping.
    pub fn validate(&self) -> Result<()> {
        let mut grouped = false;
        for stage in &self.stages {
            match stage {
                PipelineStage::GroupByFunction if grouped => {
                    return Err(LogError::validation("pipeline groups more than once"));
                }
                PipelineStage::GroupByFunction => grouped = true,
                PipelineStage::Match(_) | PipelineStage::Sort(_) if grouped => {
                    return Err(LogError::validation(
                        "pipeline has a record stage after grouping",
                    ));
                }
                PipelineStage::Match(_)
                | PipelineStage::Sort(_)
                | PipelineStage::Skip(_)
                | PipelineStage::Limit(_) => {}
            }
        }
        if grouped {
            Ok(())
        } else {
            Err(LogError::validation("pipeline must group by function"))
        }
    }

    /// Runs the pipeline over an in-order record source.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stage order is invalid.
    pub fn apply<I>(&self, records: I) -> Result<Vec<AggregateGroup>>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        self.validate()?;

        let mut docs: Vec<LogRecord> = records.into_iter().collect();
        let mut groups: Vec<AggregateGroup> = Vec::new();
        let mut grouped = false;

        for stage in &self.stages {
            match stage {
                PipelineStage::Match(filter) => docs.retain(|r| filter.matches(r)),
                PipelineStage::Sort(order) => docs.sort_by(|a, b| order.compare(a, b)),
                PipelineStage::GroupByFunction => {
                    groups = group_by_function(std::mem::take(&mut docs));
                    grouped = true;
                }
                PipelineStage::Skip(n) if grouped => {
                    groups.drain(..(*n).min(groups.len()));
                }
                PipelineStage::Skip(n) => {
                    docs.drain(..(*n).min(docs.len()));
                }
                PipelineStage::Limit(n) if grouped => groups.truncate(*n),
                PipelineStage::Limit(n) => docs.truncate(*n),
            }
        }

        Ok(groups)
    }
}

/// An open connection to the document store.
///
/// Dropping the connection releases it.
pub trait StoreConnection: Send + Sync {
    /// Reads records.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend fails.
    fn find(&self, query: FindQuery) -> StoreFuture<'_, Vec<LogRecord>>;

    /// Runs an aggregation pipeline.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed pipeline, or a store
    /// error if the backend fails.
    fn aggregate(&self, pipeline: AggregatePipeline) -> StoreFuture<'_, Vec<AggregateGroup>>;
}

/// Opens store connections.
pub trait StoreClientFactory: Send + Sync {
    /// Opens a connection.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend is unreachable.
    fn connect(&self) -> StoreFuture<'_, Box<dyn StoreConnection>>;
}
