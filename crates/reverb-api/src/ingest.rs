//! Event and webhook ingestion.
//!
//! Incoming events are not processed inline. They are handed to a
//! [`JobQueue`] as `process_event` jobs on the event processing queue,
//! and a worker picks them up later.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

/// Job that processes a fired event.
pub const PROCESS_EVENT_JOB: &str = "process_event";

/// Queue that event jobs are placed on.
pub const EVENT_PROCESSING_QUEUE: &str = "event_processing_queue";

/// Event name given to inbound webhooks.
pub const WEBHOOK_EVENT_NAME: &str = "reverb_received_webhook";

const INVALID_EVENT: &str = "Invalid event request.";
const PROCESSING_FAILED: &str = "Error processing event.";

/// Errors raised while enqueueing a job.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is not accepting jobs.
    #[error("queue closed")]
    Closed,

    /// The backend rejected the job.
    #[error("enqueue failed: {0}")]
    Rejected(String),
}

/// Boxed future returned by [`JobQueue::enqueue`].
pub type QueueFuture<'a> = Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + 'a>>;

/// Durable job queue consumed by workflow workers.
pub trait JobQueue: Send + Sync {
    /// Adds a job named `job_name` with `payload` to `queue_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job could not be stored.
    fn enqueue<'a>(&'a self, job_name: &'a str, payload: Value, queue_name: &'a str)
    -> QueueFuture<'a>;
}

/// A job accepted by a [`MemoryJobQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueuedJob {
    /// Job name.
    pub job_name: String,
    /// Job payload.
    pub payload: Value,
    /// Queue the job was placed on.
    pub queue_name: String,
}

/// In-process job queue that records every job it accepts.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<EnqueuedJob>>,
    closed: AtomicBool,
}

impl MemoryJobQueue {
    /// Creates an open, empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops accepting jobs.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Resumes accepting jobs.
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }

    /// Returns a snapshot of accepted jobs, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<EnqueuedJob> {
        self.jobs.lock().clone()
    }

    /// Number of accepted jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns true if no job has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl JobQueue for MemoryJobQueue {
    fn enqueue<'a>(
        &'a self,
        job_name: &'a str,
        payload: Value,
        queue_name: &'a str,
    ) -> QueueFuture<'a> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }
            self.jobs.lock().push(EnqueuedJob {
                job_name: job_name.to_string(),
                payload,
                queue_name: queue_name.to_string(),
            });
            Ok(())
        })
    }
}

/// Body of an accepted event.
#[derive(Debug, Serialize)]
pub struct EventAccepted {
    /// Always "Event processed".
    pub message: &'static str,
    /// Identifier assigned to the event.
    pub id: String,
}

async fn add_event(
    queue: &Arc<dyn JobQueue>,
    name: Value,
    payload: Option<Value>,
    id: &str,
) -> ApiResult<()> {
    let mut job = Map::new();
    job.insert("name".into(), name);
    if let Some(payload) = payload {
        job.insert("payload".into(), payload);
    }
    job.insert("id".into(), Value::String(id.to_string()));
    let job = Value::Object(job);
    queue
        .enqueue(PROCESS_EVENT_JOB, job, EVENT_PROCESSING_QUEUE)
        .await
        .map_err(|e| {
            error!(error = %e, event_id = %id, "failed to enqueue event");
            ApiError::Internal(PROCESSING_FAILED.to_string())
        })
}

/// Handle POST /events - enqueue a named event.
pub async fn post_event(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<EventAccepted>)> {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let name = match body.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(ApiError::BadRequest(INVALID_EVENT.to_string())),
    };
    let payload = body.get("payload").cloned();

    let id = Uuid::new_v4().to_string();
    add_event(state.queue(), Value::String(name.clone()), payload, &id).await?;

    info!(event = %name, event_id = %id, "event accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            message: "Event processed",
            id,
        }),
    ))
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.insert(name.as_str().to_string(), Value::String(value));
    }
    Value::Object(map)
}

/// Handle POST /webhooks - wrap any request as a webhook event.
pub async fn post_webhook(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let body: Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::Object(Map::new()));
    let payload = json!({
        "webhook": { "headers": headers_to_json(&headers), "body": body }
    });

    let id = Uuid::new_v4().to_string();
    add_event(
        state.queue(),
        Value::String(WEBHOOK_EVENT_NAME.to_string()),
        Some(payload),
        &id,
    )
    .await?;

    info!(event_id = %id, "webhook accepted");
    Ok(StatusCode::OK)
}
