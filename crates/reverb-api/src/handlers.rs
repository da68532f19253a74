//! HTTP request handlers for the log query API.
//!
//! Every handler validates its query string before touching the store, so
//! malformed requests are rejected with 400 without opening a connection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use reverb_logs::{
    ClassifiedLog, CursorPagination, EVENT_FIRED_MESSAGE, HateoasLogCollection, LogError,
    LogLevel, NameScope, OffsetPagination, QueryFilter, QueryParams, SortOrder, dead_letter_filter,
    set_filter_cursor, set_filter_func_ids, set_filter_name, set_filter_timestamp,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

const LOGS_ERROR: &str = "Error retrieving logs";
const EVENT_LOGS_ERROR: &str = "Error retrieving event logs";
const FUNCTION_LOGS_ERROR: &str = "Error retrieving function logs";
const ERROR_LOGS_ERROR: &str = "Error retrieving error logs";
const DEAD_LETTER_ERROR: &str = "Error retrieving dead letter logs";
const FUNCTION_NOT_FOUND: &str = "Function not found";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Function statuses for one event.
#[derive(Debug, Serialize)]
pub struct EventFunctions {
    /// Event the functions belong to.
    #[serde(rename = "eventId")]
    pub event_id: String,
    /// One status record per function.
    pub logs: Vec<ClassifiedLog>,
}

fn offset_pagination(
    state: &ApiState,
    params: &QueryParams,
) -> Result<OffsetPagination, LogError> {
    OffsetPagination::from_params_with_default(params, state.config().default_limit)
}

/// Applies the shared offset-page rules: 404 past the end, record links,
/// lookahead trim and neighbour links.
/// The `name` narrowing, if any, as a link parameter.
fn name_extra(params: &QueryParams) -> Option<(&'static str, String)> {
    params.get("name").map(|name| ("name", name.to_string()))
}

fn finish_offset_page(
    pagination: &OffsetPagination,
    mut page: HateoasLogCollection,
    path: &str,
    extras: &[(&str, String)],
) -> Result<HateoasLogCollection, LogError> {
    pagination.ensure_page_exists(&page)?;
    page.set_log_links();
    pagination.apply_links(&mut page, path, extras);
    debug!(path, page = pagination.page(), returned = page.len(), "offset page served");
    Ok(page)
}

/// Handle GET /health - health check endpoint.
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle GET /logs - cursor-paginated stream of all logs.
pub async fn get_logs(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(LOGS_ERROR);
    let params = QueryParams::parse(query.as_deref());

    let mut filter = QueryFilter::new();
    set_filter_timestamp(&params, &mut filter).map_err(&map_err)?;
    set_filter_cursor(&params, &mut filter).map_err(&map_err)?;
    let pagination =
        CursorPagination::from_params_with_default(&params, state.config().default_limit)
            .map_err(&map_err)?;

    let mut logs = state
        .logs()
        .get_cursor_paginated_logs(pagination.limit(), filter, None)
        .await
        .map_err(&map_err)?;

    logs.set_log_links();
    pagination.apply_links(&mut logs, "/logs");
    Ok(Json(logs))
}

/// Handle GET /logs/events - fired events, offset-paginated.
pub async fn get_events(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(EVENT_LOGS_ERROR);
    let params = QueryParams::parse(query.as_deref());

    let mut filter = QueryFilter::new().with_message(EVENT_FIRED_MESSAGE);
    set_filter_timestamp(&params, &mut filter).map_err(&map_err)?;
    set_filter_name(&params, &mut filter, NameScope::Events);
    let pagination = offset_pagination(&state, &params).map_err(&map_err)?;

    let page = state
        .logs()
        .get_offset_paginated_logs(pagination.offset(), pagination.limit().get(), filter, None)
        .await
        .map_err(&map_err)?;

    let extras: Vec<(&str, String)> = name_extra(&params).into_iter().collect();
    finish_offset_page(&pagination, page, "/logs/events", &extras)
        .map(Json)
        .map_err(map_err)
}

/// Handle GET /logs/functions - per-function status, offset-paginated.
pub async fn get_functions(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(FUNCTION_LOGS_ERROR);
    let params = QueryParams::parse(query.as_deref());

    let mut filter = QueryFilter::new();
    set_filter_timestamp(&params, &mut filter).map_err(&map_err)?;
    set_filter_name(&params, &mut filter, NameScope::Functions);
    let ids = set_filter_func_ids(&params, &mut filter);
    let pagination = offset_pagination(&state, &params).map_err(&map_err)?;

    let page = state
        .logs()
        .get_functions_status(filter, pagination.offset(), pagination.limit().get())
        .await
        .map_err(&map_err)?;

    let extras: Vec<(&str, String)> = ids
        .into_iter()
        .map(|id| ("id", id))
        .chain(name_extra(&params))
        .collect();
    finish_offset_page(&pagination, page, "/logs/functions", &extras)
        .map(Json)
        .map_err(map_err)
}

/// Handle GET /logs/events/{eventId} - status of every function an event
/// triggered.
pub async fn get_event(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventFunctions>> {
    let map_err = ApiError::or_internal(EVENT_LOGS_ERROR);
    let filter = QueryFilter::new().with_event_id(event_id.clone());

    let mut status = state
        .logs()
        .get_functions_status(filter, 0, None)
        .await
        .map_err(&map_err)?;
    status.set_log_links();

    Ok(Json(EventFunctions {
        event_id,
        logs: status.logs,
    }))
}

/// Handle GET /logs/functions/{funcId} - every log of one function.
pub async fn get_function(
    State(state): State<Arc<ApiState>>,
    Path(func_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(FUNCTION_LOGS_ERROR);
    let params = QueryParams::parse(query.as_deref());
    let pagination = offset_pagination(&state, &params).map_err(&map_err)?;
    let filter = QueryFilter::new().with_func_id(func_id.clone());

    let page = state
        .logs()
        .get_offset_paginated_logs(pagination.offset(), pagination.limit().get(), filter, None)
        .await
        .map_err(&map_err)?;

    pagination.ensure_page_exists(&page).map_err(&map_err)?;
    if page.is_empty() {
        return Err(ApiError::NotFound(FUNCTION_NOT_FOUND.to_string()));
    }

    let path = format!("/logs/functions/{func_id}");
    finish_offset_page(&pagination, page, &path, &[])
        .map(Json)
        .map_err(map_err)
}

/// Handle GET /logs/errors - error-level logs, newest first.
pub async fn get_errors(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(ERROR_LOGS_ERROR);
    let params = QueryParams::parse(query.as_deref());

    let mut filter = QueryFilter::new().with_level(LogLevel::Error);
    set_filter_timestamp(&params, &mut filter).map_err(&map_err)?;
    let pagination = offset_pagination(&state, &params).map_err(&map_err)?;

    let page = state
        .logs()
        .get_offset_paginated_logs(
            pagination.offset(),
            pagination.limit().get(),
            filter,
            Some(SortOrder::TIMESTAMP_DESC),
        )
        .await
        .map_err(&map_err)?;

    finish_offset_page(&pagination, page, "/logs/errors", &[])
        .map(Json)
        .map_err(map_err)
}

/// Handle GET /logs/dead-letter - jobs moved to the dead-letter queue,
/// newest first.
pub async fn get_dead_letter(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<HateoasLogCollection>> {
    let map_err = ApiError::or_internal(DEAD_LETTER_ERROR);
    let params = QueryParams::parse(query.as_deref());

    let (filter, dead_letter_type) = dead_letter_filter(&params).map_err(&map_err)?;
    let pagination = offset_pagination(&state, &params).map_err(&map_err)?;

    let page = state
        .logs()
        .get_offset_paginated_logs(
            pagination.offset(),
            pagination.limit().get(),
            filter,
            Some(SortOrder::TIMESTAMP_DESC),
        )
        .await
        .map_err(&map_err)?;

    let extras = [("type", dead_letter_type.as_str().to_string())];
    finish_offset_page(&pagination, page, "/logs/dead-letter", &extras)
        .map(Json)
        .map_err(map_err)
}
