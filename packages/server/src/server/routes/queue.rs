//! REST endpoints under `/api/queue`.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::EntryId;
use crate::domains::queue::{
    Entry, EntryPatch, ListOrder, NewEntry, QueueError, QueueResult, VoteDirection,
};
use crate::server::app::AxumAppState;
use crate::server::middleware::ClientIp;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    order: Option<ListOrder>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    after: Option<EntryId>,
    #[serde(default)]
    before: Option<EntryId>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    direction: VoteDirection,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    status: &'static str,
    deactivated: Vec<EntryId>,
}

fn parse_id(raw: &str) -> QueueResult<EntryId> {
    raw.parse().map_err(|_| {
        QueueError::validation("INVALID_ID", format!("{} is not a valid entry id", raw))
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> QueueResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| QueueError::validation("INVALID_BODY", rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> QueueResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| QueueError::validation("INVALID_QUERY", rejection.body_text()))
}

/// GET /api/queue?order=position|votes
pub async fn list_entries_handler(
    Extension(state): Extension<AxumAppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> QueueResult<Json<Vec<Entry>>> {
    let params = query(params)?;
    Ok(Json(state.queue.list(params.order)))
}

/// POST /api/queue
pub async fn create_entry_handler(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> QueueResult<(StatusCode, Json<Entry>)> {
    let entry = state.queue.add_entry(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/queue/:id
pub async fn get_entry_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
) -> QueueResult<Json<Entry>> {
    Ok(Json(state.queue.get(parse_id(&id)?)?))
}

/// PATCH /api/queue/:id
pub async fn update_entry_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> QueueResult<Json<Entry>> {
    let id = parse_id(&id)?;
    let entry = state.queue.update_entry(id, body(payload)?).await?;
    Ok(Json(entry))
}

/// DELETE /api/queue/:id
pub async fn delete_entry_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
) -> QueueResult<StatusCode> {
    state.queue.remove_entry(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/queue/:id/move
pub async fn move_entry_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> QueueResult<Json<Entry>> {
    let id = parse_id(&id)?;
    let MoveRequest { after, before } = body(payload)?;
    Ok(Json(state.queue.move_entry(id, after, before).await?))
}

/// POST /api/queue/:id/vote
pub async fn vote_entry_handler(
    Extension(state): Extension<AxumAppState>,
    client: Option<Extension<ClientIp>>,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> QueueResult<Json<Entry>> {
    let identity = client
        .map(|Extension(ip)| ip)
        .unwrap_or(ClientIp(None))
        .identity();
    let id = parse_id(&id)?;
    let VoteRequest { direction } = body(payload)?;
    Ok(Json(state.queue.vote(&identity, id, direction).await?))
}

/// POST /api/queue/:id/activate
pub async fn activate_entry_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
) -> QueueResult<Json<Entry>> {
    Ok(Json(state.queue.activate(parse_id(&id)?).await?))
}

/// POST /api/queue/deactivate
pub async fn deactivate_all_handler(
    Extension(state): Extension<AxumAppState>,
) -> QueueResult<Json<DeactivateResponse>> {
    let deactivated = state.queue.deactivate_all().await?;
    Ok(Json(DeactivateResponse {
        status: "stopped",
        deactivated,
    }))
}

/// GET /api/queue/history?limit=n
pub async fn history_handler(
    Extension(state): Extension<AxumAppState>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> QueueResult<Json<Vec<Entry>>> {
    let params = query(params)?;
    Ok(Json(state.queue.history(params.limit)))
}
