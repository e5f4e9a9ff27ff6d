//! Record Routes - Collection and Item Endpoints
//!
//! - `GET    /records/`      list, newest date first
//! - `POST   /records/`      create → 201
//! - `GET    /records/{id}/` retrieve
//! - `PUT    /records/{id}/` full update (`date` required)
//! - `PATCH  /records/{id}/` partial update
//! - `DELETE /records/{id}/` delete → 204
//!
//! Every path is also routed without its trailing slash.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::error::{ApiError, ApiResult};
use super::payload::{RawPayload, UpdateMode};
use super::view::RecordView;
use crate::domain::RecordId;
use crate::ports::{BlobStore, RecordStore};
use crate::usecases::RecordService;

/// Shared state for record handlers.
pub struct ApiState<S: RecordStore, B: BlobStore> {
    pub service: Arc<RecordService<S, B>>,
    /// Prefix for image URLs in responses.
    pub media_base_url: Arc<str>,
}

impl<S: RecordStore, B: BlobStore> Clone for ApiState<S, B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            media_base_url: Arc::clone(&self.media_base_url),
        }
    }
}

impl<S: RecordStore, B: BlobStore> ApiState<S, B> {
    pub fn new(service: Arc<RecordService<S, B>>, media_base_url: &str) -> Self {
        Self {
            service,
            media_base_url: Arc::from(media_base_url),
        }
    }

    fn view(&self, record: &crate::domain::Record) -> RecordView {
        RecordView::new(record, &self.media_base_url)
    }
}

/// Build the record router (unprefixed).
pub fn router<S: RecordStore, B: BlobStore>(state: ApiState<S, B>) -> Router {
    let collection = || get(list_records::<S, B>).post(create_record::<S, B>);
    let item = || {
        get(retrieve_record::<S, B>)
            .put(replace_record::<S, B>)
            .patch(modify_record::<S, B>)
            .delete(delete_record::<S, B>)
    };

    Router::new()
        .route("/records", collection())
        .route("/records/", collection())
        .route("/records/:id", item())
        .route("/records/:id/", item())
        .with_state(state)
}

async fn list_records<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let records = state.service.list().await?;
    Ok(Json(records.iter().map(|r| state.view(r)).collect()))
}

async fn create_record<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
    request: Request,
) -> ApiResult<(StatusCode, Json<RecordView>)> {
    let input = RawPayload::from_request(request).await?.into_create()?;
    let record = state.service.create(input).await?;
    Ok((StatusCode::CREATED, Json(state.view(&record))))
}

async fn retrieve_record<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    let record = state.service.get(parse_id(&id)?).await?;
    Ok(Json(state.view(&record)))
}

async fn replace_record<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Json<RecordView>> {
    update(&state, &id, request, UpdateMode::Full).await
}

async fn modify_record<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Json<RecordView>> {
    update(&state, &id, request, UpdateMode::Partial).await
}

async fn delete_record<S: RecordStore, B: BlobStore>(
    State(state): State<ApiState<S, B>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Shared PUT/PATCH flow: an unknown id is a 404 before the body is read.
async fn update<S: RecordStore, B: BlobStore>(
    state: &ApiState<S, B>,
    id: &str,
    request: Request,
    mode: UpdateMode,
) -> ApiResult<Json<RecordView>> {
    let id = parse_id(id)?;
    state.service.get(id).await?;

    let input = RawPayload::from_request(request).await?.into_update(mode)?;
    let record = state.service.update(id, input).await?;
    Ok(Json(state.view(&record)))
}

fn parse_id(raw: &str) -> ApiResult<RecordId> {
    raw.parse().map_err(|_| ApiError::MalformedId(raw.to_string()))
}
