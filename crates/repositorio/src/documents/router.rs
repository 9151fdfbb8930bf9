use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{DocumentDraft, DocumentId, UserId};
use super::listing::ListingFilters;
use super::policy::{Caller, RoleGrant};
use super::repository::{DocumentStore, RoleDirectory, StoreError};
use super::service::{DocumentService, DocumentServiceError};

/// Header carrying the identity provider's user id for the current request.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: RoleGrant,
}

/// Router builder exposing the repository's read and write endpoints.
pub fn document_router<S, R>(service: Arc<DocumentService<S, R>>) -> Router
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/documents",
            get(list_handler::<S, R>).post(create_handler::<S, R>),
        )
        .route("/api/v1/documents/export", get(export_handler::<S, R>))
        .route(
            "/api/v1/documents/:document_id",
            get(detail_handler::<S, R>)
                .put(update_handler::<S, R>)
                .delete(delete_handler::<S, R>),
        )
        .route(
            "/api/v1/projects/:project_code/timeline",
            get(timeline_handler::<S, R>),
        )
        .route("/api/v1/statistics", get(statistics_handler::<S, R>))
        .route("/api/v1/users/:user_id/role", put(role_handler::<S, R>))
        .with_state(service)
}

fn resolve_caller<S, R>(
    service: &DocumentService<S, R>,
    headers: &HeaderMap,
) -> Result<Caller, DocumentServiceError>
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()));
    service.caller_for(user_id)
}

pub(crate) async fn list_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Query(filters): Query<ListingFilters>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let today = Local::now().date_naive();
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.list(&caller, &filters, today));
    match result {
        Ok(documents) => (StatusCode::OK, axum::Json(documents)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Query(filters): Query<ListingFilters>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let today = Local::now().date_naive();
    let mut body = Vec::new();
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.export_csv(&caller, &filters, today, &mut body));
    match result {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let today = Local::now().date_naive();
    let id = DocumentId(document_id);
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.detail(&caller, &id, today));
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<DocumentDraft>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.create(&caller, draft, Utc::now()));
    match result {
        Ok(document) => (StatusCode::CREATED, axum::Json(document)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
    axum::Json(draft): axum::Json<DocumentDraft>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let id = DocumentId(document_id);
    let result =
        resolve_caller(&service, &headers).and_then(|caller| service.update(&caller, &id, draft));
    match result {
        Ok(document) => (StatusCode::OK, axum::Json(document)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let id = DocumentId(document_id);
    let result =
        resolve_caller(&service, &headers).and_then(|caller| service.delete(&caller, &id));
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn timeline_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Path(project_code): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.timeline(&caller, &project_code));
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn statistics_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let today = Local::now().date_naive();
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.statistics(&caller, today));
    match result {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn role_handler<S, R>(
    State(service): State<Arc<DocumentService<S, R>>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<RoleChangeRequest>,
) -> Response
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    let target = UserId(user_id);
    let result = resolve_caller(&service, &headers)
        .and_then(|caller| service.change_role(&caller, &target, request.role));
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// Status mapping shared by every handler and by `AppError`.
pub(crate) fn error_response(err: DocumentServiceError) -> Response {
    let status = match &err {
        DocumentServiceError::Unauthorized(_) | DocumentServiceError::Forbidden { .. } => {
            StatusCode::FORBIDDEN
        }
        DocumentServiceError::NotFound(_) | DocumentServiceError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        DocumentServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        DocumentServiceError::InvalidDraft(_) | DocumentServiceError::InvalidShape(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DocumentServiceError::Linkage(_)
        | DocumentServiceError::Store(StoreError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
        DocumentServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
