use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::documents::router::USER_ID_HEADER;
use crate::documents::DocumentService;

fn get(uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id);
    }
    builder.body(Body::empty()).expect("request")
}

fn send_json(method: &str, uri: &str, user_id: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user_id)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn anonymous_listing_is_empty() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(get("/api/v1/documents", None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!([]));
}

#[tokio::test]
async fn listing_applies_query_filters() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(get(
            "/api/v1/documents?category=convenios&validity=vencido",
            Some(READER),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "conv-expired");
    assert_eq!(rows[0]["validity"], "vencido");
}

#[tokio::test]
async fn reader_cannot_create_documents() {
    let (service, store, _) = build_service();
    let app = router_with_service(service);

    let payload = serde_json::to_value(master_draft("Huertas")).expect("draft json");
    let response = app
        .oneshot(send_json("POST", "/api/v1/documents", READER, payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn admin_creates_master_project() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let payload = json!({
        "title": "Huertas escolares",
        "details": {
            "type": "proyecto",
            "extension_doc_type": "proyecto_de_extension",
            "objective": "Promover huertas",
        }
    });
    let response = app
        .oneshot(send_json("POST", "/api/v1/documents", ADMIN, payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["details"]["type"], "proyecto");
    let code = body["details"]["project_code"]
        .as_str()
        .expect("issued project code");
    assert!(code.starts_with("FCA-EXT-"));
    assert_eq!(body["uploaded_by"], ADMIN);
}

#[tokio::test]
async fn untitled_draft_is_unprocessable() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let payload = json!({
        "title": "",
        "details": { "type": "otro" }
    });
    let response = app
        .oneshot(send_json("POST", "/api/v1/documents", ADMIN, payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn hidden_and_unknown_documents_read_as_missing() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let hidden = app
        .clone()
        .oneshot(get("/api/v1/documents/approval-1", Some(READER)))
        .await
        .expect("response");
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let unknown = app
        .oneshot(get("/api/v1/documents/nope", Some(ADMIN)))
        .await
        .expect("response");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_includes_inherited_context() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(get("/api/v1/documents/approval-1", Some(AUTHORITY)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["context"]["objective"], "Mejorar suelos");
    assert_eq!(body["can_edit"], false);
    assert_eq!(body["timeline"]["master_id"], "master-1");
}

#[tokio::test]
async fn statistics_require_elevated_role() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let denied = app
        .clone()
        .oneshot(get("/api/v1/statistics", Some(READER)))
        .await
        .expect("response");
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let granted = app
        .oneshot(get("/api/v1/statistics", Some(ADMIN)))
        .await
        .expect("response");
    assert_eq!(granted.status(), StatusCode::OK);
    let body = read_json_body(granted).await;
    assert_eq!(body["total"], 7);
}

#[tokio::test]
async fn self_demotion_is_forbidden() {
    let (service, _, roles) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/v1/users/{ADMIN}/role"),
            ADMIN,
            json!({ "role": "user" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(roles.writes(), 0);
}

#[tokio::test]
async fn export_returns_csv() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(get("/api/v1/documents/export?category=movilidad", Some(READER)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("text/csv; charset=utf-8"))
    );
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8(body.to_vec()).expect("utf8");
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("mobility-1"));
}

#[tokio::test]
async fn timeline_handler_reports_bad_gateway_when_store_is_down() {
    let service = Arc::new(DocumentService::new(
        Arc::new(UnavailableStore),
        Arc::new(seeded_roles()),
    ));

    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static(ADMIN));
    let response = crate::documents::router::timeline_handler::<UnavailableStore, MemoryRoles>(
        State(service),
        headers,
        Path(PROJECT_CODE.to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
