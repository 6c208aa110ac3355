//! HTTP session flow against an in-memory document store

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use workflow_designer::{api::AppState, server::build_router, storage::WorkflowStorage, CatalogRegistry};

async fn app() -> Router {
    let storage = WorkflowStorage::in_memory().await.unwrap();
    build_router(AppState::new(CatalogRegistry::default(), storage))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn event(app: &Router, session: &str, event: Value) -> (StatusCode, Value) {
    call(app, Method::POST, &format!("/api/sessions/{}/events", session), Some(event)).await
}

#[tokio::test]
async fn test_healthz() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_search_and_template_import() {
    let app = app().await;

    let (status, entries) = call(&app, Method::GET, "/api/catalog?q=t", None).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["defaultLabel"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Start", "Task"]);

    let (status, imported) = call(
        &app,
        Method::POST,
        "/api/catalog/templates",
        Some(json!([{"node": "Fetch user", "retryCount": 3}, {"node": "Task"}])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(imported["registered"], 1);
    assert_eq!(imported["total"], 5);

    let (status, _) = call(&app, Method::POST, "/api/catalog/templates", Some(json!("not a template"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_edit_save_and_reopen() {
    let app = app().await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({"name": "Orders", "key": {"market": "uk"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session = created["id"].as_str().unwrap().to_string();

    let (_, first) = event(&app, &session, json!({"event": "drop_node", "nodeType": "start", "x": 10, "y": 10})).await;
    let (_, second) = event(&app, &session, json!({"event": "drop_node", "nodeType": "task", "x": 10, "y": 120})).await;
    let a = first["effect"]["node"]["id"].as_str().unwrap().to_string();
    let b = second["effect"]["node"]["id"].as_str().unwrap().to_string();

    event(&app, &session, json!({"event": "connect_start", "nodeId": a})).await;
    let (status, connected) = event(&app, &session, json!({"event": "connect_release", "targetId": b})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(connected["effect"]["kind"], "edge_added");

    event(&app, &session, json!({"event": "connect_start", "nodeId": a})).await;
    let (status, _) = event(&app, &session, json!({"event": "connect_release", "targetId": b})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = event(&app, &session, json!({"event": "drop_node", "nodeType": "robot", "x": 0, "y": 0})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, selected) = event(&app, &session, json!({"event": "click_node", "nodeId": b})).await;
    assert_eq!(selected["panel"]["state"], "editing");
    event(&app, &session, json!({"event": "edit_label", "label": "Fetch orders"})).await;
    let (status, saved) = event(&app, &session, json!({"event": "save_node"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["effect"]["node"]["label"], "Fetch orders");

    let (status, view) = call(&app, Method::GET, &format!("/api/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["workflowKey"], "ORDERS_UK");
    assert_eq!(view["graph"]["edges"].as_array().unwrap().len(), 1);

    let (status, saved) = call(&app, Method::POST, &format!("/api/sessions/{}/save", session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["key"], "ORDERS_UK");

    let (_, listed) = call(&app, Method::GET, "/api/workflows", None).await;
    assert_eq!(listed["workflows"][0]["key"], "ORDERS_UK");

    let (status, document) = call(&app, Method::GET, "/api/workflows/ORDERS_UK", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["workflow"][1]["nodeName"], "Fetch orders");

    let (status, reopened) = call(&app, Method::POST, "/api/workflows/ORDERS_UK/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(reopened["id"], created["id"]);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &format!("/api/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metadata_cascade_reset() {
    let app = app().await;
    let (_, created) = call(&app, Method::POST, "/api/sessions", Some(json!({}))).await;
    let session = created["id"].as_str().unwrap();
    let uri = format!("/api/sessions/{}/metadata", session);

    call(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"name": "Checkout", "key": {"market": "uk", "language": "en", "client": "acme"}})),
    )
    .await;
    let (status, view) = call(&app, Method::PUT, &uri, Some(json!({"keyField": {"field": "language", "value": "fr"}}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["metadata"]["key"]["language"], "fr");
    assert_eq!(view["metadata"]["key"]["client"], "");
    assert_eq!(view["workflowKey"], "CHECKOUT_UK_FR");
}

#[tokio::test]
async fn test_import_hierarchy_document() {
    let app = app().await;
    let (status, created) = call(
        &app,
        Method::POST,
        "/api/sessions/import",
        Some(json!({
            "name": "Imported",
            "workflow": [
                {"nodeName": "Start"},
                {"nodeName": "Fork", "forkTasks": [{"nodeName": "A"}, {"nodeName": "B"}]},
                {"nodeName": "End"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let session = created["id"].as_str().unwrap();
    let (_, view) = call(&app, Method::GET, &format!("/api/sessions/{}", session), None).await;
    assert_eq!(view["graph"]["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(view["graph"]["edges"].as_array().unwrap().len(), 5);

    let (status, _) = call(&app, Method::POST, "/api/sessions/import", Some(json!({"name": "Empty"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_session_and_workflow() {
    let app = app().await;
    let missing = "00000000-0000-4000-8000-000000000000";
    let (status, _) = call(&app, Method::GET, &format!("/api/sessions/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::DELETE, "/api/workflows/NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::POST, &format!("/api/sessions/{}/save", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
