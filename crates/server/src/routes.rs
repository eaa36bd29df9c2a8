use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::error;

use webaudit_core::AuditError;

use crate::service::AuditService;

type AppState = Arc<AuditService>;

pub fn build_router(service: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route(
            "/check",
            get(check_get).post(check_post).options(check_preflight),
        )
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(service)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

async fn check_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    url: Option<String>,
    nocache: Option<String>,
    blob: Option<String>,
    id: Option<String>,
}

async fn check_get(
    State(service): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Response {
    if query.blob.is_some() || query.id.is_some() {
        return match service
            .load_snapshot(query.blob.as_deref(), query.id.as_deref())
            .await
        {
            Ok(payload) => Json(payload).into_response(),
            Err(err) => error_response(err),
        };
    }

    let Some(url) = query.url else {
        return Json(json!({"ok": true, "ping": "pong"})).into_response();
    };
    let nocache = query.nocache.as_deref() == Some("1");
    run_audit(service, url, nocache, false).await
}

/// Audits run as detached tasks so a client disconnect never cancels one
/// mid-flight; completed results still populate the cache.
async fn run_audit(service: AppState, url: String, nocache: bool, snapshot: bool) -> Response {
    let task =
        tokio::spawn(async move { service.audit(&url, nocache, snapshot).await });
    match task.await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_err) => error_response(AuditError::Other(anyhow::anyhow!(
            "audit task failed: {join_err}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct CheckBody {
    url: Option<String>,
    #[serde(default)]
    nocache: bool,
    #[serde(default)]
    snapshot: bool,
}

async fn check_post(
    State(service): State<AppState>,
    Json(body): Json<CheckBody>,
) -> Response {
    let Some(url) = body.url else {
        return error_response(AuditError::InvalidUrl("missing url".to_string()));
    };
    run_audit(service, url, body.nocache, body.snapshot).await
}

/// Expected remote misbehavior never reaches here; the orchestrator folds it
/// into the report. Only caller mistakes and real faults become non-200s.
fn error_response(err: AuditError) -> Response {
    let (status, errors) = match &err {
        AuditError::InvalidUrl(msg) => (StatusCode::BAD_REQUEST, vec![msg.clone()]),
        AuditError::SnapshotMissing(tried) => (
            StatusCode::NOT_FOUND,
            tried
                .iter()
                .map(|t| format!("snapshot not found: {t}"))
                .collect(),
        ),
        other => {
            error!(error = %other, "audit request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, vec![other.to_string()])
        }
    };
    (status, Json(json!({"ok": false, "errors": errors}))).into_response()
}
