use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use vibe_store::{catalog, DocumentKind, PreferenceStore, StoreError, DOCUMENTS};

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

// ── App State ──

struct AppState {
    store: PreferenceStore,
}

// ── Error Handling ──

/// Store errors as plain-text responses: validation → 400, unknown document
/// → 404, everything else → 500.
struct AppError(StoreError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::UnknownDocument(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "preference request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

// ── Entrypoint ──

pub async fn serve(store: PreferenceStore, config: ServeConfig) -> anyhow::Result<()> {
    let app = router(store);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "preference server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (for testing without binding to a port).
pub fn router(store: PreferenceStore) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/api/health", get(health))
        .route("/api/preferences", get(list_preferences))
        .route(
            "/api/preferences/{name}",
            get(get_preference).post(put_preference).put(put_preference),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ── GET /api/preferences ──

#[derive(Serialize)]
struct PreferenceEntry {
    key: &'static str,
    file_name: &'static str,
    kind: &'static str,
    exists: bool,
}

async fn list_preferences(State(state): State<Arc<AppState>>) -> Json<Vec<PreferenceEntry>> {
    let entries = DOCUMENTS
        .iter()
        .map(|doc| PreferenceEntry {
            key: doc.key,
            file_name: doc.file_name,
            kind: match doc.kind {
                DocumentKind::Json => "json",
                DocumentKind::Text => "text",
            },
            exists: state.store.exists(doc.file_name),
        })
        .collect();
    Json(entries)
}

// ── GET /api/preferences/{name} ──

async fn get_preference(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let doc = catalog::require(&name)?;
    let body = state.store.read_document(doc)?;
    Ok(([(header::CONTENT_TYPE, doc.content_type())], body).into_response())
}

// ── POST|PUT /api/preferences/{name} ──

async fn put_preference(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: String,
) -> Result<Response, AppError> {
    let doc = catalog::require(&name)?;
    let message = state.store.write_document(doc, &body)?;
    Ok((StatusCode::OK, message).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, body) = send(router(PreferenceStore::new(tmp.path())), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn absent_automations_get_returns_and_persists_default() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(PreferenceStore::new(tmp.path()));

        let resp = app.oneshot(get("/api/preferences/automations")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        let default = vibe_store::AutomationSettings::default();
        let expected =
            serde_json::to_string_pretty(&serde_json::to_value(&default).unwrap()).unwrap();
        assert_eq!(body, expected);
        assert!(body.contains("\n  \"baseBranch\": \"main\""));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("automations.json")).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn post_backfills_and_get_echoes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(tmp.path());

        let (status, body) = send(
            router(store.clone()),
            post("/api/preferences/automations", r#"{"automaticallyCreatePR": true}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Automation settings saved successfully");

        let (_, body) = send(router(store), get("/api/preferences/automations")).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["automaticallyCreatePR"], true);
        assert_eq!(json["mergeDecisionMode"], "always");
        assert_eq!(json["baseBranch"], "main");
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_with_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(PreferenceStore::new(tmp.path()));

        let (status, body) = send(
            app.clone(),
            post("/api/preferences/automations", r#"{"automaticallyMergePR": "yes"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "automaticallyMergePR must be a boolean");

        let (status, body) = send(app, post("/api/preferences/automations", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid JSON format");
        assert!(!tmp.path().join("automations.json").exists());
    }

    #[tokio::test]
    async fn text_documents_round_trip_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(PreferenceStore::new(tmp.path()));

        let request = Request::builder()
            .method("PUT")
            .uri("/api/preferences/coding-standards")
            .body(Body::from("- No panics in library code\n"))
            .unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Coding standards saved successfully");

        let (_, body) = send(app, get("/api/preferences/coding-standards.md")).await;
        assert_eq!(body, "- No panics in library code\n");
    }

    #[tokio::test]
    async fn unknown_document_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, body) = send(
            router(PreferenceStore::new(tmp.path())),
            get("/api/preferences/secrets"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Preference type not found: secrets");
    }

    #[tokio::test]
    async fn list_reports_existence() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(tmp.path());
        store.write_text("project-context.md", "ctx").unwrap();

        let (status, body) = send(router(store), get("/api/preferences")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), DOCUMENTS.len());
        let ctx = entries
            .iter()
            .find(|e| e["key"] == "project-context")
            .unwrap();
        assert_eq!(ctx["exists"], true);
        assert_eq!(ctx["kind"], "text");
        let automations = entries.iter().find(|e| e["key"] == "automations").unwrap();
        assert_eq!(automations["exists"], false);
    }
}
