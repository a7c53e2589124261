//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/lesson", get(http::http_get_lesson))
        .route("/api/v1/lesson/complete", post(http::http_post_complete_lesson))
        .route("/api/v1/answer", post(http::http_post_answer))
        .route("/api/v1/dictionary", get(http::http_get_dictionary))
        .route("/api/v1/translate", post(http::http_post_translate))
        .route("/api/v1/speech_to_text", post(http::http_post_speech_to_text))
        .route("/api/v1/text_to_speech", post(http::http_post_text_to_speech))
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/progress/export", get(http::http_get_progress_export))
        .route("/api/v1/progress/import", post(http::http_post_progress_import))
        .route("/api/v1/progress/refill", post(http::http_post_progress_refill))
        .route("/api/v1/progress/reset", post(http::http_post_progress_reset))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::tests::offline_state;

    fn app() -> Router {
        build_router(Arc::new(offline_state()))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = send(app(), Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn lesson_hides_answers() {
        let req = Request::get("/api/v1/lesson?topic=greetings&level=beginner").body(Body::empty()).unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "l-greetings");
        let first = &body["questions"][0];
        assert_eq!(first["kind"], "translate_to_target");
        assert!(first.get("correctAnswer").is_none());
        assert!(first.get("explanation").is_none());
    }

    #[tokio::test]
    async fn answer_endpoint_scores_pronunciation() {
        let req = post_json(
            "/api/v1/answer",
            json!({
                "questionId": "r3",
                "submission": { "type": "transcript", "value": "I wake up at seven" },
                "sensitivity": "strict"
            }),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correct"], false);
        assert_eq!(body["feedbackText"], "The word \"o'clock\" was unclear or missing.");
        assert!(body["similarityScore"].as_f64().unwrap() < 95.0);
        assert_eq!(body["progress"]["hearts"], 4);
    }

    #[tokio::test]
    async fn answer_endpoint_rejects_bad_tiles() {
        let req = post_json(
            "/api/v1/answer",
            json!({ "questionId": "r4", "submission": { "type": "tiles", "value": [0, 0] } }),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_attempt");
    }

    #[tokio::test]
    async fn unknown_question_is_404() {
        let req = post_json(
            "/api/v1/answer",
            json!({ "questionId": "missing", "submission": { "type": "choice", "value": "x" } }),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dictionary_lookup() {
        let req = Request::get("/api/v1/dictionary?word=book").body(Body::empty()).unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entry"]["meaningBn"], "বই");
        assert_eq!(body["source"], "seed");
    }

    #[tokio::test]
    async fn speech_without_provider_is_unavailable() {
        let req = post_json("/api/v1/text_to_speech", json!({ "text": "hello" }));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn progress_import_validates_payload() {
        let req = post_json("/api/v1/progress/import", json!({ "nope": 1 }));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}
