use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::languages::{
    highlight_language, DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE, EXAMPLE_LANGUAGE,
    LANGUAGES, PHP_EXAMPLES,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let static_dir = &state.config.system_config.static_dir;

    Router::new()
        // WebSocket
        .route("/client-ws", get(websocket_handler))

        // REST API routes
        .route("/api/health", get(health_check))
        .route("/api/languages", get(get_languages))
        .route("/api/examples", get(get_examples))

        // The page itself
        .fallback_service(ServeDir::new(static_dir))
}

/// Full application with request tracing and permissive CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    crate::websocket::websocket_handler(ws, State(state)).await
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.client.model(),
        "sessions": state.sessions.len(),
    }))
}

async fn get_languages() -> Json<Value> {
    let languages: Vec<Value> = LANGUAGES
        .iter()
        .map(|name| json!({"name": name, "token": highlight_language(name)}))
        .collect();

    Json(json!({
        "languages": languages,
        "default_source": DEFAULT_SOURCE_LANGUAGE,
        "default_target": DEFAULT_TARGET_LANGUAGE,
    }))
}

async fn get_examples() -> Json<Value> {
    Json(json!({
        "language": EXAMPLE_LANGUAGE,
        "examples": PHP_EXAMPLES,
    }))
}
