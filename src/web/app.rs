use super::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{IntoMakeService, get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .route("/", get(handlers::root))
        .route(handlers::DOCS_PATH, get(handlers::docs))
        .route(handlers::HEALTH_PATH, get(handlers::health_check))
        .route(handlers::REMOVE_BG_PATH, post(handlers::remove_background))
        // Limit request bodies; uploads are buffered in memory
        .layer(DefaultBodyLimit::max(body_limit))
        // Browsers call the API directly, from any origin
        .layer(CorsLayer::permissive())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}

pub fn create_app(state: AppState) -> IntoMakeService<Router> {
    create_router(state).into_make_service()
}
