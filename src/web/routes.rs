use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - web interface
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/static/{*path}", get(static_handler))
}

// API Routes - JSON API used by the page
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Connection lifecycle
            .route("/status", get(handlers::api::status))
            .route("/connection/select", post(handlers::api::select_database))
            .route("/connection/connect", post(handlers::api::connect))
            .route("/connection/disconnect", post(handlers::api::disconnect))
            // Saved profiles
            .route("/connections", get(handlers::api::list_connections))
            .route("/connections/{index}/connect", post(handlers::api::connect_saved))
            // Questions and results
            .route("/nl-query", post(handlers::api::nl_query))
            .route("/export/csv", get(handlers::api::export_csv))
            .route("/schema", get(handlers::api::get_schema))
            // History and favorites
            .route("/history", get(handlers::api::list_history))
            .route("/history/{index}/reuse", post(handlers::api::reuse_history))
            .route(
                "/favorites",
                get(handlers::api::list_favorites).post(handlers::api::add_favorite),
            )
            .route("/favorites/{index}", delete(handlers::api::remove_favorite))
            .route("/favorites/{index}/reuse", post(handlers::api::reuse_favorite)),
    )
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ui_routes())
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
