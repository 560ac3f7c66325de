//! HTTP surface: public sitemap/robots/content reads plus token-gated admin routes.

mod auth;
mod routes;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::app::App;

/// Shared state handed to every handler.
pub struct AppState {
    pub app: App,
    /// Bearer token for admin routes; `None` disables the check
    pub admin_token: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/content", post(routes::create_content))
        .route(
            "/content/:id",
            axum::routing::put(routes::update_content).delete(routes::delete_content),
        )
        .route("/keyword-map", post(routes::map_keyword))
        .route("/keyword-mappings", get(routes::keyword_mappings))
        .route("/cannibalization-check", get(routes::cannibalization_check))
        .route("/orphan-pages", get(routes::orphan_pages))
        .route("/regenerate-links", post(routes::regenerate_links))
        .route("/invalidate-sitemap", post(routes::invalidate_sitemap))
        .route("/quality-report", get(routes::quality_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_token,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::health))
        .route("/sitemap-index.xml", get(routes::sitemap_index))
        .route("/sitemap-core.xml", get(routes::sitemap_core))
        .route("/sitemap-content.xml", get(routes::sitemap_content))
        .route("/robots.txt", get(routes::robots))
        .route("/content", get(routes::list_content))
        .route("/content/:id", get(routes::get_content))
        .route("/internal-links/:content_id", get(routes::internal_links))
        .merge(admin_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
