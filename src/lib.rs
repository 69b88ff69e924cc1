//! Wiki Backend
//!
//! Page and comment management core for a collaborative Markdown wiki, served
//! over REST with a revisioned SQLite document store.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod render;
pub mod store;
pub mod wiki;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AccessGate;
use config::Config;
use render::Renderer;
use store::DocumentStore;
use wiki::{CommentManager, PageManager, WikiDirectory};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pages: PageManager,
    pub comments: CommentManager,
    pub directory: WikiDirectory,
    pub gate: AccessGate,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every manager onto one shared store handle.
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        let renderer = Renderer::default();
        let directory = WikiDirectory::new(store.clone(), config.main_db_name.clone());
        let gate = AccessGate::new(store.clone(), config.main_db_name.clone());
        Self {
            pages: PageManager::new(store.clone(), directory.clone(), renderer),
            comments: CommentManager::new(store, gate.clone(), renderer),
            directory,
            gate,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Wikis
        .route("/wikis", post(api::create_wiki))
        .route("/wikis/{wiki}", get(api::get_wiki))
        .route("/wikis/{wiki}/home", put(api::set_home_page))
        // Pages
        .route(
            "/wikis/{wiki}/pages",
            get(api::list_pages).post(api::create_page),
        )
        .route(
            "/wikis/{wiki}/pages/{page}",
            get(api::get_page)
                .put(api::update_page)
                .delete(api::delete_page),
        )
        .route("/wikis/{wiki}/pages/{page}/children", get(api::child_pages))
        .route(
            "/wikis/{wiki}/pages/{page}/breadcrumbs",
            get(api::page_breadcrumbs),
        )
        .route("/wikis/{wiki}/pages/{page}/history", get(api::page_history))
        .route("/slugs/{wiki_slug}/{page_slug}", get(api::page_by_slug))
        // Comments
        .route(
            "/wikis/{wiki}/pages/{page}/comments",
            get(api::list_comments).post(api::create_comment),
        )
        .route(
            "/wikis/{wiki}/comments/{comment}",
            get(api::get_comment)
                .put(api::update_comment)
                .delete(api::delete_comment),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
