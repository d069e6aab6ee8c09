pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use middleware::require_auth;
pub use state::{AppState, ShelfRegistry};

/// Builds the API router: public auth routes plus the cookie-protected book routes.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/books",
            get(rest::list_books_handler)
                .post(rest::create_book_handler)
                .delete(rest::delete_all_books_handler),
        )
        .route("/books/reload", post(rest::reload_books_handler))
        .route("/books/from-catalog", post(rest::add_from_catalog_handler))
        .route(
            "/books/{id}",
            patch(rest::update_book_handler).delete(rest::delete_book_handler),
        )
        .route("/books/{id}/progress", put(rest::set_progress_handler))
        .route("/books/{id}/toggle-read", post(rest::toggle_read_handler))
        .route("/stats", get(rest::stats_handler))
        .route("/catalog/search", get(rest::search_catalog_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
