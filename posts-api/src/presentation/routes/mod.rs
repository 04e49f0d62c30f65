use axum::Router;
use axum::routing::get;

use super::AppState;
use super::handlers::health::health;

pub(crate) mod posts;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1/posts", posts::router())
        .with_state(state)
}
