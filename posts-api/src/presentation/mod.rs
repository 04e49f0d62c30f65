use std::sync::Arc;

use crate::application::health_service::HealthService;
use crate::application::post_service::PostService;

pub(crate) mod app_error;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod openapi;
pub(crate) mod response;
pub(crate) mod routes;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) post_service: Arc<PostService>,
    pub(crate) health_service: Arc<HealthService>,
}

impl AppState {
    pub(crate) fn new(post_service: Arc<PostService>, health_service: Arc<HealthService>) -> Self {
        Self {
            post_service,
            health_service,
        }
    }
}
