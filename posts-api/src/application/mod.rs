pub(crate) mod health_service;
pub(crate) mod post_service;
