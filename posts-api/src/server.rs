use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::infrastructure::settings::Settings;
use crate::presentation::middleware::cors::apply_cors;
use crate::presentation::middleware::limits::apply_limits;
use crate::presentation::middleware::request_id::apply_request_id;
use crate::presentation::middleware::trace::apply_trace;
use crate::presentation::openapi::ApiDoc;
use crate::presentation::{AppState, routes};

pub(crate) async fn run_http(settings: &Settings, state: AppState) -> Result<()> {
    let app = build_app(state, settings)?;

    let listener = TcpListener::bind(&settings.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http_addr))?;

    info!("HTTP server listening on {}", settings.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Routes plus the full middleware stack, outermost last.
pub(crate) fn build_app(state: AppState, settings: &Settings) -> Result<Router> {
    let app = build_router(state);
    let app = apply_limits(app, settings);
    let app = apply_trace(app);
    let app = apply_request_id(app);
    apply_cors(app, settings)
}

pub(crate) fn build_router(state: AppState) -> Router {
    routes::router(state)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::build_app;
    use crate::application::health_service::{DatabaseProbe, HealthService};
    use crate::application::post_service::PostService;
    use crate::data::repositories::memory::post_repository::InMemoryPostRepository;
    use crate::domain::error::DomainError;
    use crate::infrastructure::settings::Settings;
    use crate::presentation::AppState;

    struct StaticProbe {
        up: bool,
    }

    #[async_trait]
    impl DatabaseProbe for StaticProbe {
        async fn ping(&self) -> Result<(), DomainError> {
            if self.up {
                Ok(())
            } else {
                Err(DomainError::Storage("connection refused".to_string()))
            }
        }
    }

    fn test_settings() -> Settings {
        let env: HashMap<&str, &str> =
            HashMap::from([("DATABASE_URL", "postgres://localhost/posts")]);
        Settings::from_lookup(|key| env.get(key).map(|value| value.to_string()))
            .expect("test settings must parse")
    }

    fn app_with_probe(up: bool) -> (Router, InMemoryPostRepository) {
        let repo = InMemoryPostRepository::new();
        let state = AppState::new(
            Arc::new(PostService::new(Arc::new(repo.clone()))),
            Arc::new(HealthService::new(
                Arc::new(StaticProbe { up }),
                Duration::from_millis(100),
            )),
        );
        let app = build_app(state, &test_settings()).expect("app must build");
        (app, repo)
    }

    fn app() -> (Router, InMemoryPostRepository) {
        app_with_probe(true)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request must build");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body must be readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body must be json")
        };
        (status, headers, json)
    }

    async fn create(app: &Router, content: &str) -> String {
        let (status, _, body) = send(
            app,
            Method::POST,
            "/v1/posts",
            Some(json!({ "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["post_id"]
            .as_str()
            .expect("post_id must be returned")
            .to_string()
    }

    #[tokio::test]
    async fn create_returns_envelope_and_request_id() {
        let (app, _) = app();

        let (status, headers, body) = send(
            &app,
            Method::POST,
            "/v1/posts",
            Some(json!({ "content": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "new post created");
        assert_eq!(body["data"]["content"], "hello");
        assert!(body["data"]["created_at"].is_string());
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let (app, _) = app();
        let request = Request::builder()
            .uri("/v1/posts")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .expect("request must build");

        let response = app.oneshot(request).await.expect("router is infallible");

        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.as_bytes()),
            Some("abc-123".as_bytes())
        );
    }

    #[tokio::test]
    async fn create_rejects_missing_content() {
        let (app, repo) = app();

        let (status, _, body) = send(&app, Method::POST, "/v1/posts", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status_code"], 400);

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/v1/posts",
            Some(json!({ "content": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(repo.len(), 0);
    }

    #[tokio::test]
    async fn whitespace_content_is_stored_verbatim() {
        let (app, _) = app();
        let post_id = create(&app, "  indented code\n").await;

        let (status, _, body) =
            send(&app, Method::GET, &format!("/v1/posts/{post_id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "  indented code\n");

        create(&app, " ").await;
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/posts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request must build");

        let response = app.oneshot(request).await.expect("router is infallible");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_paginates_with_metadata() {
        let (app, _) = app();
        for content in ["a", "b", "c", "d", "e"] {
            create(&app, content).await;
        }

        let (status, _, body) = send(&app, Method::GET, "/v1/posts?limit=2&page=2", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "posts retrieved");
        assert_eq!(body["data"]["current_page"], 2);
        assert_eq!(body["data"]["total_rows"], 5);
        assert_eq!(body["data"]["total_pages"], 3);
        let contents: Vec<&str> = body["data"]["data"]
            .as_array()
            .expect("data must be an array")
            .iter()
            .filter_map(|post| post["content"].as_str())
            .collect();
        assert_eq!(contents, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn list_applies_sort_filter_and_search() {
        let (app, _) = app();
        for content in ["apple pie", "apple tart", "banana"] {
            create(&app, content).await;
        }

        let (_, _, body) = send(
            &app,
            Method::GET,
            "/v1/posts?search=content.apple&sort=content.desc",
            None,
        )
        .await;
        let contents: Vec<&str> = body["data"]["data"]
            .as_array()
            .expect("data must be an array")
            .iter()
            .filter_map(|post| post["content"].as_str())
            .collect();
        assert_eq!(contents, vec!["apple tart", "apple pie"]);

        let (_, _, body) = send(
            &app,
            Method::GET,
            "/v1/posts?filter=content.banana",
            None,
        )
        .await;
        assert_eq!(body["data"]["total_rows"], 1);
    }

    #[tokio::test]
    async fn malformed_query_never_reaches_storage() {
        let (app, repo) = app();

        for uri in [
            "/v1/posts?sort=content",
            "/v1/posts?sort=title.asc",
            "/v1/posts?limit=101",
            "/v1/posts?page=abc",
            "/v1/posts?filter=created_at.2024",
        ] {
            let (status, _, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["status_code"], 400, "{uri}");
        }

        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn get_update_and_missing_post() {
        let (app, _) = app();
        let post_id = create(&app, "first").await;

        let (status, _, body) = send(&app, Method::GET, &format!("/v1/posts/{post_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "first");

        let (status, _, body) = send(
            &app,
            Method::PUT,
            &format!("/v1/posts/{post_id}"),
            Some(json!({ "content": "second" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "post updated");
        assert_eq!(body["data"]["content"], "second");

        let (status, _, body) = send(&app, Method::GET, "/v1/posts/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status_code"], 404);

        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/v1/posts/missing",
            Some(json!({ "content": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let (app, repo) = app();

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/v1/posts/unknown-id",
            Some(json!({ "content": "fresh" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let minted = body["data"]["post_id"].as_str().expect("post_id").to_string();
        assert_ne!(minted, "unknown-id");

        let (status, _, body) = send(
            &app,
            Method::POST,
            &format!("/v1/posts/{minted}"),
            Some(json!({ "content": "edited" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["post_id"], minted.as_str());
        assert_eq!(body["data"]["content"], "edited");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn soft_and_hard_delete() {
        let (app, repo) = app();
        let hidden = create(&app, "hidden").await;
        let removed = create(&app, "removed").await;

        let (status, _, body) = send(
            &app,
            Method::DELETE,
            &format!("/v1/posts/{hidden}?mode=soft"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "post deleted");
        assert!(body.get("data").is_none());

        let (status, _, _) =
            send(&app, Method::DELETE, &format!("/v1/posts/{removed}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = send(&app, Method::GET, "/v1/posts", None).await;
        assert_eq!(body["data"]["total_rows"], 0);
        assert_eq!(repo.len(), 1);

        let (status, _, _) =
            send(&app, Method::DELETE, &format!("/v1/posts/{removed}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_delete_mode_is_bad_request() {
        let (app, repo) = app();
        let post_id = create(&app, "keep").await;

        let (status, _, _) = send(
            &app,
            Method::DELETE,
            &format!("/v1/posts/{post_id}?mode=purge"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        let (app, repo) = app();
        repo.fail_next("list_posts");

        let (status, _, body) = send(&app, Method::GET, "/v1/posts", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal error");
    }

    #[tokio::test]
    async fn health_reflects_database_probe() {
        let (app, _) = app();
        let (status, _, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "up");

        let (app, _) = app_with_probe(false);
        let (status, _, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "down");
        assert_eq!(body["checks"][0]["name"], "database");
    }
}
