use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::post_service::{DeleteMode, UpsertOutcome};
use crate::data::post_repository::PostPage;
use crate::domain::post::{Post, PostRequest};
use crate::domain::query::PostQuery;
use crate::presentation::AppState;
use crate::presentation::app_error::{AppResult, ErrorBody};
use crate::presentation::response::ApiResponse;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct PostRequestDto {
    #[serde(default)]
    #[validate(length(min = 1, message = "content is required"))]
    pub(crate) content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDto {
    pub(crate) post_id: String,
    pub(crate) content: String,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ListPostsResponseDto {
    pub(crate) current_page: u32,
    pub(crate) total_rows: i64,
    pub(crate) total_pages: i64,
    pub(crate) data: Vec<PostDto>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DeleteModeDto {
    #[default]
    Hard,
    Soft,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeleteQuery {
    #[serde(default)]
    pub(crate) mode: DeleteModeDto,
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.post_id,
            content: post.content,
            created_at: post.created_at,
        }
    }
}

impl From<PostPage> for ListPostsResponseDto {
    fn from(page: PostPage) -> Self {
        Self {
            current_page: page.current_page,
            total_rows: page.total_rows,
            total_pages: page.total_pages,
            data: page.posts.into_iter().map(PostDto::from).collect(),
        }
    }
}

impl From<DeleteModeDto> for DeleteMode {
    fn from(mode: DeleteModeDto) -> Self {
        match mode {
            DeleteModeDto::Hard => DeleteMode::Hard,
            DeleteModeDto::Soft => DeleteMode::Soft,
        }
    }
}

fn into_request(payload: Result<Json<PostRequestDto>, JsonRejection>) -> AppResult<PostRequest> {
    let Json(dto) = payload?;
    dto.validate()?;
    Ok(PostRequest {
        content: dto.content,
    })
}

#[utoipa::path(
    get,
    path = "/v1/posts",
    tag = "posts",
    params(
        ("limit" = Option<u32>, Query, description = "Items per page (1..=100, default 10)"),
        ("page" = Option<u32>, Query, description = "1-based page number (default 1)"),
        ("sort" = Option<String>, Query, description = "`field.asc` or `field.desc`, default `created_at.asc`"),
        ("filter" = Option<String>, Query, description = "`field.value` exact match, repeatable, ANDed"),
        ("search" = Option<String>, Query, description = "`field.term` substring match, repeatable, ORed")
    ),
    responses(
        (status = 200, description = "Posts listed", body = ApiResponse<ListPostsResponseDto>),
        (status = 400, description = "Malformed query", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn list_posts(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<ListPostsResponseDto>>)> {
    let Query(params) = params?;
    let query = PostQuery::from_params(params.iter().map(|(key, value)| (key.as_str(), value.as_str())))?;

    let page = state.post_service.list_posts(&query).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_data(
            "posts retrieved",
            ListPostsResponseDto::from(page),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/posts/{post_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Public post identifier")
    ),
    responses(
        (status = 200, description = "Post found", body = ApiResponse<PostDto>),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<PostDto>>)> {
    let post = state.post_service.get_post(&post_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_data("post retrieved", PostDto::from(post))),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/posts",
    tag = "posts",
    request_body = PostRequestDto,
    responses(
        (status = 201, description = "Post created", body = ApiResponse<PostDto>),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<PostRequestDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<PostDto>>)> {
    let req = into_request(payload)?;
    let post = state.post_service.create_post(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data("new post created", PostDto::from(post))),
    ))
}

#[utoipa::path(
    put,
    path = "/v1/posts/{post_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Public post identifier")
    ),
    request_body = PostRequestDto,
    responses(
        (status = 200, description = "Post updated", body = ApiResponse<PostDto>),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    payload: Result<Json<PostRequestDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<PostDto>>)> {
    let req = into_request(payload)?;
    let post = state.post_service.update_post(&post_id, req).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_data("post updated", PostDto::from(post))),
    ))
}

/// Updates the post when `post_id` resolves, otherwise creates a new one
/// under a freshly generated identifier.
#[utoipa::path(
    post,
    path = "/v1/posts/{post_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Public post identifier")
    ),
    request_body = PostRequestDto,
    responses(
        (status = 200, description = "Existing post updated", body = ApiResponse<PostDto>),
        (status = 201, description = "Post created", body = ApiResponse<PostDto>),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn upsert_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    payload: Result<Json<PostRequestDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<PostDto>>)> {
    let req = into_request(payload)?;

    let (status, message, post) = match state.post_service.upsert_post(&post_id, req).await? {
        UpsertOutcome::Created(post) => (StatusCode::CREATED, "new post created", post),
        UpsertOutcome::Updated(post) => (StatusCode::OK, "post updated", post),
    };

    Ok((
        status,
        Json(ApiResponse::with_data(message, PostDto::from(post))),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/posts/{post_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Public post identifier"),
        ("mode" = Option<DeleteModeDto>, Query, description = "`hard` (default) removes the row, `soft` hides it")
    ),
    responses(
        (status = 200, description = "Post deleted"),
        (status = 400, description = "Unknown delete mode", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<()>>)> {
    let Query(query) = query?;
    state
        .post_service
        .delete_post(&post_id, query.mode.into())
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::message("post deleted"))))
}
