use utoipa::OpenApi;

use crate::presentation::app_error::ErrorBody;
use crate::presentation::handlers::health::{CheckDto, HealthResponseDto};
use crate::presentation::handlers::posts::{
    DeleteModeDto, ListPostsResponseDto, PostDto, PostRequestDto,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::handlers::health::health,
        crate::presentation::handlers::posts::list_posts,
        crate::presentation::handlers::posts::get_post,
        crate::presentation::handlers::posts::create_post,
        crate::presentation::handlers::posts::update_post,
        crate::presentation::handlers::posts::upsert_post,
        crate::presentation::handlers::posts::delete_post
    ),
    components(
        schemas(
            PostRequestDto,
            PostDto,
            ListPostsResponseDto,
            DeleteModeDto,
            ErrorBody,
            HealthResponseDto,
            CheckDto
        )
    ),
    tags(
        (name = "posts", description = "Post endpoints"),
        (name = "health", description = "Service health")
    )
)]
pub(crate) struct ApiDoc;
