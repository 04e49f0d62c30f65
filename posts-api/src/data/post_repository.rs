use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::query::PostQuery;

#[derive(Debug, Clone)]
pub(crate) struct NewPost {
    pub(crate) post_id: String,
    pub(crate) content: String,
}

/// One page of a list query together with the row count it was cut from.
#[derive(Debug, Clone)]
pub(crate) struct PostPage {
    pub(crate) posts: Vec<Post>,
    pub(crate) current_page: u32,
    pub(crate) total_rows: i64,
    pub(crate) total_pages: i64,
}

impl PostPage {
    pub(crate) fn new(posts: Vec<Post>, query: &PostQuery, total_rows: i64) -> Self {
        Self {
            posts,
            current_page: query.page(),
            total_rows,
            total_pages: query.total_pages(total_rows),
        }
    }
}

/// Storage access for posts.
///
/// Soft-delete scoping is decided by the method, not by the caller:
/// `list_posts` and `get_by_id` skip soft-deleted rows, `get_by_public_id`
/// returns them, `update_post` and `hard_delete_post` act on the row
/// whatever its deletion state.
#[async_trait]
pub(crate) trait PostRepository: Send + Sync {
    /// Page fetch and row count run as two separate reads; under
    /// concurrent writes they may observe different snapshots.
    async fn list_posts(&self, query: &PostQuery) -> Result<PostPage, DomainError>;
    async fn get_by_public_id(&self, post_id: &str) -> Result<Post, DomainError>;
    async fn get_by_id(&self, id: i64) -> Result<Post, DomainError>;
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError>;
    async fn update_post(&self, post: &Post) -> Result<Post, DomainError>;
    /// Keeps the first deletion timestamp when called again.
    async fn soft_delete_post(&self, post: &Post) -> Result<Post, DomainError>;
    async fn hard_delete_post(&self, post: &Post) -> Result<(), DomainError>;
}
