use std::sync::Arc;

use tracing::info;

use crate::data::post_repository::{NewPost, PostPage, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostRequest, generate_public_id};
use crate::domain::query::PostQuery;

/// Which branch an upsert took.
#[derive(Debug, Clone)]
pub(crate) enum UpsertOutcome {
    Created(Post),
    Updated(Post),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum DeleteMode {
    #[default]
    Hard,
    Soft,
}

pub(crate) struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub(crate) fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Always inserts; a fresh public identifier is minted for every call.
    pub(crate) async fn create_post(&self, req: PostRequest) -> Result<Post, DomainError> {
        let req = req.validate()?;

        let new_post = NewPost {
            post_id: generate_public_id(),
            content: req.content,
        };
        let post = self.repo.create_post(new_post).await?;

        info!(post_id = %post.post_id, "post created");
        Ok(post)
    }

    pub(crate) async fn list_posts(&self, query: &PostQuery) -> Result<PostPage, DomainError> {
        self.repo.list_posts(query).await
    }

    pub(crate) async fn get_post(&self, post_id: &str) -> Result<Post, DomainError> {
        self.repo.get_by_public_id(post_id).await
    }

    pub(crate) async fn update_post(
        &self,
        post_id: &str,
        req: PostRequest,
    ) -> Result<Post, DomainError> {
        let req = req.validate()?;
        let post = self.repo.get_by_public_id(post_id).await?;
        self.overwrite_content(post, req.content).await
    }

    /// Resolves `post_id` first: a missing post is created (under a newly
    /// minted identifier, not `post_id`), an existing one is updated. Any
    /// other lookup failure is returned as is.
    pub(crate) async fn upsert_post(
        &self,
        post_id: &str,
        req: PostRequest,
    ) -> Result<UpsertOutcome, DomainError> {
        let req = req.validate()?;

        match self.repo.get_by_public_id(post_id).await {
            Ok(post) => self
                .overwrite_content(post, req.content)
                .await
                .map(UpsertOutcome::Updated),
            Err(err) if err.is_not_found() => {
                self.create_post(req).await.map(UpsertOutcome::Created)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn delete_post(
        &self,
        post_id: &str,
        mode: DeleteMode,
    ) -> Result<(), DomainError> {
        let post = self.repo.get_by_public_id(post_id).await?;

        match mode {
            DeleteMode::Hard => self.repo.hard_delete_post(&post).await?,
            DeleteMode::Soft => {
                self.repo.soft_delete_post(&post).await?;
            }
        }

        info!(post_id = %post.post_id, ?mode, "post deleted");
        Ok(())
    }

    async fn overwrite_content(&self, mut post: Post, content: String) -> Result<Post, DomainError> {
        post.content = content;
        let post = self.repo.update_post(&post).await?;

        info!(post_id = %post.post_id, "post updated");
        Ok(post)
    }
}
