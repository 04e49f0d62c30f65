//! In-memory stand-in for the Postgres repository, used by service and
//! router tests. It follows the same scoping and query rules as the SQL
//! implementation.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::data::post_repository::{NewPost, PostPage, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::query::{PostField, PostQuery, SortDirection};

#[derive(Default)]
struct State {
    rows: Vec<Post>,
    next_id: i64,
    clock: i64,
    fail_next: Option<&'static str>,
    calls: Vec<&'static str>,
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryPostRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryPostRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes the next call to `operation` fail with a storage error.
    pub(crate) fn fail_next(&self, operation: &'static str) {
        self.lock().fail_next = Some(operation);
    }

    /// Names of repository operations invoked so far, in order.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().rows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("in-memory repo mutex poisoned")
    }

    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>, DomainError> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.fail_next == Some(operation) {
            state.fail_next = None;
            return Err(DomainError::Storage(format!("{operation} failed")));
        }
        Ok(state)
    }
}

impl State {
    /// Strictly increasing timestamps so ordering by `created_at` is
    /// deterministic.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(self.clock)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn list_posts(&self, query: &PostQuery) -> Result<PostPage, DomainError> {
        let state = self.enter("list_posts")?;

        let mut matching: Vec<Post> = state
            .rows
            .iter()
            .filter(|post| !post.is_deleted() && matches_query(post, query))
            .cloned()
            .collect();

        let sort = query.sort();
        matching.sort_by(|a, b| {
            let ordering = compare_by(a, b, sort.field).then(a.id.cmp(&b.id));
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total_rows = matching.len() as i64;
        let posts = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect();

        Ok(PostPage::new(posts, query, total_rows))
    }

    async fn get_by_public_id(&self, post_id: &str) -> Result<Post, DomainError> {
        let state = self.enter("get_by_public_id")?;
        state
            .rows
            .iter()
            .find(|post| post.post_id == post_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, DomainError> {
        let state = self.enter("get_by_id")?;
        state
            .rows
            .iter()
            .find(|post| post.id == id && !post.is_deleted())
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("post #{id}")))
    }

    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let mut state = self.enter("create_post")?;
        if state.rows.iter().any(|post| post.post_id == input.post_id) {
            return Err(DomainError::Storage("post_id already exists".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        let now = state.tick();
        let post = Post::new(id, input.post_id, input.content, now, now, None)?;
        state.rows.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, DomainError> {
        let mut state = self.enter("update_post")?;
        let now = state.tick();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == post.id)
            .ok_or_else(|| DomainError::NotFound(format!("post id: {}", post.post_id)))?;

        row.content = post.content.clone();
        row.deleted_at = post.deleted_at;
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn soft_delete_post(&self, post: &Post) -> Result<Post, DomainError> {
        let mut state = self.enter("soft_delete_post")?;
        let now = state.tick();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == post.id)
            .ok_or_else(|| DomainError::NotFound(format!("post id: {}", post.post_id)))?;

        if row.deleted_at.is_none() {
            row.deleted_at = Some(now);
        }
        Ok(row.clone())
    }

    async fn hard_delete_post(&self, post: &Post) -> Result<(), DomainError> {
        let mut state = self.enter("hard_delete_post")?;
        let before = state.rows.len();
        state.rows.retain(|row| row.id != post.id);
        if state.rows.len() == before {
            return Err(DomainError::NotFound(format!("post id: {}", post.post_id)));
        }
        Ok(())
    }
}

fn matches_query(post: &Post, query: &PostQuery) -> bool {
    let filters_match = query
        .filter()
        .iter()
        .all(|(field, value)| text_of(post, *field) == Some(value.as_str()));

    let search_matches = query.search().is_empty()
        || query
            .search()
            .iter()
            .any(|(field, term)| text_of(post, *field).is_some_and(|text| text.contains(term.as_str())));

    filters_match && search_matches
}

fn text_of(post: &Post, field: PostField) -> Option<&str> {
    match field {
        PostField::PostId => Some(post.post_id.as_str()),
        PostField::Content => Some(post.content.as_str()),
        PostField::Id | PostField::CreatedAt | PostField::UpdatedAt => None,
    }
}

fn compare_by(a: &Post, b: &Post, field: PostField) -> Ordering {
    match field {
        PostField::Id => a.id.cmp(&b.id),
        PostField::PostId => a.post_id.cmp(&b.post_id),
        PostField::Content => a.content.cmp(&b.content),
        PostField::CreatedAt => a.created_at.cmp(&b.created_at),
        PostField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}
