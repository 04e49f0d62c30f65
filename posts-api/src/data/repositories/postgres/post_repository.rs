use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error};

use crate::data::post_repository::{NewPost, PostPage, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::query::{PostField, PostQuery};

#[derive(Debug, Clone)]
pub(crate) struct PostgresPostRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresPostRepository {
    pub(crate) fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Runs a storage call under the configured deadline. An expired
    /// deadline is reported as a storage failure.
    async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(|err| map_post_db_error(operation, err)),
            Err(_) => {
                error!(
                    operation,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "post query timed out"
                );
                Err(DomainError::Storage(format!("{operation} timed out")))
            }
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    post_id: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list_posts(&self, query: &PostQuery) -> Result<PostPage, DomainError> {
        let mut select = build_select_query(query);
        let rows = self
            .run(
                "list_posts",
                select.build_query_as::<PostRow>().fetch_all(&self.pool),
            )
            .await?;

        let mut count = build_count_query(query);
        let total_rows = self
            .run(
                "count_posts",
                count.build_query_scalar::<i64>().fetch_one(&self.pool),
            )
            .await?;

        let posts = rows
            .into_iter()
            .map(map_row_to_post)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            fetched = posts.len(),
            total_rows,
            page = query.page(),
            limit = query.limit(),
            "posts listed"
        );
        Ok(PostPage::new(posts, query, total_rows))
    }

    async fn get_by_public_id(&self, post_id: &str) -> Result<Post, DomainError> {
        let row = self
            .run(
                "get_by_public_id",
                sqlx::query_as::<_, PostRow>(
                    r#"
                    SELECT id, post_id, content, created_at, updated_at, deleted_at
                    FROM posts
                    WHERE post_id = $1
                    "#,
                )
                .bind(post_id)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(map_row_to_post)
            .transpose()?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, DomainError> {
        let row = self
            .run(
                "get_by_id",
                sqlx::query_as::<_, PostRow>(
                    r#"
                    SELECT id, post_id, content, created_at, updated_at, deleted_at
                    FROM posts
                    WHERE id = $1 AND deleted_at IS NULL
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(map_row_to_post)
            .transpose()?
            .ok_or_else(|| DomainError::NotFound(format!("post #{id}")))
    }

    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let row = self
            .run(
                "create_post",
                sqlx::query_as::<_, PostRow>(
                    r#"
                    INSERT INTO posts (post_id, content)
                    VALUES ($1, $2)
                    RETURNING id, post_id, content, created_at, updated_at, deleted_at
                    "#,
                )
                .bind(&input.post_id)
                .bind(&input.content)
                .fetch_one(&self.pool),
            )
            .await?;

        map_row_to_post(row)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, DomainError> {
        let row = self
            .run(
                "update_post",
                sqlx::query_as::<_, PostRow>(
                    r#"
                    UPDATE posts
                    SET content = $2,
                        deleted_at = $3,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, post_id, content, created_at, updated_at, deleted_at
                    "#,
                )
                .bind(post.id)
                .bind(&post.content)
                .bind(post.deleted_at)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(map_row_to_post)
            .transpose()?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {}", post.post_id)))
    }

    async fn soft_delete_post(&self, post: &Post) -> Result<Post, DomainError> {
        let row = self
            .run(
                "soft_delete_post",
                sqlx::query_as::<_, PostRow>(
                    r#"
                    UPDATE posts
                    SET deleted_at = COALESCE(deleted_at, NOW())
                    WHERE id = $1
                    RETURNING id, post_id, content, created_at, updated_at, deleted_at
                    "#,
                )
                .bind(post.id)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(map_row_to_post)
            .transpose()?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {}", post.post_id)))
    }

    async fn hard_delete_post(&self, post: &Post) -> Result<(), DomainError> {
        let result = self
            .run(
                "hard_delete_post",
                sqlx::query(
                    r#"
                    DELETE FROM posts
                    WHERE id = $1
                    "#,
                )
                .bind(post.id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("post id: {}", post.post_id)));
        }
        Ok(())
    }
}

fn build_select_query(query: &PostQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id, post_id, content, created_at, updated_at, deleted_at FROM posts",
    );
    push_list_conditions(&mut builder, query);

    let sort = query.sort();
    builder
        .push(" ORDER BY ")
        .push(sort.field.column())
        .push(" ")
        .push(sort.direction.as_sql());
    // equal sort keys would otherwise make page boundaries unstable
    if sort.field != PostField::Id {
        builder.push(", id ").push(sort.direction.as_sql());
    }

    builder
        .push(" LIMIT ")
        .push_bind(i64::from(query.limit()))
        .push(" OFFSET ")
        .push_bind(query.offset());
    builder
}

fn build_count_query(query: &PostQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM posts");
    push_list_conditions(&mut builder, query);
    builder
}

/// Soft-delete scope, then every filter AND-ed, then the search terms as
/// one OR group.
fn push_list_conditions(builder: &mut QueryBuilder<'static, Postgres>, query: &PostQuery) {
    builder.push(" WHERE deleted_at IS NULL");

    for (field, value) in query.filter() {
        builder
            .push(" AND ")
            .push(field.column())
            .push(" = ")
            .push_bind(value.clone());
    }

    if !query.search().is_empty() {
        builder.push(" AND (");
        let mut terms = builder.separated(" OR ");
        for (field, term) in query.search() {
            terms.push(field.column());
            terms.push_unseparated(" LIKE ");
            terms.push_bind_unseparated(like_pattern(term));
        }
        builder.push(")");
    }
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn map_row_to_post(row: PostRow) -> Result<Post, DomainError> {
    Post::new(
        row.id,
        row.post_id,
        row.content,
        row.created_at,
        row.updated_at,
        row.deleted_at,
    )
    .map_err(|err| DomainError::Storage(err.to_string()))
}

fn map_post_db_error(operation: &'static str, err: sqlx::Error) -> DomainError {
    error!(operation, error = %err, "post query failed");

    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23505")
    {
        return DomainError::Storage("post_id already exists".to_string());
    }
    DomainError::Storage(err.to_string())
}
