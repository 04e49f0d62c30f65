use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) post_id: String,
    pub(crate) content: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PostRequest {
    pub(crate) content: String,
}

impl PostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        if self.content.is_empty() {
            return Err(DomainError::Validation {
                field: "content",
                message: "must not be empty",
            });
        }
        Ok(self)
    }
}

impl Post {
    pub(crate) fn new(
        id: i64,
        post_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::Validation {
                field: "id",
                message: "must be > 0",
            });
        }

        let post_id = post_id.into();
        if post_id.trim().is_empty() {
            return Err(DomainError::Validation {
                field: "post_id",
                message: "must not be empty",
            });
        }

        if updated_at < created_at {
            return Err(DomainError::Validation {
                field: "updated_at",
                message: "must be >= created_at",
            });
        }

        Ok(Self {
            id,
            post_id,
            content: content.into(),
            created_at,
            updated_at,
            deleted_at,
        })
    }

    #[cfg(test)]
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Mints the public identifier handed out to clients. Assigned once at
/// creation and never changed afterwards.
pub(crate) fn generate_public_id() -> String {
    Uuid::new_v4().to_string()
}
