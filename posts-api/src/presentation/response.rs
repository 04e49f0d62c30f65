use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope shared by every endpoint: a human readable message and
/// an optional payload.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ApiResponse<T> {
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub(crate) fn with_data(message: &str, data: T) -> Self {
        Self {
            message: message.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub(crate) fn message(message: &str) -> Self {
        Self {
            message: message.to_string(),
            data: None,
        }
    }
}
