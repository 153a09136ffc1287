use serde::Serialize;
use utoipa::ToSchema;

/// Pagination block attached to list responses.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
        }
    }
}

/// Envelope returned by every handler. `meta` is only present on paginated
/// listings and is omitted from the JSON otherwise.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, meta: Meta) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta: Some(meta),
        }
    }
}
