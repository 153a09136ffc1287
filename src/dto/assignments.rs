use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAssignmentStatusRequest {
    /// One of `Assigned`, `In Progress`, `Completed`.
    pub status: String,
}
