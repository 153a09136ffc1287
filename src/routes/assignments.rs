use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use uuid::Uuid;

use crate::{
    dto::assignments::UpdateAssignmentStatusRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Assignment,
    response::ApiResponse,
    services::assignment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/status", put(update_status))
}

#[utoipa::path(
    put,
    path = "/api/assignments/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Assignment ID")
    ),
    request_body = UpdateAssignmentStatusRequest,
    responses(
        (status = 200, description = "Assignment status updated", body = ApiResponse<Assignment>),
        (status = 400, description = "Invalid status value"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssignmentStatusRequest>,
) -> AppResult<Json<ApiResponse<Assignment>>> {
    let resp = assignment_service::update_assignment_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
