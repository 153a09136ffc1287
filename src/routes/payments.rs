use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::payments::{
        AcceptOrderRequest, AssignNearbyRequest, BroadcastResponse, CreatePaymentRequest,
        PaymentList, PaymentWithItems, ReviewPaymentRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    routes::params::PaymentListQuery,
    services::{assignment_service, payment_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment).get(list_payments))
        .route("/{id}", get(get_payment))
        .route("/{id}/review", put(review_payment))
        .route("/{id}/assign-nearby", post(assign_nearby))
        .route("/{id}/accept", post(accept_order))
        .route("/{id}/confirm-delivery", post(confirm_delivery))
}

pub fn orders_router() -> Router<AppState> {
    Router::new().route("/referral/{code}", get(list_by_referral))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Record a payment with its cart snapshot", body = ApiResponse<PaymentWithItems>),
        (status = 400, description = "Empty cart or total mismatch"),
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentWithItems>>> {
    let resp = payment_service::create_payment(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "List payments (admin only)", body = ApiResponse<PaymentList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_payments(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment with cart snapshot", body = ApiResponse<PaymentWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentWithItems>>> {
    let resp = payment_service::get_payment(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/review",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    request_body = ReviewPaymentRequest,
    responses(
        (status = 200, description = "Approve or decline a pending payment", body = ApiResponse<Payment>),
        (status = 400, description = "Invalid status transition"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn review_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::review_payment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/assign-nearby",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    request_body = AssignNearbyRequest,
    responses(
        (status = 200, description = "Candidate delivery agents and the verification token", body = ApiResponse<BroadcastResponse>),
        (status = 400, description = "Missing fields or payment not approved"),
        (status = 404, description = "Unknown payment or no agents within radius"),
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn assign_nearby(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignNearbyRequest>,
) -> AppResult<Json<ApiResponse<BroadcastResponse>>> {
    let resp = assignment_service::broadcast_to_nearby_agents(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/accept",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    request_body = AcceptOrderRequest,
    responses(
        (status = 200, description = "Order claimed by the delivery agent", body = ApiResponse<Payment>),
        (status = 400, description = "Invalid status"),
        (status = 409, description = "Already claimed by another agent"),
        (status = 404, description = "Unknown payment or agent"),
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn accept_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptOrderRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = assignment_service::claim_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/confirm-delivery",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Delivery confirmed, payment completed", body = ApiResponse<Payment>),
        (status = 400, description = "Invalid status transition"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn confirm_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::confirm_delivery(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/referral/{code}",
    params(
        ("code" = String, Path, description = "Referral code")
    ),
    responses(
        (status = 200, description = "Payments attributed to a referral code", body = ApiResponse<PaymentList>),
    ),
    tag = "Payments"
)]
pub async fn list_by_referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_by_referral(&state, &code).await?;
    Ok(Json(resp))
}
