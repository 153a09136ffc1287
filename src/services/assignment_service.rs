use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dto::assignments::UpdateAssignmentStatusRequest,
    dto::payments::{AcceptOrderRequest, AssignNearbyRequest, BroadcastResponse, CandidateAgent},
    entity::{
        assignments::{
            ActiveModel as AssignmentActive, Entity as Assignments, Model as AssignmentModel,
        },
        delivery_agents::{Column as AgentCol, Entity as DeliveryAgents},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    geo::{GeoPoint, distance_meters},
    middleware::auth::{AuthUser, Role, ensure_admin, ensure_role},
    models::{Assignment, Payment},
    response::ApiResponse,
    services::payment_service::payment_from_entity,
    state::AppState,
    status::{AssignmentStatus, OrderStatus},
};

/// Signed payload proving order/assignment authenticity; rendered as a
/// scannable code by the clients. Regenerated whenever the shopper set or the
/// claimed delivery agent changes.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationClaims {
    pub sub: String,
    pub customer_name: String,
    pub total_price: i64,
    pub shopper_ids: Vec<Uuid>,
    pub exp: usize,
}

pub fn sign_verification_token(
    payment_id: Uuid,
    customer_name: &str,
    total_price: i64,
    shopper_ids: &[Uuid],
) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(30))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = VerificationClaims {
        sub: payment_id.to_string(),
        customer_name: customer_name.to_string(),
        total_price,
        shopper_ids: shopper_ids.to_vec(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Broadcast an approved payment to every available delivery agent within
/// radius. Stores the candidate shopper set, regenerates the verification
/// token and moves the payment to `pending_delivery_confirmation`.
pub async fn broadcast_to_nearby_agents(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
    payload: AssignNearbyRequest,
) -> AppResult<ApiResponse<BroadcastResponse>> {
    ensure_admin(user)?;

    if payload.shopper_ids.is_empty() {
        return Err(AppError::BadRequest("shopper_ids must not be empty".into()));
    }
    if !payload.location.lat.is_finite() || !payload.location.lng.is_finite() {
        return Err(AppError::BadRequest(
            "location must have numeric lat and lng".into(),
        ));
    }
    let radius_km = payload.radius_km.unwrap_or(state.default_radius_km);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::BadRequest("radius_km must be positive".into()));
    }

    let payment = Payments::find_by_id(payment_id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&payment.status)?;
    current.ensure_transition(OrderStatus::PendingDeliveryConfirmation)?;

    let agents = DeliveryAgents::find()
        .filter(AgentCol::IsAvailable.eq(true))
        .all(&state.orm)
        .await?;

    // Radius boundary is inclusive: an agent at exactly radius_km is kept.
    let radius_m = radius_km * 1000.0;
    let mut candidates: Vec<CandidateAgent> = agents
        .into_iter()
        .filter_map(|agent| {
            let distance = distance_meters(
                payload.location,
                GeoPoint {
                    lat: agent.lat,
                    lng: agent.lng,
                },
            );
            (distance <= radius_m).then(|| CandidateAgent {
                id: agent.id,
                name: agent.name,
                distance_meters: distance,
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    if candidates.is_empty() {
        return Err(AppError::NoCandidatesFound);
    }

    let token = sign_verification_token(
        payment.id,
        &payment.customer_name,
        payment.total_price,
        &payload.shopper_ids,
    )?;

    let shopper_id = (payload.shopper_ids.len() == 1).then(|| payload.shopper_ids[0]);

    let mut active: crate::entity::payments::ActiveModel = payment.into();
    active.status = Set(OrderStatus::PendingDeliveryConfirmation.as_str().into());
    active.shopper_id = Set(shopper_id);
    active.candidate_shoppers = Set(Some(serde_json::json!(&payload.shopper_ids)));
    active.verification_token = Set(Some(token.clone()));
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&state.orm).await?;

    for candidate in &candidates {
        state.notifier.notify(
            candidate.id,
            Role::Delivery,
            "New order available for pickup nearby",
            payment.id,
        );
    }
    for shopper_id in &payload.shopper_ids {
        state.notifier.notify(
            *shopper_id,
            Role::Shopper,
            "Order assigned for shopping",
            payment.id,
        );
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderBroadcast,
        Some(serde_json::json!({
            "payment_id": payment.id,
            "radius_km": radius_km,
            "candidates": candidates.len(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Broadcast to nearby agents",
        BroadcastResponse {
            candidates,
            verification_token: token,
        },
    ))
}

/// First-acceptor-wins claim of a broadcast order.
///
/// The unclaimed check and the claim write are a single conditional UPDATE
/// judged by its affected-row count, so among concurrent claims on one order
/// exactly one can succeed.
pub async fn claim_order(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
    payload: AcceptOrderRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_role(user, Role::Delivery)?;

    let agent = DeliveryAgents::find_by_id(payload.delivery_id)
        .one(&state.orm)
        .await?;
    let agent = match agent {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    let payment = Payments::find_by_id(payment_id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // Check the claim field first so a reader arriving after the winner
    // reports the race loss, not a generic status error.
    if payment.delivery_agent_id.is_some() {
        return Err(AppError::AlreadyClaimed);
    }
    let current = OrderStatus::parse(&payment.status)?;
    if current != OrderStatus::PendingDeliveryConfirmation {
        return Err(AppError::InvalidStatusTransition(
            "already taken or invalid status".into(),
        ));
    }

    let shopper_id = resolve_shopper(&payment)?;
    let shopper_ids = candidate_shopper_ids(&payment)?;
    let token = sign_verification_token(
        payment.id,
        &payment.customer_name,
        payment.total_price,
        &shopper_ids,
    )?;

    // The claim and its follow-up writes commit or roll back as one unit:
    // a caller never observes a claimed payment without its assignment row.
    let txn = state.orm.begin().await?;

    let result = Payments::update_many()
        .col_expr(PaymentCol::DeliveryAgentId, Expr::value(agent.id))
        .col_expr(
            PaymentCol::Status,
            Expr::value(OrderStatus::PendingDelivery.as_str()),
        )
        .col_expr(PaymentCol::VerificationToken, Expr::value(token))
        .col_expr(PaymentCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(PaymentCol::Id.eq(payment.id))
        .filter(PaymentCol::Status.eq(OrderStatus::PendingDeliveryConfirmation.as_str()))
        .filter(PaymentCol::DeliveryAgentId.is_null())
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        txn.rollback().await?;
        // Lost the race (or the state moved under us). Re-read to report the
        // precise outcome; a repeat call from the winner lands here too.
        let now = Payments::find_by_id(payment.id).one(&state.orm).await?;
        return match now {
            Some(p) if p.delivery_agent_id.is_some() => Err(AppError::AlreadyClaimed),
            Some(_) => Err(AppError::InvalidStatusTransition(
                "already taken or invalid status".into(),
            )),
            None => Err(AppError::NotFound),
        };
    }

    AssignmentActive {
        id: Set(Uuid::new_v4()),
        payment_id: Set(payment.id),
        shopper_id: Set(shopper_id),
        delivery_agent_id: Set(agent.id),
        status: Set(AssignmentStatus::Assigned.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // A successful claim takes the agent off the available pool.
    DeliveryAgents::update_many()
        .col_expr(AgentCol::IsAvailable, Expr::value(false))
        .col_expr(AgentCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(AgentCol::Id.eq(agent.id))
        .exec(&txn)
        .await?;

    let claimed = Payments::find_by_id(payment.id).one(&txn).await?;
    let claimed = match claimed {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    txn.commit().await?;

    state.notifier.notify(
        shopper_id,
        Role::Shopper,
        "A delivery agent accepted the order",
        claimed.id,
    );
    state.notifier.notify(
        agent.id,
        Role::Delivery,
        "Order claim confirmed",
        claimed.id,
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderClaimed,
        Some(serde_json::json!({ "payment_id": claimed.id, "delivery_id": agent.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order claimed",
        payment_from_entity(claimed)?,
    ))
}

pub async fn update_assignment_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAssignmentStatusRequest,
) -> AppResult<ApiResponse<Assignment>> {
    if user.role != Role::Delivery && user.role != Role::Shopper && user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    let next = AssignmentStatus::parse(&payload.status)?;

    let existing = Assignments::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    let current = AssignmentStatus::parse(&existing.status)?;
    if !current.can_transition(next) {
        return Err(AppError::InvalidStatusTransition(format!(
            "{} -> {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let mut active: AssignmentActive = existing.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let assignment = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::AssignmentStatusUpdate,
        Some(serde_json::json!({ "assignment_id": assignment.id, "status": assignment.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Assignment updated",
        assignment_from_entity(assignment)?,
    ))
}

fn resolve_shopper(payment: &crate::entity::payments::Model) -> AppResult<Uuid> {
    if let Some(id) = payment.shopper_id {
        return Ok(id);
    }
    candidate_shopper_ids(payment)?
        .first()
        .copied()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("broadcast payment has no shoppers")))
}

fn candidate_shopper_ids(payment: &crate::entity::payments::Model) -> AppResult<Vec<Uuid>> {
    match &payment.candidate_shoppers {
        Some(value) => serde_json::from_value::<Vec<Uuid>>(value.clone())
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e))),
        None => Ok(Vec::new()),
    }
}

fn assignment_from_entity(model: AssignmentModel) -> AppResult<Assignment> {
    Ok(Assignment {
        id: model.id,
        payment_id: model.payment_id,
        shopper_id: model.shopper_id,
        delivery_agent_id: model.delivery_agent_id,
        status: AssignmentStatus::parse(&model.status)?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
