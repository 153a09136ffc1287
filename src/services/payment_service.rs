use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dto::payments::{
        CreatePaymentRequest, PaymentList, PaymentWithItems, ReviewDecision, ReviewPaymentRequest,
    },
    entity::{
        assignments::{
            ActiveModel as AssignmentActive, Column as AssignmentCol, Entity as Assignments,
        },
        payment_items::{
            ActiveModel as PaymentItemActive, Column as PaymentItemCol, Entity as PaymentItems,
            Model as PaymentItemModel,
        },
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Role, ensure_admin},
    models::{Payment, PaymentItem},
    response::{ApiResponse, Meta},
    routes::params::{PaymentListQuery, SortOrder},
    state::AppState,
    status::{AssignmentStatus, OrderStatus},
};

pub async fn create_payment(
    state: &AppState,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Cart snapshot is empty".into()));
    }
    if payload.total_price < 0 || payload.service_fee < 0 || payload.delivery_fee < 0 {
        return Err(AppError::BadRequest("Amounts must be non-negative".into()));
    }

    let mut line_total: i64 = 0;
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(
                "Line item quantity must be greater than 0".into(),
            ));
        }
        if item.unit_price < 0 {
            return Err(AppError::BadRequest(
                "Line item unit price must be non-negative".into(),
            ));
        }
        let line = item
            .unit_price
            .checked_mul(item.quantity as i64)
            .ok_or_else(|| AppError::BadRequest("Cart snapshot total overflows".into()))?;
        line_total = line_total
            .checked_add(line)
            .ok_or_else(|| AppError::BadRequest("Cart snapshot total overflows".into()))?;
    }

    // The snapshot total is validated once here and never recomputed later;
    // product prices may change after checkout.
    let expected = line_total
        .checked_add(payload.service_fee)
        .and_then(|t| t.checked_add(payload.delivery_fee))
        .ok_or_else(|| AppError::BadRequest("Cart snapshot total overflows".into()))?;
    if expected != payload.total_price {
        return Err(AppError::BadRequest(
            "total_price does not match line items plus fees".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(payload.customer_name),
        customer_email: Set(payload.customer_email),
        customer_phone: Set(payload.customer_phone),
        shipping_address: Set(payload.shipping_address),
        guest_id: Set(payload.guest_id),
        referral_code: Set(payload.referral_code),
        total_price: Set(payload.total_price),
        service_fee: Set(payload.service_fee),
        delivery_fee: Set(payload.delivery_fee),
        status: Set(OrderStatus::Pending.as_str().into()),
        shopper_id: Set(None),
        candidate_shoppers: Set(None),
        delivery_agent_id: Set(None),
        verification_token: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<PaymentItem> = Vec::new();
    for (position, item) in payload.items.iter().enumerate() {
        let inserted = PaymentItemActive {
            id: Set(Uuid::new_v4()),
            payment_id: Set(payment.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            position: Set(position as i32),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(item_from_entity(inserted));
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        AuditAction::PaymentCreated,
        Some(serde_json::json!({ "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        PaymentWithItems {
            payment: payment_from_entity(payment)?,
            items,
        },
    ))
}

pub async fn get_payment(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<PaymentWithItems>> {
    let payment = Payments::find_by_id(id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let items = PaymentItems::find()
        .filter(PaymentItemCol::PaymentId.eq(payment.id))
        .order_by_asc(PaymentItemCol::Position)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        PaymentWithItems {
            payment: payment_from_entity(payment)?,
            items,
        },
    ))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: PaymentListQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        // Reject unknown filter values instead of silently matching nothing.
        let status = OrderStatus::parse(status)?;
        condition = condition.add(PaymentCol::Status.eq(status.as_str()));
    }

    let mut finder = Payments::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(PaymentCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(PaymentCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let payments = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paginated(
        "Payments",
        PaymentList { items: payments },
        Meta::new(page, limit, total),
    ))
}

pub async fn list_by_referral(
    state: &AppState,
    code: &str,
) -> AppResult<ApiResponse<PaymentList>> {
    if code.trim().is_empty() {
        return Err(AppError::BadRequest("Referral code is required".into()));
    }

    let payments = Payments::find()
        .filter(PaymentCol::ReferralCode.eq(code))
        .order_by_desc(PaymentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Referral orders",
        PaymentList { items: payments },
    ))
}

/// Reviewer decision on a pending payment: approve it for assignment or
/// decline it.
pub async fn review_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ReviewPaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;

    let existing = Payments::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&existing.status)?;
    let next = match payload.decision {
        ReviewDecision::Approved => OrderStatus::Approved,
        ReviewDecision::Declined => OrderStatus::Declined,
    };
    current.ensure_transition(next)?;

    let mut active: PaymentActive = existing.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::PaymentReviewed,
        Some(serde_json::json!({ "payment_id": payment.id, "status": payment.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment reviewed",
        payment_from_entity(payment)?,
    ))
}

/// Delivery-confirmation event: the courier handed the order over.
/// Moves the payment to its terminal `completed` state and closes the
/// assignment.
pub async fn confirm_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    if user.role != Role::Delivery && user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    let txn = state.orm.begin().await?;

    let existing = Payments::find_by_id(id).one(&txn).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&existing.status)?;
    current.ensure_transition(OrderStatus::Completed)?;

    let shopper_id = existing.shopper_id;
    let delivery_agent_id = existing.delivery_agent_id;

    let mut active: PaymentActive = existing.into();
    active.status = Set(OrderStatus::Completed.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;

    let assignment = Assignments::find()
        .filter(AssignmentCol::PaymentId.eq(payment.id))
        .one(&txn)
        .await?;
    if let Some(assignment) = assignment {
        let mut active: AssignmentActive = assignment.into();
        active.status = Set(AssignmentStatus::Completed.as_str().into());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    txn.commit().await?;

    if let Some(shopper_id) = shopper_id {
        state.notifier.notify(
            shopper_id,
            Role::Shopper,
            "Order delivered to the customer",
            payment.id,
        );
    }
    if let Some(agent_id) = delivery_agent_id {
        state
            .notifier
            .notify(agent_id, Role::Delivery, "Delivery completed", payment.id);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::DeliveryConfirmed,
        Some(serde_json::json!({ "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Delivery confirmed",
        payment_from_entity(payment)?,
    ))
}

pub fn payment_from_entity(model: PaymentModel) -> AppResult<Payment> {
    let candidate_shoppers = match model.candidate_shoppers {
        Some(value) => Some(
            serde_json::from_value::<Vec<Uuid>>(value)
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
        ),
        None => None,
    };
    Ok(Payment {
        id: model.id,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        customer_phone: model.customer_phone,
        shipping_address: model.shipping_address,
        guest_id: model.guest_id,
        referral_code: model.referral_code,
        total_price: model.total_price,
        service_fee: model.service_fee,
        delivery_fee: model.delivery_fee,
        status: OrderStatus::parse(&model.status)?,
        shopper_id: model.shopper_id,
        candidate_shoppers,
        delivery_agent_id: model.delivery_agent_id,
        verification_token: model.verification_token,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn item_from_entity(model: PaymentItemModel) -> PaymentItem {
    PaymentItem {
        id: model.id,
        payment_id: model.payment_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        position: model.position,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
