use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Closed set of auditable operations. Each action knows which resource it
/// touches, so call sites cannot record mismatched action/resource pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    PaymentCreated,
    PaymentReviewed,
    OrderBroadcast,
    OrderClaimed,
    AssignmentStatusUpdate,
    DeliveryConfirmed,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::PaymentCreated => "payment_created",
            AuditAction::PaymentReviewed => "payment_reviewed",
            AuditAction::OrderBroadcast => "order_broadcast",
            AuditAction::OrderClaimed => "order_claimed",
            AuditAction::AssignmentStatusUpdate => "assignment_status_update",
            AuditAction::DeliveryConfirmed => "delivery_confirmed",
        }
    }

    pub fn resource(self) -> &'static str {
        match self {
            AuditAction::AssignmentStatusUpdate => "assignments",
            _ => "payments",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
