use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::status::{AssignmentStatus, OrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub guest_id: Option<String>,
    pub referral_code: Option<String>,
    pub total_price: i64,
    pub service_fee: i64,
    pub delivery_fee: i64,
    pub status: OrderStatus,
    pub shopper_id: Option<Uuid>,
    pub candidate_shoppers: Option<Vec<Uuid>>,
    pub delivery_agent_id: Option<Uuid>,
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of the cart snapshot, immutable once the payment is created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentItem {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAgent {
    pub id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub shopper_id: Uuid,
    pub delivery_agent_id: Uuid,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
