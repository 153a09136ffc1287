use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    geo::GeoPoint,
    models::{Payment, PaymentItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub guest_id: Option<String>,
    pub referral_code: Option<String>,
    pub total_price: i64,
    pub service_fee: i64,
    pub delivery_fee: i64,
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Declined,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewPaymentRequest {
    pub decision: ReviewDecision,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignNearbyRequest {
    pub shopper_ids: Vec<Uuid>,
    pub location: GeoPoint,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptOrderRequest {
    pub delivery_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateAgent {
    pub id: Uuid,
    pub name: String,
    pub distance_meters: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub candidates: Vec<CandidateAgent>,
    pub verification_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentWithItems {
    pub payment: Payment,
    pub items: Vec<PaymentItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}
