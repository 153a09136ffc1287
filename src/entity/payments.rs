use sea_orm::entity::prelude::*;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
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
    pub status: String,
    pub shopper_id: Option<Uuid>,
    pub candidate_shoppers: Option<Value>,
    pub delivery_agent_id: Option<Uuid>,
    pub verification_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_items::Entity")]
    PaymentItems,
    #[sea_orm(has_many = "super::assignments::Entity")]
    Assignments,
    #[sea_orm(
        belongs_to = "super::delivery_agents::Entity",
        from = "Column::DeliveryAgentId",
        to = "super::delivery_agents::Column::Id"
    )]
    DeliveryAgents,
}

impl Related<super::payment_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentItems.def()
    }
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::delivery_agents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryAgents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
