use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub payment_id: Uuid,
    pub shopper_id: Uuid,
    pub delivery_agent_id: Uuid,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payments::Entity",
        from = "Column::PaymentId",
        to = "super::payments::Column::Id"
    )]
    Payments,
    #[sea_orm(
        belongs_to = "super::delivery_agents::Entity",
        from = "Column::DeliveryAgentId",
        to = "super::delivery_agents::Column::Id"
    )]
    DeliveryAgents,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::delivery_agents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryAgents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
