pub mod assignments;
pub mod audit_logs;
pub mod delivery_agents;
pub mod payment_items;
pub mod payments;

pub use assignments::Entity as Assignments;
pub use audit_logs::Entity as AuditLogs;
pub use delivery_agents::Entity as DeliveryAgents;
pub use payment_items::Entity as PaymentItems;
pub use payments::Entity as Payments;
