use uuid::Uuid;

use crate::middleware::auth::Role;

/// Collaborator interface for the notification service. Delivery and
/// persistence of notifications live outside this core; failures here are
/// logged and never fail the calling operation.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient_id: Uuid, role: Role, message: &str, related_order_id: Uuid);
}

/// Default dispatcher: emits the notification as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient_id: Uuid, role: Role, message: &str, related_order_id: Uuid) {
        tracing::info!(
            recipient_id = %recipient_id,
            role = role.as_str(),
            order_id = %related_order_id,
            message,
            "notification dispatched"
        );
    }
}
