use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Payment/order lifecycle. Stored as its wire string in the `payments.status`
/// column; every mutation goes through [`OrderStatus::can_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    PendingDeliveryConfirmation,
    PendingDelivery,
    Completed,
    Declined,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::PendingDeliveryConfirmation => "pending_delivery_confirmation",
            OrderStatus::PendingDelivery => "pending_delivery",
            OrderStatus::Completed => "completed",
            OrderStatus::Declined => "declined",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "pending_delivery_confirmation" => Ok(OrderStatus::PendingDeliveryConfirmation),
            "pending_delivery" => Ok(OrderStatus::PendingDelivery),
            "completed" => Ok(OrderStatus::Completed),
            "declined" => Ok(OrderStatus::Declined),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(AppError::BadRequest(format!(
                "unknown order status '{other}'"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Declined | OrderStatus::Failed
        )
    }

    /// Legal edges of the state machine. Skipping a state or leaving a
    /// terminal state is never legal.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Approved) | (Pending, Declined) => true,
            (Approved, PendingDeliveryConfirmation) | (Approved, Declined) => true,
            (PendingDeliveryConfirmation, PendingDelivery) => true,
            (PendingDelivery, Completed) => true,
            // Payment-gateway failure escape from any non-terminal state.
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check a transition and produce the typed error for illegal edges.
    pub fn ensure_transition(self, next: OrderStatus) -> Result<(), AppError> {
        if self.can_transition(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStatusTransition(format!(
                "{} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// Assignment lifecycle, independent of the payment's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AssignmentStatus {
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "Assigned",
            AssignmentStatus::InProgress => "In Progress",
            AssignmentStatus::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "Assigned" => Ok(AssignmentStatus::Assigned),
            "In Progress" => Ok(AssignmentStatus::InProgress),
            "Completed" => Ok(AssignmentStatus::Completed),
            other => Err(AppError::BadRequest(format!(
                "unknown assignment status '{other}'"
            ))),
        }
    }

    /// Forward-only: Assigned -> In Progress -> Completed.
    pub fn can_transition(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, InProgress) | (Assigned, Completed) | (InProgress, Completed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AssignmentStatus, OrderStatus};

    #[test]
    fn happy_path_chain_is_legal() {
        use OrderStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Approved.can_transition(PendingDeliveryConfirmation));
        assert!(PendingDeliveryConfirmation.can_transition(PendingDelivery));
        assert!(PendingDelivery.can_transition(Completed));
    }

    #[test]
    fn skipping_states_is_rejected() {
        use OrderStatus::*;
        assert!(!Pending.can_transition(PendingDelivery));
        assert!(!Pending.can_transition(Completed));
        assert!(!Approved.can_transition(PendingDelivery));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use OrderStatus::*;
        for from in [Completed, Declined, Failed] {
            for to in [
                Pending,
                Approved,
                PendingDeliveryConfirmation,
                PendingDelivery,
                Completed,
                Declined,
                Failed,
            ] {
                assert!(!from.can_transition(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        use OrderStatus::*;
        for from in [Pending, Approved, PendingDeliveryConfirmation, PendingDelivery] {
            assert!(from.can_transition(Failed), "{from:?} -> Failed");
        }
    }

    #[test]
    fn declined_is_reachable_from_pending_and_approved_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition(Declined));
        assert!(Approved.can_transition(Declined));
        assert!(!PendingDeliveryConfirmation.can_transition(Declined));
        assert!(!PendingDelivery.can_transition(Declined));
    }

    #[test]
    fn status_strings_round_trip() {
        use OrderStatus::*;
        for status in [
            Pending,
            Approved,
            PendingDeliveryConfirmation,
            PendingDelivery,
            Completed,
            Declined,
            Failed,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("shipped").is_err());
    }

    #[test]
    fn assignment_status_is_forward_only() {
        use AssignmentStatus::*;
        assert!(Assigned.can_transition(InProgress));
        assert!(InProgress.can_transition(Completed));
        assert!(Assigned.can_transition(Completed));
        assert!(!Completed.can_transition(Assigned));
        assert!(!InProgress.can_transition(Assigned));
    }

    #[test]
    fn assignment_status_wire_strings() {
        assert_eq!(
            AssignmentStatus::parse("In Progress").unwrap(),
            AssignmentStatus::InProgress
        );
        assert!(AssignmentStatus::parse("in_progress").is_err());
    }
}
