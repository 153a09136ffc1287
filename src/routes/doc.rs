use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        assignments::UpdateAssignmentStatusRequest,
        payments::{
            AcceptOrderRequest, AssignNearbyRequest, BroadcastResponse, CandidateAgent,
            CreatePaymentRequest, LineItemInput, PaymentList, PaymentWithItems,
            ReviewPaymentRequest,
        },
    },
    geo::GeoPoint,
    models::{Assignment, DeliveryAgent, Payment, PaymentItem},
    response::{ApiResponse, Meta},
    routes::{assignments, health, params, payments},
    status::{AssignmentStatus, OrderStatus},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        payments::create_payment,
        payments::list_payments,
        payments::get_payment,
        payments::review_payment,
        payments::assign_nearby,
        payments::accept_order,
        payments::confirm_delivery,
        payments::list_by_referral,
        assignments::update_status
    ),
    components(
        schemas(
            Payment,
            PaymentItem,
            DeliveryAgent,
            Assignment,
            OrderStatus,
            AssignmentStatus,
            GeoPoint,
            LineItemInput,
            CreatePaymentRequest,
            ReviewPaymentRequest,
            AssignNearbyRequest,
            AcceptOrderRequest,
            CandidateAgent,
            BroadcastResponse,
            PaymentWithItems,
            PaymentList,
            UpdateAssignmentStatusRequest,
            params::Pagination,
            params::PaymentListQuery,
            Meta,
            ApiResponse<Payment>,
            ApiResponse<PaymentWithItems>,
            ApiResponse<PaymentList>,
            ApiResponse<BroadcastResponse>,
            ApiResponse<Assignment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Payments", description = "Payment lifecycle endpoints"),
        (name = "Assignment", description = "Order broadcast and claim endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
