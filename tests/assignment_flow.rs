use std::sync::Arc;

use axum_fulfillment_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        assignments::UpdateAssignmentStatusRequest,
        payments::{
            AcceptOrderRequest, AssignNearbyRequest, CreatePaymentRequest, LineItemInput,
            ReviewDecision, ReviewPaymentRequest,
        },
    },
    entity::{
        assignments::{Column as AssignmentCol, Entity as Assignments},
        delivery_agents::{ActiveModel as AgentActive, Column as AgentCol, Entity as DeliveryAgents},
    },
    error::AppError,
    geo::GeoPoint,
    middleware::auth::{AuthUser, Role},
    notify::LogNotifier,
    services::{assignment_service, payment_service},
    state::AppState,
    status::{AssignmentStatus, OrderStatus},
};
use futures::future::join_all;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, Statement};
use uuid::Uuid;

// Meters covered by one degree of longitude on the equator, for placing
// agents at exact distances in the boundary tests.
const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

// The tests share one database and truncate it on setup, so they must not
// interleave.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

fn courier() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Delivery,
    }
}

// Full lifecycle: checkout -> approve -> broadcast -> claim -> assignment
// status -> delivery confirmation, with the race losses along the way.
#[tokio::test]
async fn broadcast_claim_and_delivery_flow() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let location = GeoPoint {
        lat: 9.03,
        lng: 38.76,
    };
    let shopper_id = Uuid::new_v4();

    // Agent at the broadcast location, plus one too far away and one offline.
    let agent_a = create_agent(&state, "Abel", location.lat, location.lng, true).await?;
    let agent_b = create_agent(&state, "Hanna", location.lat, location.lng, true).await?;
    create_agent(&state, "Far", location.lat, location.lng + 1.0, true).await?;
    create_agent(&state, "Offline", location.lat, location.lng, false).await?;

    let payment_id = create_pending_payment(&state, Some("REF2024")).await?;

    // Broadcasting before approval must be rejected.
    let premature = assignment_service::broadcast_to_nearby_agents(
        &state,
        &admin(),
        payment_id,
        broadcast_request(&[shopper_id], location, None),
    )
    .await;
    assert!(matches!(
        premature,
        Err(AppError::InvalidStatusTransition(_))
    ));

    // Claiming a pending order must be rejected too.
    let premature_claim = assignment_service::claim_order(
        &state,
        &courier(),
        payment_id,
        AcceptOrderRequest {
            delivery_id: agent_a,
        },
    )
    .await;
    assert!(matches!(
        premature_claim,
        Err(AppError::InvalidStatusTransition(_))
    ));

    // Reviewer approves.
    let reviewed = payment_service::review_payment(
        &state,
        &admin(),
        payment_id,
        ReviewPaymentRequest {
            decision: ReviewDecision::Approved,
        },
    )
    .await?;
    assert_eq!(reviewed.data.unwrap().status, OrderStatus::Approved);

    // Broadcast: two nearby available agents qualify, far/offline do not.
    let broadcast = assignment_service::broadcast_to_nearby_agents(
        &state,
        &admin(),
        payment_id,
        broadcast_request(&[shopper_id], location, Some(5.0)),
    )
    .await?;
    let broadcast = broadcast.data.unwrap();
    assert_eq!(broadcast.candidates.len(), 2);
    assert!(!broadcast.verification_token.is_empty());

    let after_broadcast = payment_service::get_payment(&state, payment_id).await?;
    let after_broadcast = after_broadcast.data.unwrap().payment;
    assert_eq!(
        after_broadcast.status,
        OrderStatus::PendingDeliveryConfirmation
    );
    assert_eq!(after_broadcast.shopper_id, Some(shopper_id));

    // First claim wins.
    let claimed = assignment_service::claim_order(
        &state,
        &courier(),
        payment_id,
        AcceptOrderRequest {
            delivery_id: agent_a,
        },
    )
    .await?;
    let claimed = claimed.data.unwrap();
    assert_eq!(claimed.status, OrderStatus::PendingDelivery);
    assert_eq!(claimed.delivery_agent_id, Some(agent_a));
    assert!(claimed.verification_token.is_some());

    // Second claim loses with a conflict.
    let lost = assignment_service::claim_order(
        &state,
        &courier(),
        payment_id,
        AcceptOrderRequest {
            delivery_id: agent_b,
        },
    )
    .await;
    assert!(matches!(lost, Err(AppError::AlreadyClaimed)));

    // A failed claim leaves no trace: the losing agent stays available.
    let loser_row = DeliveryAgents::find_by_id(agent_b)
        .one(&state.orm)
        .await?
        .unwrap();
    assert!(loser_row.is_available);

    // A repeat claim from the winner is a conflict as well, not a no-op.
    let repeat = assignment_service::claim_order(
        &state,
        &courier(),
        payment_id,
        AcceptOrderRequest {
            delivery_id: agent_a,
        },
    )
    .await;
    assert!(matches!(repeat, Err(AppError::AlreadyClaimed)));

    // The claim took the winning agent off the available pool.
    let agent_row = DeliveryAgents::find_by_id(agent_a)
        .one(&state.orm)
        .await?
        .unwrap();
    assert!(!agent_row.is_available);

    // An assignment row exists and walks Assigned -> In Progress -> Completed.
    let assignment = Assignments::find()
        .filter(AssignmentCol::PaymentId.eq(payment_id))
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(assignment.status, "Assigned");
    assert_eq!(assignment.delivery_agent_id, agent_a);
    assert_eq!(assignment.shopper_id, shopper_id);

    let in_progress = assignment_service::update_assignment_status(
        &state,
        &courier(),
        assignment.id,
        UpdateAssignmentStatusRequest {
            status: "In Progress".into(),
        },
    )
    .await?;
    assert_eq!(
        in_progress.data.unwrap().status,
        AssignmentStatus::InProgress
    );

    // Moving backwards is rejected.
    let backwards = assignment_service::update_assignment_status(
        &state,
        &courier(),
        assignment.id,
        UpdateAssignmentStatusRequest {
            status: "Assigned".into(),
        },
    )
    .await;
    assert!(matches!(
        backwards,
        Err(AppError::InvalidStatusTransition(_))
    ));

    // Delivery confirmation completes the payment and the assignment.
    let completed = payment_service::confirm_delivery(&state, &courier(), payment_id).await?;
    assert_eq!(completed.data.unwrap().status, OrderStatus::Completed);

    let assignment = Assignments::find_by_id(assignment.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(assignment.status, "Completed");

    // Terminal state: no further transitions.
    let again = payment_service::confirm_delivery(&state, &courier(), payment_id).await;
    assert!(matches!(again, Err(AppError::InvalidStatusTransition(_))));

    // Referral attribution.
    let referred = payment_service::list_by_referral(&state, "REF2024").await?;
    assert!(
        referred
            .data
            .unwrap()
            .items
            .iter()
            .any(|p| p.id == payment_id)
    );

    Ok(())
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let location = GeoPoint {
        lat: 9.03,
        lng: 38.76,
    };

    let mut agents = Vec::new();
    for i in 0..50 {
        agents.push(create_agent(&state, &format!("agent-{i}"), location.lat, location.lng, true).await?);
    }

    let payment_id = create_approved_payment(&state).await?;
    assignment_service::broadcast_to_nearby_agents(
        &state,
        &admin(),
        payment_id,
        broadcast_request(&[Uuid::new_v4()], location, None),
    )
    .await?;

    let handles: Vec<_> = agents
        .into_iter()
        .map(|agent_id| {
            let state = state.clone();
            tokio::spawn(async move {
                assignment_service::claim_order(
                    &state,
                    &courier(),
                    payment_id,
                    AcceptOrderRequest {
                        delivery_id: agent_id,
                    },
                )
                .await
            })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for outcome in join_all(handles).await {
        match outcome? {
            Ok(_) => wins += 1,
            Err(AppError::AlreadyClaimed) => conflicts += 1,
            Err(other) => panic!("unexpected claim outcome: {other}"),
        }
    }
    assert_eq!(wins, 1, "exactly one concurrent claim must win");
    assert_eq!(conflicts, 49);

    let assignments = Assignments::find()
        .filter(AssignmentCol::PaymentId.eq(payment_id))
        .all(&state.orm)
        .await?;
    assert_eq!(assignments.len(), 1, "one assignment row per claimed order");

    // The claim writes land together or not at all: only the winner's agent
    // left the available pool, none of the 49 losers did.
    let still_available = DeliveryAgents::find()
        .filter(AgentCol::IsAvailable.eq(true))
        .all(&state.orm)
        .await?;
    assert_eq!(still_available.len(), 49);
    assert!(
        still_available
            .iter()
            .all(|a| a.id != assignments[0].delivery_agent_id)
    );

    Ok(())
}

#[tokio::test]
async fn radius_boundary_is_inclusive() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    // Place agents on the equator at exact distances from the origin.
    let origin = GeoPoint { lat: 0.0, lng: 0.0 };
    let near = create_agent(&state, "near", 0.0, 4_999.0 / METERS_PER_DEGREE, true).await?;
    create_agent(&state, "far", 0.0, 5_001.0 / METERS_PER_DEGREE, true).await?;

    let payment_id = create_approved_payment(&state).await?;
    let broadcast = assignment_service::broadcast_to_nearby_agents(
        &state,
        &admin(),
        payment_id,
        broadcast_request(&[Uuid::new_v4()], origin, Some(5.0)),
    )
    .await?;
    let candidates = broadcast.data.unwrap().candidates;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, near);
    assert!(candidates[0].distance_meters <= 5_000.0);

    // With nobody in range the broadcast fails and the payment stays approved.
    let far_payment = create_approved_payment(&state).await?;
    let none = assignment_service::broadcast_to_nearby_agents(
        &state,
        &admin(),
        far_payment,
        broadcast_request(
            &[Uuid::new_v4()],
            GeoPoint {
                lat: 40.0,
                lng: -74.0,
            },
            Some(5.0),
        ),
    )
    .await;
    assert!(matches!(none, Err(AppError::NoCandidatesFound)));
    let untouched = payment_service::get_payment(&state, far_payment).await?;
    assert_eq!(
        untouched.data.unwrap().payment.status,
        OrderStatus::Approved
    );

    Ok(())
}

#[tokio::test]
async fn checkout_validates_the_cart_snapshot_total() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let mut request = payment_request(None);
    request.total_price += 1;
    let mismatch = payment_service::create_payment(&state, request).await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));

    let mut request = payment_request(None);
    request.items.clear();
    let empty = payment_service::create_payment(&state, request).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    // Totals near i64::MAX must be rejected cleanly, not wrap around.
    let mut request = payment_request(None);
    request.items[0].quantity = 2;
    request.items[0].unit_price = i64::MAX - 1;
    let overflow = payment_service::create_payment(&state, request).await;
    assert!(matches!(overflow, Err(AppError::BadRequest(_))));

    let created = payment_service::create_payment(&state, payment_request(None)).await?;
    let created = created.data.unwrap();
    assert_eq!(created.payment.status, OrderStatus::Pending);
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.items[0].position, 0);
    assert_eq!(created.items[1].position, 1);

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };
    if std::env::var("JWT_SECRET").is_err() {
        // Token signing needs a secret; tests provide one.
        unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };
    }

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&database_url).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE assignments, payment_items, payments, delivery_agents, audit_logs RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(Some(AppState {
        pool,
        orm,
        notifier: Arc::new(LogNotifier),
        default_radius_km: 5.0,
    }))
}

async fn create_agent(
    state: &AppState,
    name: &str,
    lat: f64,
    lng: f64,
    is_available: bool,
) -> anyhow::Result<Uuid> {
    let agent = AgentActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        lat: Set(lat),
        lng: Set(lng),
        is_available: Set(is_available),
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(agent.id)
}

fn payment_request(referral_code: Option<&str>) -> CreatePaymentRequest {
    CreatePaymentRequest {
        customer_name: "Meles T.".into(),
        customer_email: "meles@example.com".into(),
        customer_phone: "+251911000000".into(),
        shipping_address: "Bole, Addis Ababa".into(),
        guest_id: None,
        referral_code: referral_code.map(Into::into),
        total_price: 120_000,
        service_fee: 5_000,
        delivery_fee: 15_000,
        items: vec![
            LineItemInput {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: 40_000,
            },
            LineItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: 20_000,
            },
        ],
    }
}

async fn create_pending_payment(
    state: &AppState,
    referral_code: Option<&str>,
) -> anyhow::Result<Uuid> {
    let created = payment_service::create_payment(state, payment_request(referral_code)).await?;
    Ok(created.data.unwrap().payment.id)
}

async fn create_approved_payment(state: &AppState) -> anyhow::Result<Uuid> {
    let id = create_pending_payment(state, None).await?;
    payment_service::review_payment(
        state,
        &admin(),
        id,
        ReviewPaymentRequest {
            decision: ReviewDecision::Approved,
        },
    )
    .await?;
    Ok(id)
}

fn broadcast_request(
    shopper_ids: &[Uuid],
    location: GeoPoint,
    radius_km: Option<f64>,
) -> AssignNearbyRequest {
    AssignNearbyRequest {
        shopper_ids: shopper_ids.to_vec(),
        location,
        radius_km,
    }
}
