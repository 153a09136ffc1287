use axum_fulfillment_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;
    seed_delivery_agents(&pool).await?;
    let payment_id = seed_pending_payment(&pool).await?;

    println!("Seed completed. Pending payment: {payment_id}");
    Ok(())
}

async fn seed_delivery_agents(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // Coordinates scattered around central Addis Ababa.
    let agents = vec![
        ("Abel", 9.0054, 38.7636, true),
        ("Hanna", 9.0301, 38.7612, true),
        ("Kebede", 9.0108, 38.7894, true),
        ("Sara", 8.9806, 38.7578, false),
    ];

    for (name, lat, lng, is_available) in agents {
        sqlx::query(
            r#"
            INSERT INTO delivery_agents (id, name, lat, lng, is_available)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(lat)
        .bind(lng)
        .bind(is_available)
        .execute(pool)
        .await?;
    }

    println!("Seeded delivery agents");
    Ok(())
}

async fn seed_pending_payment(pool: &sqlx::PgPool) -> anyhow::Result<Uuid> {
    let payment_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, customer_name, customer_email, customer_phone, shipping_address,
            referral_code, total_price, service_fee, delivery_fee, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
        "#,
    )
    .bind(payment_id)
    .bind("Meles T.")
    .bind("meles@example.com")
    .bind("+251911000000")
    .bind("Bole, Addis Ababa")
    .bind("WELCOME10")
    .bind(120_000_i64)
    .bind(5_000_i64)
    .bind(15_000_i64)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO payment_items (id, payment_id, product_id, quantity, unit_price, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payment_id)
    .bind(Uuid::new_v4())
    .bind(2_i32)
    .bind(50_000_i64)
    .bind(0_i32)
    .execute(pool)
    .await?;

    println!("Seeded pending payment");
    Ok(payment_id)
}
