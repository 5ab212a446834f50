use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use serde_json::json;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "admin").await
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "user").await
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // One product per pricing shape: measurements, colors only, base only.
    let products = vec![
        (
            "Oak Dining Table",
            "furniture",
            json!(["Solid oak top", "Seats six comfortably"]),
            json!(["/img/oak-table-1.jpg", "/img/oak-table-2.jpg"]),
            None::<i64>,
            None::<i64>,
            json!([
                { "measurement": "120cm", "price": 14500, "offerPrice": 12900, "stocks": 8 },
                { "measurement": "180cm", "price": 19900, "offerPrice": null, "stocks": 3 }
            ]),
            serde_json::Value::Null,
        ),
        (
            "Linen Cushion",
            "decor",
            json!(["Washed linen cover", "Feather insert included"]),
            json!(["/img/linen-cushion.jpg"]),
            None::<i64>,
            None::<i64>,
            serde_json::Value::Null,
            json!([
                { "colorName": "Sage", "colorCode": "#9caf88", "price": 1200, "offerPrice": 950, "stocks": 40 },
                { "colorName": "Rust", "colorCode": "#b7410e", "price": 1200, "offerPrice": null, "stocks": 22 }
            ]),
        ),
        (
            "Brass Wall Hook",
            "hardware",
            json!(["Solid brass", "Mounting screws included"]),
            json!(["/img/brass-hook.jpg"]),
            Some(350),
            Some(299),
            serde_json::Value::Null,
            serde_json::Value::Null,
        ),
    ];

    for (title, category, points, images, base_price, base_offer, measurements, colors) in products
    {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, category, title, description_points, images,
                 base_price, base_offer_price, measurements, color_variants)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category)
        .bind(title)
        .bind(points)
        .bind(images)
        .bind(base_price)
        .bind(base_offer)
        .bind(nullable(measurements))
        .bind(nullable(colors))
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

fn nullable(value: serde_json::Value) -> Option<serde_json::Value> {
    if value.is_null() { None } else { Some(value) }
}
