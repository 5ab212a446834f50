use axum_storefront_api::{
    config::GatewayConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::payment::{CheckoutRequest, PaymentCallback},
    entity::{
        pending_orders::Entity as PendingOrders, products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    models::{Address, CartLine, DescriptionPoints, Images, OrderStatus, PriceSource, Reviews},
    services::payment_service,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

// A transient storage failure while the callback is building the order must
// leave the pending snapshot in place, so the gateway's replayed callback
// can still finalize the paid checkout.
#[tokio::test]
async fn failed_finalize_is_recoverable_by_replayed_callback() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set("recovery@example.com".to_string()),
        password_hash: Set("dummy".into()),
        role: Set("user".into()),
        blocked: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category: Set("hardware".into()),
        title: Set("Recovery Hook".into()),
        description_points: Set(DescriptionPoints(vec!["Solid brass".into()])),
        images: Set(Images(vec!["/img/hook.jpg".into()])),
        base_price: Set(Some(300)),
        base_offer_price: Set(None),
        base_stocks: Set(Some(10)),
        measurements: Set(None),
        color_variants: Set(None),
        enabled: Set(true),
        reviews: Set(Reviews(vec![])),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let auth_user = AuthUser {
        user_id: user.id,
        role: "user".into(),
    };

    let line = CartLine {
        id: Uuid::new_v4(),
        product_id: product.id,
        title: product.title.clone(),
        image: product.images.0.first().cloned(),
        price: 300,
        offer_price: None,
        selected_measurement: None,
        selected_color: None,
        quantity: 1,
        price_source: PriceSource::Base,
    };

    let checkout = payment_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            items: vec![line],
            total_amount: 350,
            billing_address: billing(),
            delivery_address: None,
            payment_method: "Online".into(),
            order_notes: String::new(),
        },
    )
    .await?
    .data
    .unwrap();

    let callback = || PaymentCallback {
        txnid: checkout.txnid.clone(),
        mihpayid: "mih-recovery".into(),
        status: "success".into(),
    };

    // Make every order insert fail for the duration of the first callback.
    set_orders_insert_outage(&state, true).await?;
    let err = payment_service::confirm_payment(&state, callback())
        .await
        .unwrap_err();
    assert!(
        !matches!(err, AppError::NotFound),
        "a storage failure must not present as a consumed pending order"
    );

    // The snapshot survived the failed attempt.
    let still_pending = PendingOrders::find_by_id(checkout.txnid.clone())
        .one(&state.orm)
        .await?;
    assert!(still_pending.is_some());

    set_orders_insert_outage(&state, false).await?;

    let confirmed = payment_service::confirm_payment(&state, callback())
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.order.status, OrderStatus::Processing);
    assert_eq!(confirmed.order.total_amount, 350);

    // The replay after a successful finalize is still rejected.
    let replay = payment_service::confirm_payment(&state, callback())
        .await
        .unwrap_err();
    assert!(matches!(replay, AppError::NotFound));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, pending_orders, carts, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let state = AppState {
        pool,
        orm,
        gateway: GatewayConfig {
            merchant_key: "testkey".into(),
            merchant_salt: "testsalt".into(),
            success_url: "http://localhost/success".into(),
            failure_url: "http://localhost/failure".into(),
        },
        mailer: Mailer::spawn(),
    };

    // Clear any trigger a previously aborted run may have left behind.
    set_orders_insert_outage(&state, false).await?;

    Ok(state)
}

async fn set_orders_insert_outage(state: &AppState, enabled: bool) -> anyhow::Result<()> {
    let backend = state.orm.get_database_backend();
    let statements: &[&str] = if enabled {
        &[
            "CREATE OR REPLACE FUNCTION orders_insert_outage() RETURNS trigger LANGUAGE plpgsql AS $$ BEGIN RAISE EXCEPTION 'storage outage'; END $$",
            "CREATE TRIGGER orders_insert_outage BEFORE INSERT ON orders FOR EACH ROW EXECUTE FUNCTION orders_insert_outage()",
        ]
    } else {
        &[
            "DROP TRIGGER IF EXISTS orders_insert_outage ON orders",
            "DROP FUNCTION IF EXISTS orders_insert_outage()",
        ]
    };
    for sql in statements {
        state
            .orm
            .execute(Statement::from_string(backend, *sql))
            .await?;
    }
    Ok(())
}

fn billing() -> Address {
    Address {
        full_name: "Asha Rao".into(),
        phone: "5550100".into(),
        email: "asha@example.com".into(),
        address: "1 Main St".into(),
        city: "Pune".into(),
        state: None,
        zip_code: "411001".into(),
        country: "IN".into(),
    }
}
