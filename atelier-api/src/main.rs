use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use atelier_api::{app, state::{AppState, AuthConfig, WebhookConfig}};
use atelier_order::{CheckoutConfig, OrderCoordinator};
use atelier_store::{
    DbClient, PgCatalogRepository, PgOrderRepository, PgReviewRepository, PgUserRepository,
    PgWishlistRepository, StripeGateway,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = atelier_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Atelier API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let catalog = Arc::new(PgCatalogRepository::new(db.pool.clone()));
    let orders = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let users = Arc::new(PgUserRepository::new(db.pool.clone()));
    let reviews = Arc::new(PgReviewRepository::new(db.pool.clone()));
    let wishlist = Arc::new(PgWishlistRepository::new(db.pool.clone()));
    let gateway = Arc::new(StripeGateway::new(
        config.payment.secret_key.clone(),
        config.payment.api_base.clone(),
    ));

    let coordinator = Arc::new(OrderCoordinator::new(
        orders.clone(),
        catalog.clone(),
        catalog.clone(),
        gateway,
        CheckoutConfig {
            currency: config.payment.currency.clone(),
            payment_timeout: Duration::from_secs(config.payment.intent_timeout_secs),
        },
    ));

    let app_state = AppState {
        coordinator,
        catalog,
        orders,
        users,
        reviews,
        wishlist,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        webhook: WebhookConfig {
            secret: config.payment.webhook_secret.clone(),
            tolerance_secs: atelier_core::webhook::DEFAULT_TOLERANCE_SECS,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
