use std::sync::Arc;

use atelier_catalog::{ProductRepository, ReviewRepository, WishlistRepository};
use atelier_core::identity::UserRepository;
use atelier_order::{OrderCoordinator, OrderRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct WebhookConfig {
    pub secret: String,
    pub tolerance_secs: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<OrderCoordinator>,
    pub catalog: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub wishlist: Arc<dyn WishlistRepository>,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
}
