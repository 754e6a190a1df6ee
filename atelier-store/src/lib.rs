pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod order_repo;
pub mod review_repo;
pub mod stripe;
pub mod user_repo;
pub mod wishlist_repo;

pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use order_repo::PgOrderRepository;
pub use review_repo::PgReviewRepository;
pub use stripe::StripeGateway;
pub use user_repo::PgUserRepository;
pub use wishlist_repo::PgWishlistRepository;
