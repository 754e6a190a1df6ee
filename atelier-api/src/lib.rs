use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod state;
pub mod webhooks;
pub mod wishlist;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let authed = orders::routes()
        .merge(reviews::authed_routes())
        .merge(wishlist::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::customer_auth_middleware,
        ));

    Router::new()
        .merge(auth::routes())
        .merge(products::routes())
        .merge(reviews::public_routes())
        .merge(webhooks::routes())
        .merge(authed)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
