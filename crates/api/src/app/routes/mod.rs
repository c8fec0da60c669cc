use axum::{Router, routing::get};

use crate::middleware::{AuthState, auth_middleware};

pub mod admin;
pub mod auth;
pub mod orders;
pub mod products;
pub mod system;
pub mod users;
pub mod vendors;

/// Router for everything under `/api`.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/auth", auth::router(auth.clone()))
        .nest("/users", users::router(auth.clone()))
        .nest("/vendors", vendors::router(auth.clone()))
        .nest("/products", products::router(auth.clone()))
        .nest("/orders", orders::router(auth.clone()))
        .nest("/admin", admin::router(auth))
}

/// Require a valid bearer token on every route registered so far.
fn authenticated(router: Router, auth: AuthState) -> Router {
    router.route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
}
