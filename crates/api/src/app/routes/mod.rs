use axum::{routing::get, Router};

pub mod admin;
pub mod insights;
pub mod notifications;
pub mod products;
pub mod rbac;
pub mod sales;
pub mod shops;
pub mod suppliers;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/shops", shops::router())
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/notifications", notifications::router())
        .nest("/rbac", rbac::router())
        .nest("/admin", admin::router())
}
