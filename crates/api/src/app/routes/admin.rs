//! Operator endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use shopdesk_auth::permissions;

use crate::app::services::AppServices;
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new().route("/insights-cache", get(insights_cache))
}

/// GET /admin/insights-cache - purge expired entries and report cache state
pub async fn insights_cache(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::ADMIN_CACHE) {
        return resp;
    }

    let aggregator = &services.insights;
    let purged = aggregator.cache().purge_expired();
    let config = aggregator.config();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "entries": aggregator.cache().len(),
            "purged": purged,
            "in_flight": aggregator.in_flight(),
            "model": aggregator.model_id(),
            "ttl_minutes": config.ttl_minutes,
            "max_sales": config.max_sales,
            "window_days": config.window_days,
            "dedupe_in_flight": config.dedupe_in_flight,
        })),
    )
        .into_response()
}
