use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use shopdesk_ai::InsightError;
use shopdesk_auth::permissions;
use shopdesk_core::ShopId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

fn shop_context(raw: &str) -> Result<ShopId, InsightError> {
    raw.parse().map_err(|_| InsightError::ShopContextMissing)
}

/// GET /shops/:id/insights
///
/// Served from the TTL cache when fresh; otherwise one model call.
pub async fn get_insights(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::INSIGHTS_READ) {
        return resp;
    }
    let shop_id = match shop_context(&shop) {
        Ok(v) => v,
        Err(e) => return errors::insight_error_to_response(e),
    };

    match services.insights.generate_insights(tenant.tenant_id(), shop_id).await {
        Ok(bundle) => (StatusCode::OK, Json(bundle)).into_response(),
        Err(e) => errors::insight_error_to_response(e),
    }
}

/// POST /shops/:id/insights/refresh
pub async fn refresh_insights(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::INSIGHTS_REFRESH) {
        return resp;
    }
    let shop_id = match shop_context(&shop) {
        Ok(v) => v,
        Err(e) => return errors::insight_error_to_response(e),
    };

    match services.insights.refresh(tenant.tenant_id(), shop_id).await {
        Ok(bundle) => (StatusCode::OK, Json(bundle)).into_response(),
        Err(e) => errors::insight_error_to_response(e),
    }
}
