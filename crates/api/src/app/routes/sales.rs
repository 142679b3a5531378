use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use shopdesk_auth::permissions;
use shopdesk_core::ShopId;
use shopdesk_store::NewSale;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

/// POST /shops/:id/sales
pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
    dto::JsonBody(body): dto::JsonBody<NewSale>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SALES_CREATE) {
        return resp;
    }
    let shop_id: ShopId = match dto::parse_id(&shop, "shop") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.record_sale(tenant.tenant_id(), shop_id, body).await {
        Ok(sale) => (StatusCode::CREATED, Json(dto::sale_to_json(sale))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// GET /shops/:id/sales?limit=N (newest first)
pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
    Query(query): Query<dto::ListSalesQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SALES_READ) {
        return resp;
    }
    let shop_id: ShopId = match dto::parse_id(&shop, "shop") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let limit = query
        .limit
        .unwrap_or(dto::DEFAULT_SALES_LIMIT)
        .min(dto::MAX_SALES_LIMIT);

    match services.repo.list_sales(tenant.tenant_id(), shop_id, limit).await {
        Ok(sales) => {
            let items = sales.into_iter().map(dto::sale_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}
