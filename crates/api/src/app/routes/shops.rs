use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use shopdesk_auth::permissions;
use shopdesk_core::ShopId;
use shopdesk_store::NewShop;

use crate::app::routes::{insights, products, sales};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_shop).get(list_shops))
        .route("/:id", get(get_shop))
        .route("/:id/products", post(products::add_product).get(products::list_products))
        .route("/:id/sales", post(sales::record_sale).get(sales::list_sales))
        .route("/:id/insights", get(insights::get_insights))
        .route("/:id/insights/refresh", post(insights::refresh_insights))
}

pub async fn create_shop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    dto::JsonBody(body): dto::JsonBody<NewShop>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SHOPS_CREATE) {
        return resp;
    }

    match services.repo.create_shop(tenant.tenant_id(), body).await {
        Ok(shop) => (StatusCode::CREATED, Json(dto::shop_to_json(shop))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn list_shops(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SHOPS_READ) {
        return resp;
    }

    match services.repo.list_shops(tenant.tenant_id()).await {
        Ok(shops) => {
            let items = shops.into_iter().map(dto::shop_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn get_shop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SHOPS_READ) {
        return resp;
    }
    let shop_id: ShopId = match dto::parse_id(&id, "shop") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.get_shop(tenant.tenant_id(), shop_id).await {
        Ok(shop) => (StatusCode::OK, Json(dto::shop_to_json(shop))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}
