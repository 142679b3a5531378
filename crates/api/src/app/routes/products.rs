use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use shopdesk_auth::permissions;
use shopdesk_core::{ProductId, ShopId};
use shopdesk_store::NewProduct;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(get_product))
        .route("/:id/adjust", post(adjust_stock))
}

/// POST /shops/:id/products
pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
    dto::JsonBody(body): dto::JsonBody<NewProduct>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::PRODUCTS_CREATE) {
        return resp;
    }
    let shop_id: ShopId = match dto::parse_id(&shop, "shop") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.add_product(tenant.tenant_id(), shop_id, body).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// GET /shops/:id/products
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(shop): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return resp;
    }
    let shop_id: ShopId = match dto::parse_id(&shop, "shop") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.list_products(tenant.tenant_id(), shop_id).await {
        Ok(products) => {
            let items = products.into_iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return resp;
    }
    let product_id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.get_product(tenant.tenant_id(), product_id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::AdjustStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::PRODUCTS_ADJUST) {
        return resp;
    }
    let product_id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .repo
        .adjust_stock(tenant.tenant_id(), product_id, body.delta)
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}
