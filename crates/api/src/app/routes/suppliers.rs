use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use shopdesk_auth::permissions;
use shopdesk_core::SupplierId;
use shopdesk_store::NewSupplier;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier))
}

pub async fn register_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    dto::JsonBody(body): dto::JsonBody<NewSupplier>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SUPPLIERS_CREATE) {
        return resp;
    }

    match services.repo.register_supplier(tenant.tenant_id(), body).await {
        Ok(supplier) => (StatusCode::CREATED, Json(dto::supplier_to_json(supplier))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SUPPLIERS_READ) {
        return resp;
    }

    match services.repo.list_suppliers(tenant.tenant_id()).await {
        Ok(suppliers) => {
            let items = suppliers.into_iter().map(dto::supplier_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::SUPPLIERS_READ) {
        return resp;
    }
    let supplier_id: SupplierId = match dto::parse_id(&id, "supplier") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.repo.get_supplier(tenant.tenant_id(), supplier_id).await {
        Ok(supplier) => (StatusCode::OK, Json(dto::supplier_to_json(supplier))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}
