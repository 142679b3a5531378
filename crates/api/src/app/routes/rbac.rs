//! RBAC audit endpoints.
//!
//! Answer "why was this request denied?" without reading server logs.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use shopdesk_auth::{Permission, RbacRegistry, explain_authorization, permissions};

use crate::app::dto;
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/explain", get(explain))
}

/// GET /rbac/roles - built-in roles and the permissions they grant
pub async fn list_roles(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::RBAC_READ) {
        return resp;
    }

    (StatusCode::OK, Json(RbacRegistry::builtin())).into_response()
}

/// GET /rbac/explain?permission=X - explain the caller's own access
pub async fn explain(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ExplainQuery>,
) -> axum::response::Response {
    // Any authenticated user may ask about themselves.
    let required = Permission::new(query.permission);
    let explanation = explain_authorization(&authz::principal_for(&tenant, &principal), &required);

    (StatusCode::OK, Json(serde_json::json!({ "explanation": explanation }))).into_response()
}
