//! Permission guard for handlers.
//!
//! Roles come from the token; permissions are derived from the built-in role
//! policy on every request, so a policy change needs no token reissue.

use axum::http::StatusCode;
use axum::response::Response;

use shopdesk_auth::{AuthzError, Permission, Principal, TenantMembership, authorize};

use crate::app::errors::json_error;
use crate::context::{PrincipalContext, TenantContext};

/// Resolve the request's principal within its tenant.
pub fn principal_for(tenant: &TenantContext, principal: &PrincipalContext) -> Principal {
    Principal::new(
        principal.user_id(),
        tenant.tenant_id(),
        TenantMembership::from_roles(tenant.tenant_id(), principal.roles().to_vec()),
    )
}

pub fn authorize_permission(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), AuthzError> {
    authorize(&principal_for(tenant, principal), required)
}

/// Like `authorize_permission`, with the denial already rendered as a 403.
pub fn require(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), Response> {
    authorize_permission(tenant, principal, required).map_err(|e| {
        tracing::debug!(user = %principal.user_id(), permission = required.as_str(), "forbidden");
        json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
