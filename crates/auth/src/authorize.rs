use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use shopdesk_core::{TenantId, UserId};

use crate::roles::{KNOWN_ROLES, role_description};
use crate::{Permission, Principal, role_permissions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active tenant.
///
/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let granted = principal
        .membership
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Why a request was (or would be) allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub user_id: UserId,
    pub active_tenant_id: TenantId,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
    pub denial: Option<DenialKind>,
    /// Built-in roles that would grant the permission if assigned.
    pub granting_roles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    TenantMismatch,
    MissingPermission,
}

/// Explain an authorization decision for audit/debugging.
pub fn explain_authorization(principal: &Principal, required: &Permission) -> AuthorizationExplanation {
    let effective: BTreeSet<String> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();

    let granting_roles = KNOWN_ROLES
        .iter()
        .filter(|r| {
            role_permissions(r)
                .iter()
                .any(|p| p.is_wildcard() || p == required)
        })
        .map(|r| r.to_string())
        .collect();

    let (granted, reason, denial) = match authorize(principal, required) {
        Ok(()) if effective.contains("*") => (
            true,
            "principal holds the wildcard permission '*'".to_string(),
            None,
        ),
        Ok(()) => (
            true,
            format!("principal holds '{}'", required.as_str()),
            None,
        ),
        Err(AuthzError::TenantMismatch) => (
            false,
            format!(
                "principal is active in tenant {} but its membership is for tenant {}",
                principal.active_tenant_id, principal.membership.tenant_id
            ),
            Some(DenialKind::TenantMismatch),
        ),
        Err(AuthzError::Forbidden(p)) => (
            false,
            format!("missing required permission '{p}'"),
            Some(DenialKind::MissingPermission),
        ),
    };

    AuthorizationExplanation {
        required_permission: required.as_str().to_string(),
        granted,
        reason,
        user_id: principal.user_id,
        active_tenant_id: principal.active_tenant_id,
        roles: principal
            .membership
            .roles
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
        effective_permissions: effective.into_iter().collect(),
        denial,
        granting_roles,
    }
}

/// Role definition with its granted permissions (for display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Snapshot of the built-in RBAC policy.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: Vec<RoleDefinition>,
    pub permissions: Vec<String>,
}

impl RbacRegistry {
    pub fn builtin() -> Self {
        let roles = KNOWN_ROLES
            .iter()
            .map(|name| RoleDefinition {
                name: name.to_string(),
                description: role_description(name).map(str::to_string),
                permissions: role_permissions(name)
                    .into_iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
            })
            .collect();

        let permissions = crate::permissions::ALL
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        Self { roles, permissions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{ADMIN_CACHE, INSIGHTS_READ, SALES_CREATE};
    use crate::{Role, TenantMembership};

    fn principal(roles: &[&'static str]) -> Principal {
        let tenant = TenantId::new();
        Principal::new(
            UserId::new(),
            tenant,
            TenantMembership::from_roles(tenant, roles.iter().map(|r| Role::new(*r)).collect()),
        )
    }

    #[test]
    fn admin_wildcard_grants_everything() {
        let p = principal(&["admin"]);
        assert_eq!(authorize(&p, &ADMIN_CACHE), Ok(()));
        assert_eq!(authorize(&p, &Permission::new("anything.at_all")), Ok(()));
    }

    #[test]
    fn viewer_is_forbidden_from_writes() {
        let p = principal(&["viewer"]);
        assert_eq!(authorize(&p, &INSIGHTS_READ), Ok(()));
        assert_eq!(
            authorize(&p, &SALES_CREATE),
            Err(AuthzError::Forbidden("sales.create".to_string()))
        );
    }

    #[test]
    fn membership_for_other_tenant_is_rejected() {
        let mut p = principal(&["admin"]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(authorize(&p, &INSIGHTS_READ), Err(AuthzError::TenantMismatch));
    }

    #[test]
    fn explanation_lists_granting_roles_on_denial() {
        let p = principal(&["viewer"]);
        let e = explain_authorization(&p, &SALES_CREATE);
        assert!(!e.granted);
        assert_eq!(e.denial, Some(DenialKind::MissingPermission));
        assert!(e.granting_roles.contains(&"staff".to_string()));
        assert!(e.granting_roles.contains(&"admin".to_string()));
    }

    #[test]
    fn registry_covers_builtin_roles() {
        let r = RbacRegistry::builtin();
        let names: Vec<&str> = r.roles.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, KNOWN_ROLES);
        assert!(r.permissions.contains(&"insights.read".to_string()));
    }
}
