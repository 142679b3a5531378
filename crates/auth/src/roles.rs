use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{self, Permission};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings in tokens; `role_permissions` is the policy that
/// maps them to permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Built-in roles, most to least privileged.
pub const KNOWN_ROLES: &[&str] = &["admin", "manager", "staff", "viewer"];

/// Static role → permission policy.
///
/// Unknown roles grant nothing.
pub fn role_permissions(role: &str) -> Vec<Permission> {
    match role {
        "admin" => vec![Permission::new("*")],
        "manager" => permissions::ALL
            .iter()
            .filter(|p| p.area() != "admin" && p.area() != "rbac")
            .cloned()
            .chain([permissions::RBAC_READ])
            .collect(),
        "staff" => {
            let mut perms = read_permissions();
            perms.push(permissions::SALES_CREATE);
            perms.push(permissions::NOTIFICATIONS_UPDATE);
            perms
        }
        "viewer" => read_permissions(),
        _ => Vec::new(),
    }
}

pub(crate) fn role_description(role: &str) -> Option<&'static str> {
    match role {
        "admin" => Some("Tenant administrator with all permissions"),
        "manager" => Some("Runs shops: catalogue, sales, suppliers and AI insights"),
        "staff" => Some("Counter staff: records sales, reads everything else"),
        "viewer" => Some("Read-only access"),
        _ => None,
    }
}

fn read_permissions() -> Vec<Permission> {
    permissions::ALL
        .iter()
        .filter(|p| p.as_str().ends_with(".read") && p.area() != "rbac")
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_only_reads() {
        let perms = role_permissions("viewer");
        assert!(!perms.is_empty());
        assert!(perms.iter().all(|p| p.as_str().ends_with(".read")));
        assert!(perms.contains(&permissions::INSIGHTS_READ));
    }

    #[test]
    fn staff_can_record_sales_but_not_refresh_insights() {
        let perms = role_permissions("staff");
        assert!(perms.contains(&permissions::SALES_CREATE));
        assert!(!perms.contains(&permissions::INSIGHTS_REFRESH));
    }

    #[test]
    fn manager_has_no_admin_permissions() {
        let perms = role_permissions("manager");
        assert!(perms.contains(&permissions::INSIGHTS_REFRESH));
        assert!(perms.contains(&permissions::RBAC_READ));
        assert!(!perms.contains(&permissions::ADMIN_CACHE));
    }

    #[test]
    fn unknown_role_grants_nothing() {
        assert!(role_permissions("janitor").is_empty());
    }
}
