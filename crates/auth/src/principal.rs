use serde::{Deserialize, Serialize};

use shopdesk_core::{TenantId, UserId};

use crate::{Permission, Role, role_permissions};

/// A user's membership in a tenant.
///
/// States which tenant the user acts within and which roles/permissions are
/// granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl TenantMembership {
    /// Build a membership whose permissions are derived from the built-in
    /// role policy.
    pub fn from_roles(tenant_id: TenantId, roles: Vec<Role>) -> Self {
        let mut permissions: Vec<Permission> = roles
            .iter()
            .flat_map(|r| role_permissions(r.as_str()))
            .collect();
        permissions.sort();
        permissions.dedup();

        Self {
            tenant_id,
            roles,
            permissions,
        }
    }
}

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    pub fn new(user_id: UserId, active_tenant_id: TenantId, membership: TenantMembership) -> Self {
        Self {
            user_id,
            active_tenant_id,
            membership,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_merges_role_permissions_without_duplicates() {
        let m = TenantMembership::from_roles(
            TenantId::new(),
            vec![Role::new("viewer"), Role::new("staff")],
        );
        let mut names: Vec<&str> = m.permissions.iter().map(|p| p.as_str()).collect();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
        assert!(names.contains(&"sales.create"));
    }
}
