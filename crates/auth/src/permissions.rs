use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque `area.action` strings (e.g. "sales.create").
/// The wildcard `"*"` grants everything within the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// The `area` segment (`"sales"` for `"sales.create"`).
    pub fn area(&self) -> &str {
        self.as_str().split('.').next().unwrap_or_default()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const SHOPS_CREATE: Permission = Permission::from_static("shops.create");
pub const SHOPS_READ: Permission = Permission::from_static("shops.read");
pub const PRODUCTS_CREATE: Permission = Permission::from_static("products.create");
pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
pub const PRODUCTS_ADJUST: Permission = Permission::from_static("products.adjust");
pub const SALES_CREATE: Permission = Permission::from_static("sales.create");
pub const SALES_READ: Permission = Permission::from_static("sales.read");
pub const SUPPLIERS_CREATE: Permission = Permission::from_static("suppliers.create");
pub const SUPPLIERS_READ: Permission = Permission::from_static("suppliers.read");
pub const NOTIFICATIONS_READ: Permission = Permission::from_static("notifications.read");
pub const NOTIFICATIONS_UPDATE: Permission = Permission::from_static("notifications.update");
pub const INSIGHTS_READ: Permission = Permission::from_static("insights.read");
pub const INSIGHTS_REFRESH: Permission = Permission::from_static("insights.refresh");
pub const RBAC_READ: Permission = Permission::from_static("rbac.read");
pub const ADMIN_CACHE: Permission = Permission::from_static("admin.cache");

/// Every concrete permission the API checks.
pub const ALL: &[Permission] = &[
    SHOPS_CREATE,
    SHOPS_READ,
    PRODUCTS_CREATE,
    PRODUCTS_READ,
    PRODUCTS_ADJUST,
    SALES_CREATE,
    SALES_READ,
    SUPPLIERS_CREATE,
    SUPPLIERS_READ,
    NOTIFICATIONS_READ,
    NOTIFICATIONS_UPDATE,
    INSIGHTS_READ,
    INSIGHTS_REFRESH,
    RBAC_READ,
    ADMIN_CACHE,
];
