//! Shop domain records and their creation inputs.
//!
//! Records are plain data: the repositories own every state change and the
//! rules that come with it (non-negative stock, low-stock notifications).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{
    DomainError, DomainResult, NotificationId, ProductId, SaleId, ShopId, SupplierId, TenantId, require_non_blank,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub tenant_id: TenantId,
    pub name: String,
    /// ISO 4217 code, upper case.
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub sku: String,
    pub name: String,
    /// Minor currency units.
    pub unit_price: u64,
    pub stock: i64,
    pub reorder_level: i64,
    pub supplier_id: Option<SupplierId>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_on_stock(&self) -> bool {
        self.stock <= self.reorder_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price at the time of sale, minor currency units.
    pub unit_price: u64,
    pub sold_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::LowStock => "low_stock",
            NotificationKind::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low_stock" => Some(NotificationKind::LowStock),
            "info" => Some(NotificationKind::Info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub shop_id: Option<ShopId>,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn low_stock(tenant_id: TenantId, product: &Product, at: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            tenant_id,
            shop_id: Some(product.shop_id),
            kind: NotificationKind::LowStock,
            message: format!(
                "{} ({}) is low on stock: {} left, reorder level {}",
                product.name, product.sku, product.stock, product.reorder_level
            ),
            read: false,
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub currency: String,
}

impl NewShop {
    /// Trim fields and upper-case the currency.
    pub fn normalized(self) -> DomainResult<Self> {
        require_non_blank("name", &self.name)?;
        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(
                "currency must be a three-letter code",
            ));
        }
        Ok(Self {
            name: self.name.trim().to_string(),
            currency,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub unit_price: u64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
}

impl NewProduct {
    pub fn normalized(self) -> DomainResult<Self> {
        require_non_blank("sku", &self.sku)?;
        require_non_blank("name", &self.name)?;
        if self.stock < 0 {
            return Err(DomainError::validation("stock must not be negative"));
        }
        if self.reorder_level < 0 {
            return Err(DomainError::validation(
                "reorder_level must not be negative",
            ));
        }
        Ok(Self {
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSale {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Defaults to the repository clock.
    #[serde(default)]
    pub sold_at: Option<DateTime<Utc>>,
}

impl NewSale {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewSupplier {
    pub fn normalized(self) -> DomainResult<Self> {
        require_non_blank("name", &self.name)?;
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self {
            name: self.name.trim().to_string(),
            email: clean(self.email),
            phone: clean(self.phone),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_shop_normalizes_currency() {
        let shop = NewShop {
            name: " Corner Store ".to_string(),
            currency: "eur".to_string(),
        }
        .normalized()
        .unwrap();
        assert_eq!(shop.name, "Corner Store");
        assert_eq!(shop.currency, "EUR");
    }

    #[test]
    fn new_shop_rejects_bad_currency() {
        let err = NewShop {
            name: "x".to_string(),
            currency: "euro".to_string(),
        }
        .normalized()
        .unwrap_err();
        assert!(err.to_string().contains("currency"));
    }

    #[test]
    fn new_product_rejects_blank_sku_and_negative_stock() {
        let base = NewProduct {
            sku: "  ".to_string(),
            name: "Coffee".to_string(),
            unit_price: 450,
            stock: 1,
            reorder_level: 0,
            supplier_id: None,
        };
        assert!(base.clone().normalized().is_err());

        let negative = NewProduct {
            sku: "C-1".to_string(),
            stock: -1,
            ..base
        };
        assert!(negative.normalized().is_err());
    }

    #[test]
    fn zero_quantity_sale_is_invalid() {
        let sale = NewSale {
            product_id: ProductId::new(),
            quantity: 0,
            sold_at: None,
        };
        assert!(sale.validate().is_err());
    }

    #[test]
    fn supplier_contact_fields_drop_blanks() {
        let s = NewSupplier {
            name: "Beans Ltd".to_string(),
            email: Some("  ".to_string()),
            phone: Some(" 0123 ".to_string()),
        }
        .normalized()
        .unwrap();
        assert_eq!(s.email, None);
        assert_eq!(s.phone.as_deref(), Some("0123"));
    }

    #[test]
    fn notification_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::LowStock).unwrap();
        assert_eq!(json, "\"low_stock\"");
        assert_eq!(NotificationKind::parse("info"), Some(NotificationKind::Info));
    }
}
