use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shopdesk_core::{NotificationId, ProductId, ShopId, SupplierId, TenantId};

use crate::error::RepoResult;
use crate::records::{
    NewProduct, NewSale, NewShop, NewSupplier, Notification, Product, Sale, Shop, Supplier,
};

/// Tenant-scoped shop data access.
///
/// Every method takes the caller's tenant; records of other tenants behave
/// exactly like missing records (`RepoError::NotFound`).
#[async_trait]
pub trait ShopRepository: Send + Sync + 'static {
    async fn create_shop(&self, tenant_id: TenantId, new: NewShop) -> RepoResult<Shop>;
    async fn get_shop(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Shop>;
    async fn list_shops(&self, tenant_id: TenantId) -> RepoResult<Vec<Shop>>;

    /// Fails with `Conflict` when the SKU already exists in the shop.
    async fn add_product(&self, tenant_id: TenantId, shop_id: ShopId, new: NewProduct) -> RepoResult<Product>;
    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> RepoResult<Product>;
    async fn list_products(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Vec<Product>>;
    /// Apply a signed stock delta; a result below zero is a validation error.
    async fn adjust_stock(&self, tenant_id: TenantId, product_id: ProductId, delta: i64) -> RepoResult<Product>;

    /// Record a sale at the product's current price and take it out of stock.
    ///
    /// Emits a `low_stock` notification when the remaining stock is at or
    /// below the product's reorder level.
    async fn record_sale(&self, tenant_id: TenantId, shop_id: ShopId, new: NewSale) -> RepoResult<Sale>;
    /// Newest first.
    async fn list_sales(&self, tenant_id: TenantId, shop_id: ShopId, limit: usize) -> RepoResult<Vec<Sale>>;
    /// Sales with `since <= sold_at < until`, newest first, at most `limit`.
    async fn sales_between(
        &self,
        tenant_id: TenantId,
        shop_id: ShopId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> RepoResult<Vec<Sale>>;

    async fn register_supplier(&self, tenant_id: TenantId, new: NewSupplier) -> RepoResult<Supplier>;
    async fn get_supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> RepoResult<Supplier>;
    async fn list_suppliers(&self, tenant_id: TenantId) -> RepoResult<Vec<Supplier>>;

    /// Newest first.
    async fn list_notifications(&self, tenant_id: TenantId, unread_only: bool) -> RepoResult<Vec<Notification>>;
    async fn mark_notification_read(
        &self,
        tenant_id: TenantId,
        notification_id: NotificationId,
    ) -> RepoResult<Notification>;
}
