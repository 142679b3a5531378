//! In-memory `ShopRepository` for development and tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use shopdesk_core::{
    Clock, NotificationId, ProductId, SaleId, ShopId, SupplierId, SystemClock, TenantId,
};

use crate::error::{RepoError, RepoResult};
use crate::records::{
    NewProduct, NewSale, NewShop, NewSupplier, Notification, Product, Sale, Shop, Supplier,
};
use crate::repository::ShopRepository;
use crate::tenant_store::{InMemoryTenantStore, TenantStore};

pub struct InMemoryShopRepository {
    shops: InMemoryTenantStore<ShopId, Shop>,
    products: InMemoryTenantStore<ProductId, Product>,
    sales: InMemoryTenantStore<SaleId, Sale>,
    suppliers: InMemoryTenantStore<SupplierId, Supplier>,
    notifications: InMemoryTenantStore<NotificationId, Notification>,
    // Serializes read-modify-write sequences across the stores.
    writes: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryShopRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryShopRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shops: InMemoryTenantStore::new(),
            products: InMemoryTenantStore::new(),
            sales: InMemoryTenantStore::new(),
            suppliers: InMemoryTenantStore::new(),
            notifications: InMemoryTenantStore::new(),
            writes: Mutex::new(()),
            clock,
        }
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_shop(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Shop> {
        self.shops
            .get(tenant_id, &shop_id)
            .ok_or(RepoError::NotFound("shop"))
    }

    fn require_product(&self, tenant_id: TenantId, product_id: ProductId) -> RepoResult<Product> {
        self.products
            .get(tenant_id, &product_id)
            .ok_or(RepoError::NotFound("product"))
    }
}

fn newest_first<T>(items: &mut [T], at: impl Fn(&T) -> (DateTime<Utc>, uuid::Uuid)) {
    items.sort_by(|a, b| at(b).cmp(&at(a)));
}

#[async_trait]
impl ShopRepository for InMemoryShopRepository {
    async fn create_shop(&self, tenant_id: TenantId, new: NewShop) -> RepoResult<Shop> {
        let new = new.normalized()?;
        let shop = Shop {
            id: ShopId::new(),
            tenant_id,
            name: new.name,
            currency: new.currency,
            created_at: self.clock.now(),
        };
        self.shops.upsert(tenant_id, shop.id, shop.clone());
        Ok(shop)
    }

    async fn get_shop(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Shop> {
        self.require_shop(tenant_id, shop_id)
    }

    async fn list_shops(&self, tenant_id: TenantId) -> RepoResult<Vec<Shop>> {
        let mut shops = self.shops.list(tenant_id);
        shops.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(shops)
    }

    async fn add_product(&self, tenant_id: TenantId, shop_id: ShopId, new: NewProduct) -> RepoResult<Product> {
        let new = new.normalized()?;
        let _guard = self.write_lock();
        self.require_shop(tenant_id, shop_id)?;

        if let Some(supplier_id) = new.supplier_id {
            if self.suppliers.get(tenant_id, &supplier_id).is_none() {
                return Err(RepoError::validation(format!("unknown supplier {supplier_id}")));
            }
        }

        let duplicate = self
            .products
            .list(tenant_id)
            .into_iter()
            .any(|p| p.shop_id == shop_id && p.sku == new.sku);
        if duplicate {
            return Err(RepoError::conflict(format!("sku {} already exists in this shop", new.sku)));
        }

        let product = Product {
            id: ProductId::new(),
            shop_id,
            sku: new.sku,
            name: new.name,
            unit_price: new.unit_price,
            stock: new.stock,
            reorder_level: new.reorder_level,
            supplier_id: new.supplier_id,
            created_at: self.clock.now(),
        };
        self.products.upsert(tenant_id, product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> RepoResult<Product> {
        self.require_product(tenant_id, product_id)
    }

    async fn list_products(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Vec<Product>> {
        self.require_shop(tenant_id, shop_id)?;
        let mut products: Vec<Product> = self
            .products
            .list(tenant_id)
            .into_iter()
            .filter(|p| p.shop_id == shop_id)
            .collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }

    async fn adjust_stock(&self, tenant_id: TenantId, product_id: ProductId, delta: i64) -> RepoResult<Product> {
        let _guard = self.write_lock();
        let mut product = self.require_product(tenant_id, product_id)?;

        let stock = product
            .stock
            .checked_add(delta)
            .filter(|s| *s >= 0)
            .ok_or_else(|| {
                RepoError::validation(format!(
                    "stock for {} cannot go below zero ({} on hand, delta {delta})",
                    product.sku, product.stock
                ))
            })?;

        product.stock = stock;
        self.products.upsert(tenant_id, product.id, product.clone());
        Ok(product)
    }

    async fn record_sale(&self, tenant_id: TenantId, shop_id: ShopId, new: NewSale) -> RepoResult<Sale> {
        new.validate()?;
        let _guard = self.write_lock();
        self.require_shop(tenant_id, shop_id)?;

        let mut product = self
            .require_product(tenant_id, new.product_id)
            .ok()
            .filter(|p| p.shop_id == shop_id)
            .ok_or(RepoError::NotFound("product"))?;

        let quantity = i64::from(new.quantity);
        if quantity > product.stock {
            return Err(RepoError::validation(format!(
                "insufficient stock for {}: {} on hand, {quantity} requested",
                product.sku, product.stock
            )));
        }
        product.stock -= quantity;

        let now = self.clock.now();
        let sale = Sale {
            id: SaleId::new(),
            shop_id,
            product_id: product.id,
            quantity: new.quantity,
            unit_price: product.unit_price,
            sold_at: new.sold_at.unwrap_or(now),
        };

        self.products.upsert(tenant_id, product.id, product.clone());
        self.sales.upsert(tenant_id, sale.id, sale.clone());

        if product.is_low_on_stock() {
            let notification = Notification::low_stock(tenant_id, &product, now);
            info!(
                tenant = %tenant_id,
                shop = %shop_id,
                product = %product.id,
                stock = product.stock,
                "low stock"
            );
            self.notifications
                .upsert(tenant_id, notification.id, notification);
        }

        Ok(sale)
    }

    async fn list_sales(&self, tenant_id: TenantId, shop_id: ShopId, limit: usize) -> RepoResult<Vec<Sale>> {
        self.require_shop(tenant_id, shop_id)?;
        let mut sales: Vec<Sale> = self
            .sales
            .list(tenant_id)
            .into_iter()
            .filter(|s| s.shop_id == shop_id)
            .collect();
        newest_first(&mut sales, |s| (s.sold_at, *s.id.as_uuid()));
        sales.truncate(limit);
        Ok(sales)
    }

    async fn sales_between(
        &self,
        tenant_id: TenantId,
        shop_id: ShopId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> RepoResult<Vec<Sale>> {
        self.require_shop(tenant_id, shop_id)?;
        let mut sales: Vec<Sale> = self
            .sales
            .list(tenant_id)
            .into_iter()
            .filter(|s| s.shop_id == shop_id && since <= s.sold_at && s.sold_at < until)
            .collect();
        newest_first(&mut sales, |s| (s.sold_at, *s.id.as_uuid()));
        sales.truncate(limit);
        Ok(sales)
    }

    async fn register_supplier(&self, tenant_id: TenantId, new: NewSupplier) -> RepoResult<Supplier> {
        let new = new.normalized()?;
        let supplier = Supplier {
            id: SupplierId::new(),
            tenant_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            created_at: self.clock.now(),
        };
        self.suppliers.upsert(tenant_id, supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn get_supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> RepoResult<Supplier> {
        self.suppliers
            .get(tenant_id, &supplier_id)
            .ok_or(RepoError::NotFound("supplier"))
    }

    async fn list_suppliers(&self, tenant_id: TenantId) -> RepoResult<Vec<Supplier>> {
        let mut suppliers = self.suppliers.list(tenant_id);
        suppliers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(suppliers)
    }

    async fn list_notifications(&self, tenant_id: TenantId, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .list(tenant_id)
            .into_iter()
            .filter(|n| !unread_only || !n.read)
            .collect();
        newest_first(&mut notifications, |n| (n.created_at, *n.id.as_uuid()));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        tenant_id: TenantId,
        notification_id: NotificationId,
    ) -> RepoResult<Notification> {
        let _guard = self.write_lock();
        let mut notification = self
            .notifications
            .get(tenant_id, &notification_id)
            .ok_or(RepoError::NotFound("notification"))?;
        notification.read = true;
        self.notifications
            .upsert(tenant_id, notification.id, notification.clone());
        Ok(notification)
    }
}
