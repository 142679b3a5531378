use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use shopdesk_ai::{DataError, InventoryLevel, SaleRecord, ShopDataSource, ShopSnapshot, SnapshotWindow};
use shopdesk_core::{ShopId, TenantId};

use crate::error::RepoError;
use crate::repository::ShopRepository;

/// Read-only view of a `ShopRepository` for insight generation.
pub struct ShopSnapshotReader<R: ?Sized> {
    repo: Arc<R>,
}

impl<R: ?Sized> ShopSnapshotReader<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

fn data_error(e: RepoError) -> DataError {
    match e {
        RepoError::NotFound(_) => DataError::ShopNotFound,
        other => DataError::Query(other.to_string()),
    }
}

#[async_trait]
impl<R> ShopDataSource for ShopSnapshotReader<R>
where
    R: ShopRepository + ?Sized,
{
    async fn snapshot(
        &self,
        tenant_id: TenantId,
        shop_id: ShopId,
        window: SnapshotWindow,
    ) -> Result<ShopSnapshot, DataError> {
        let shop = self.repo.get_shop(tenant_id, shop_id).await.map_err(data_error)?;
        let products = self
            .repo
            .list_products(tenant_id, shop_id)
            .await
            .map_err(data_error)?;
        let sales = self
            .repo
            .sales_between(tenant_id, shop_id, window.since, window.until, window.max_sales)
            .await
            .map_err(data_error)?;

        let by_id: HashMap<_, _> = products.iter().map(|p| (p.id, p)).collect();
        let sales = sales
            .into_iter()
            .map(|s| {
                let (name, sku) = by_id
                    .get(&s.product_id)
                    .map(|p| (p.name.clone(), p.sku.clone()))
                    .unwrap_or_else(|| ("unknown product".to_string(), String::new()));
                SaleRecord {
                    product_id: s.product_id,
                    product_name: name,
                    sku,
                    quantity: i64::from(s.quantity),
                    unit_price: s.unit_price,
                    sold_at: s.sold_at,
                }
            })
            .collect();

        let inventory = products
            .iter()
            .map(|p| InventoryLevel {
                product_id: p.id,
                product_name: p.name.clone(),
                sku: p.sku.clone(),
                stock: p.stock,
                reorder_level: p.reorder_level,
            })
            .collect();

        Ok(ShopSnapshot {
            tenant_id,
            shop_id,
            shop_name: shop.name,
            currency: shop.currency,
            window_since: window.since,
            window_until: window.until,
            sales,
            inventory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::memory::InMemoryShopRepository;
    use crate::records::{NewProduct, NewSale, NewShop};

    #[tokio::test]
    async fn snapshot_joins_sales_with_product_names() {
        let repo = Arc::new(InMemoryShopRepository::new());
        let tenant = TenantId::new();
        let shop = repo
            .create_shop(
                tenant,
                NewShop {
                    name: "shop-1".to_string(),
                    currency: "EUR".to_string(),
                },
            )
            .await
            .unwrap();
        let tea = repo
            .add_product(
                tenant,
                shop.id,
                NewProduct {
                    sku: "T-1".to_string(),
                    name: "Tea".to_string(),
                    unit_price: 300,
                    stock: 50,
                    reorder_level: 5,
                    supplier_id: None,
                },
            )
            .await
            .unwrap();
        let now = Utc::now();
        for i in 0..5 {
            repo.record_sale(
                tenant,
                shop.id,
                NewSale {
                    product_id: tea.id,
                    quantity: 2,
                    sold_at: Some(now - Duration::hours(i + 1)),
                },
            )
            .await
            .unwrap();
        }

        let reader: ShopSnapshotReader<dyn ShopRepository> = ShopSnapshotReader::new(repo);
        let window = SnapshotWindow::ending_at(now, 30, 3);
        let snap = reader.snapshot(tenant, shop.id, window).await.unwrap();

        assert_eq!(snap.shop_name, "shop-1");
        assert_eq!(snap.sales.len(), 3, "bounded by max_sales");
        assert_eq!(snap.sales[0].product_name, "Tea");
        assert_eq!(snap.sales[0].sold_at, now - Duration::hours(1));
        assert_eq!(snap.inventory[0].stock, 40);
    }

    #[tokio::test]
    async fn unknown_or_foreign_shop_is_not_found() {
        let repo = Arc::new(InMemoryShopRepository::new());
        let tenant = TenantId::new();
        let shop = repo
            .create_shop(
                tenant,
                NewShop {
                    name: "mine".to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
            .unwrap();
        let reader = ShopSnapshotReader::new(repo);
        let window = SnapshotWindow::ending_at(Utc::now(), 30, 50);

        assert_eq!(
            reader.snapshot(TenantId::new(), shop.id, window).await,
            Err(DataError::ShopNotFound)
        );
        assert_eq!(
            reader.snapshot(tenant, ShopId::new(), window).await,
            Err(DataError::ShopNotFound)
        );
    }
}
