use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{ProductId, ShopId, TenantId};

use crate::error::DataError;

/// Bounds of the read-only data query: at most `max_sales` sales sold in
/// `[since, until)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SnapshotWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub max_sales: usize,
}

/// Longest sales window accepted from configuration (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

impl SnapshotWindow {
    /// Window of `days` ending at `until`. A window reaching past the earliest
    /// representable time starts there instead.
    pub fn ending_at(until: DateTime<Utc>, days: u32, max_sales: usize) -> Self {
        Self {
            since: until
                .checked_sub_signed(Duration::days(i64::from(days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            until,
            max_sales,
        }
    }

    pub fn days(&self) -> i64 {
        (self.until - self.since).num_days().max(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since <= at && at < self.until
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub quantity: i64,
    /// Unit price in minor currency units.
    pub unit_price: u64,
    pub sold_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub stock: i64,
    pub reorder_level: i64,
}

/// Everything the prompt needs about one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSnapshot {
    pub tenant_id: TenantId,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub currency: String,
    pub window_since: DateTime<Utc>,
    pub window_until: DateTime<Utc>,
    /// Newest first.
    pub sales: Vec<SaleRecord>,
    pub inventory: Vec<InventoryLevel>,
}

/// Read-only access to shop data for insight generation.
///
/// Implementations must reject unknown shops (or shops of another tenant) with
/// `DataError::ShopNotFound`.
#[async_trait]
pub trait ShopDataSource: Send + Sync + 'static {
    async fn snapshot(
        &self,
        tenant_id: TenantId,
        shop_id: ShopId,
        window: SnapshotWindow,
    ) -> Result<ShopSnapshot, DataError>;
}

/// Per-product totals over the snapshot window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSalesSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub units_sold: i64,
    /// Minor currency units.
    pub revenue: u64,
    pub stock: Option<i64>,
    pub reorder_level: Option<i64>,
    /// Average units per day over the window.
    pub daily_velocity: f64,
    /// Days until stock runs out at the current velocity.
    pub days_of_cover: Option<f64>,
}

impl ShopSnapshot {
    pub fn window_days(&self) -> i64 {
        (self.window_until - self.window_since).num_days().max(1)
    }

    /// Deterministic per-product aggregation, ordered by units sold
    /// (descending) then product name.
    ///
    /// Products with stock but no sales in the window are included with zero
    /// totals so slow movers are visible to the model.
    pub fn summarize(&self) -> Vec<ProductSalesSummary> {
        let days = self.window_days() as f64;
        let mut by_product: BTreeMap<ProductId, ProductSalesSummary> = BTreeMap::new();

        for level in &self.inventory {
            by_product.insert(
                level.product_id,
                ProductSalesSummary {
                    product_id: level.product_id,
                    product_name: level.product_name.clone(),
                    sku: level.sku.clone(),
                    units_sold: 0,
                    revenue: 0,
                    stock: Some(level.stock),
                    reorder_level: Some(level.reorder_level),
                    daily_velocity: 0.0,
                    days_of_cover: None,
                },
            );
        }

        for sale in &self.sales {
            let entry = by_product
                .entry(sale.product_id)
                .or_insert_with(|| ProductSalesSummary {
                    product_id: sale.product_id,
                    product_name: sale.product_name.clone(),
                    sku: sale.sku.clone(),
                    units_sold: 0,
                    revenue: 0,
                    stock: None,
                    reorder_level: None,
                    daily_velocity: 0.0,
                    days_of_cover: None,
                });
            entry.units_sold += sale.quantity;
            entry.revenue = entry
                .revenue
                .saturating_add(sale.unit_price.saturating_mul(sale.quantity.max(0) as u64));
        }

        let mut out: Vec<ProductSalesSummary> = by_product
            .into_values()
            .map(|mut s| {
                s.daily_velocity = s.units_sold as f64 / days;
                if s.daily_velocity > 0.0 {
                    s.days_of_cover = s.stock.map(|stock| stock.max(0) as f64 / s.daily_velocity);
                }
                s
            })
            .collect();

        out.sort_by(|a, b| {
            b.units_sold
                .cmp(&a.units_sold)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        out
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn window_bounds_are_half_open() {
        let now = Utc::now();
        let w = SnapshotWindow::ending_at(now, 7, 50);
        assert_eq!(w.days(), 7);
        assert!(w.contains(now - Duration::days(7)));
        assert!(!w.contains(now));
    }

    #[test]
    fn oversized_window_starts_at_earliest_time() {
        let now = Utc::now();
        let w = SnapshotWindow::ending_at(now, u32::MAX, 50);
        assert_eq!(w.since, DateTime::<Utc>::MIN_UTC);
        assert!(w.days() > 0);
        assert!(w.contains(now - Duration::days(i64::from(MAX_WINDOW_DAYS))));
    }

    #[test]
    fn summarize_totals_units_and_revenue_per_product() {
        let now = Utc::now();
        let snap = shop_one(TenantId::new(), ShopId::new(), now);
        let summary = snap.summarize();

        assert_eq!(summary.len(), 2);
        let coffee = &summary[0];
        assert_eq!(coffee.product_name, "coffee");
        // sales i = 1,2,4,5,7,8 -> 6 sales x 2 units
        assert_eq!(coffee.units_sold, 12);
        assert_eq!(coffee.revenue, 12 * 450);
        assert!((coffee.daily_velocity - 12.0 / 30.0).abs() < 1e-9);
        assert!((coffee.days_of_cover.unwrap() - 30.0).abs() < 1e-9);

        let tea = &summary[1];
        assert_eq!(tea.units_sold, 8);
    }

    #[test]
    fn unsold_products_are_kept_with_zero_velocity() {
        let now = Utc::now();
        let idle = level("umbrella", 3, 1);
        let snap = ShopSnapshot {
            tenant_id: TenantId::new(),
            shop_id: ShopId::new(),
            shop_name: "rainy".to_string(),
            currency: "GBP".to_string(),
            window_since: now - Duration::days(30),
            window_until: now,
            sales: vec![],
            inventory: vec![idle],
        };

        let summary = snap.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].units_sold, 0);
        assert_eq!(summary[0].days_of_cover, None);
    }
}
