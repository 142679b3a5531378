//! Postgres-backed `ShopRepository`.
//!
//! Every statement filters on `tenant_id`, so a record of another tenant is
//! indistinguishable from a missing one.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepoError |
//! |------------|----------------------|-----------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Validation` |
//! | Database (other) | Any other | `Storage` |
//! | Other (pool, network, decode) | N/A | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{info, instrument};

use shopdesk_core::{
    Clock, NotificationId, ProductId, SaleId, ShopId, SupplierId, SystemClock, TenantId,
};

use crate::error::{RepoError, RepoResult};
use crate::records::{
    NewProduct, NewSale, NewShop, NewSupplier, Notification, NotificationKind, Product, Sale, Shop, Supplier,
};
use crate::repository::ShopRepository;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS shops (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        name        TEXT NOT NULL,
        currency    TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        name        TEXT NOT NULL,
        email       TEXT NULL,
        phone       TEXT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id            UUID PRIMARY KEY,
        tenant_id     UUID NOT NULL,
        shop_id       UUID NOT NULL REFERENCES shops (id),
        sku           TEXT NOT NULL,
        name          TEXT NOT NULL,
        unit_price    BIGINT NOT NULL CHECK (unit_price >= 0),
        stock         BIGINT NOT NULL CHECK (stock >= 0),
        reorder_level BIGINT NOT NULL CHECK (reorder_level >= 0),
        supplier_id   UUID NULL REFERENCES suppliers (id),
        created_at    TIMESTAMPTZ NOT NULL,
        UNIQUE (tenant_id, shop_id, sku)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        shop_id     UUID NOT NULL REFERENCES shops (id),
        product_id  UUID NOT NULL REFERENCES products (id),
        quantity    BIGINT NOT NULL CHECK (quantity > 0),
        unit_price  BIGINT NOT NULL,
        sold_at     TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sales_by_shop_time ON sales (tenant_id, shop_id, sold_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        shop_id     UUID NULL,
        kind        TEXT NOT NULL,
        message     TEXT NOT NULL,
        read        BOOLEAN NOT NULL DEFAULT FALSE,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
];

const PRODUCT_COLUMNS: &str =
    "id, shop_id, sku, name, unit_price, stock, reorder_level, supplier_id, created_at";

#[derive(Clone)]
pub struct PostgresShopRepository {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl PostgresShopRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            clock: Arc::new(SystemClock),
        }
    }

    /// Connect, then create the schema if it does not exist yet.
    pub async fn connect(database_url: &str) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub async fn ensure_schema(&self) -> RepoResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> RepoResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
    }

    async fn product_for_update(
        tx: &mut Transaction<'static, Postgres>,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> RepoResult<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(*tenant_id.as_uuid())
        .bind(*product_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("product_for_update", e))?
        .ok_or(RepoError::NotFound("product"))?;
        decode("product", product_from_row(&row))
    }
}

#[async_trait]
impl ShopRepository for PostgresShopRepository {
    #[instrument(skip(self, new), fields(tenant_id = %tenant_id), err)]
    async fn create_shop(&self, tenant_id: TenantId, new: NewShop) -> RepoResult<Shop> {
        let new = new.normalized()?;
        let shop = Shop {
            id: ShopId::new(),
            tenant_id,
            name: new.name,
            currency: new.currency,
            created_at: self.clock.now(),
        };
        sqlx::query("INSERT INTO shops (id, tenant_id, name, currency, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(*shop.id.as_uuid())
            .bind(*tenant_id.as_uuid())
            .bind(&shop.name)
            .bind(&shop.currency)
            .bind(shop.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_shop", e))?;
        Ok(shop)
    }

    async fn get_shop(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Shop> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, currency, created_at FROM shops WHERE tenant_id = $1 AND id = $2",
        )
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_shop", e))?
        .ok_or(RepoError::NotFound("shop"))?;
        decode("shop", shop_from_row(&row))
    }

    async fn list_shops(&self, tenant_id: TenantId) -> RepoResult<Vec<Shop>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, name, currency, created_at FROM shops WHERE tenant_id = $1 ORDER BY name, id",
        )
        .bind(*tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_shops", e))?;
        rows.iter().map(|r| decode("shop", shop_from_row(r))).collect()
    }

    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, shop_id = %shop_id), err)]
    async fn add_product(&self, tenant_id: TenantId, shop_id: ShopId, new: NewProduct) -> RepoResult<Product> {
        let new = new.normalized()?;
        self.get_shop(tenant_id, shop_id).await?;
        if let Some(supplier_id) = new.supplier_id {
            if let Err(RepoError::NotFound(_)) = self.get_supplier(tenant_id, supplier_id).await {
                return Err(RepoError::validation(format!("unknown supplier {supplier_id}")));
            }
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

        sqlx::query(
            r#"
            INSERT INTO products
                (id, tenant_id, shop_id, sku, name, unit_price, stock, reorder_level, supplier_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(to_db_amount("unit_price", product.unit_price)?)
        .bind(product.stock)
        .bind(product.reorder_level)
        .bind(product.supplier_id.map(|s| *s.as_uuid()))
        .bind(product.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_product", e))?;
        Ok(product)
    }

    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> RepoResult<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(*tenant_id.as_uuid())
        .bind(*product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?
        .ok_or(RepoError::NotFound("product"))?;
        decode("product", product_from_row(&row))
    }

    async fn list_products(&self, tenant_id: TenantId, shop_id: ShopId) -> RepoResult<Vec<Product>> {
        self.get_shop(tenant_id, shop_id).await?;
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND shop_id = $2 ORDER BY sku"
        ))
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(|r| decode("product", product_from_row(r))).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    async fn adjust_stock(&self, tenant_id: TenantId, product_id: ProductId, delta: i64) -> RepoResult<Product> {
        let mut tx = self.begin().await?;
        let mut product = Self::product_for_update(&mut tx, tenant_id, product_id).await?;

        product.stock = product
            .stock
            .checked_add(delta)
            .filter(|s| *s >= 0)
            .ok_or_else(|| {
                RepoError::validation(format!(
                    "stock for {} cannot go below zero ({} on hand, delta {delta})",
                    product.sku, product.stock
                ))
            })?;

        sqlx::query("UPDATE products SET stock = $3 WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*product_id.as_uuid())
            .bind(product.stock)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_stock", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("adjust_stock", e))?;
        Ok(product)
    }

    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, shop_id = %shop_id), err)]
    async fn record_sale(&self, tenant_id: TenantId, shop_id: ShopId, new: NewSale) -> RepoResult<Sale> {
        new.validate()?;
        self.get_shop(tenant_id, shop_id).await?;

        let mut tx = self.begin().await?;
        let mut product = Self::product_for_update(&mut tx, tenant_id, new.product_id).await?;
        if product.shop_id != shop_id {
            return Err(RepoError::NotFound("product"));
        }

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

        sqlx::query("UPDATE products SET stock = $3 WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*product.id.as_uuid())
            .bind(product.stock)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("record_sale", e))?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, tenant_id, shop_id, product_id, quantity, unit_price, sold_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*sale.id.as_uuid())
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .bind(*sale.product_id.as_uuid())
        .bind(quantity)
        .bind(to_db_amount("unit_price", sale.unit_price)?)
        .bind(sale.sold_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_sale", e))?;

        if product.is_low_on_stock() {
            let n = Notification::low_stock(tenant_id, &product, now);
            sqlx::query(
                r#"
                INSERT INTO notifications (id, tenant_id, shop_id, kind, message, read, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(*n.id.as_uuid())
            .bind(*tenant_id.as_uuid())
            .bind(n.shop_id.map(|s| *s.as_uuid()))
            .bind(n.kind.as_str())
            .bind(&n.message)
            .bind(n.read)
            .bind(n.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("record_sale", e))?;
            info!(product = %product.id, stock = product.stock, "low stock");
        }

        tx.commit().await.map_err(|e| map_sqlx_error("record_sale", e))?;
        Ok(sale)
    }

    async fn list_sales(&self, tenant_id: TenantId, shop_id: ShopId, limit: usize) -> RepoResult<Vec<Sale>> {
        self.get_shop(tenant_id, shop_id).await?;
        let rows = sqlx::query(
            r#"
            SELECT id, shop_id, product_id, quantity, unit_price, sold_at
            FROM sales
            WHERE tenant_id = $1 AND shop_id = $2
            ORDER BY sold_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .bind(to_db_limit(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales", e))?;
        rows.iter().map(|r| decode("sale", sale_from_row(r))).collect()
    }

    async fn sales_between(
        &self,
        tenant_id: TenantId,
        shop_id: ShopId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> RepoResult<Vec<Sale>> {
        self.get_shop(tenant_id, shop_id).await?;
        let rows = sqlx::query(
            r#"
            SELECT id, shop_id, product_id, quantity, unit_price, sold_at
            FROM sales
            WHERE tenant_id = $1 AND shop_id = $2 AND sold_at >= $3 AND sold_at < $4
            ORDER BY sold_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*shop_id.as_uuid())
        .bind(since)
        .bind(until)
        .bind(to_db_limit(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sales_between", e))?;
        rows.iter().map(|r| decode("sale", sale_from_row(r))).collect()
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
        sqlx::query(
            "INSERT INTO suppliers (id, tenant_id, name, email, phone, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*supplier.id.as_uuid())
        .bind(*tenant_id.as_uuid())
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(supplier.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_supplier", e))?;
        Ok(supplier)
    }

    async fn get_supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> RepoResult<Supplier> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, email, phone, created_at FROM suppliers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(*tenant_id.as_uuid())
        .bind(*supplier_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_supplier", e))?
        .ok_or(RepoError::NotFound("supplier"))?;
        decode("supplier", supplier_from_row(&row))
    }

    async fn list_suppliers(&self, tenant_id: TenantId) -> RepoResult<Vec<Supplier>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, name, email, phone, created_at FROM suppliers WHERE tenant_id = $1 ORDER BY name, id",
        )
        .bind(*tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_suppliers", e))?;
        rows.iter().map(|r| decode("supplier", supplier_from_row(r))).collect()
    }

    async fn list_notifications(&self, tenant_id: TenantId, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, shop_id, kind, message, read, created_at
            FROM notifications
            WHERE tenant_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(unread_only)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_notifications", e))?;
        rows.iter()
            .map(|r| decode("notification", notification_from_row(r)))
            .collect()
    }

    async fn mark_notification_read(
        &self,
        tenant_id: TenantId,
        notification_id: NotificationId,
    ) -> RepoResult<Notification> {
        let row = sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, shop_id, kind, message, read, created_at
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*notification_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_notification_read", e))?
        .ok_or(RepoError::NotFound("notification"))?;
        decode("notification", notification_from_row(&row))
    }
}

fn decode<T>(what: &str, result: Result<T, sqlx::Error>) -> RepoResult<T> {
    result.map_err(|e| RepoError::storage(format!("failed to decode {what} row: {e}")))
}

fn to_db_amount(field: &str, value: u64) -> RepoResult<i64> {
    i64::try_from(value).map_err(|_| RepoError::validation(format!("{field} is out of range")))
}

fn to_db_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn from_db_amount(value: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn shop_from_row(row: &PgRow) -> Result<Shop, sqlx::Error> {
    Ok(Shop {
        id: ShopId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        name: row.try_get("name")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let supplier: Option<uuid::Uuid> = row.try_get("supplier_id")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        shop_id: ShopId::from_uuid(row.try_get("shop_id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        unit_price: from_db_amount(row.try_get("unit_price")?)?,
        stock: row.try_get("stock")?,
        reorder_level: row.try_get("reorder_level")?,
        supplier_id: supplier.map(SupplierId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

fn sale_from_row(row: &PgRow) -> Result<Sale, sqlx::Error> {
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Sale {
        id: SaleId::from_uuid(row.try_get("id")?),
        shop_id: ShopId::from_uuid(row.try_get("shop_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: u32::try_from(quantity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        unit_price: from_db_amount(row.try_get("unit_price")?)?,
        sold_at: row.try_get("sold_at")?,
    })
}

fn supplier_from_row(row: &PgRow) -> Result<Supplier, sqlx::Error> {
    Ok(Supplier {
        id: SupplierId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let shop: Option<uuid::Uuid> = row.try_get("shop_id")?;
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        shop_id: shop.map(ShopId::from_uuid),
        kind: NotificationKind::parse(&kind)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown notification kind {kind}").into()))?,
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepoError::Conflict(msg),
                Some("23514") => RepoError::Validation(msg),
                _ => RepoError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => RepoError::storage(format!("connection pool closed in {operation}")),
        other => RepoError::storage(format!("sqlx error in {operation}: {other}")),
    }
}
