//! `shopdesk-store`
//!
//! **Responsibility:** tenant-scoped shop data (shops, products, sales,
//! suppliers, notifications) behind the `ShopRepository` trait, plus the
//! read-only snapshot adapter consumed by the insights aggregator.
//!
//! The in-memory repository is the default; a Postgres implementation is
//! available behind the `postgres` feature.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod records;
pub mod repository;
pub mod snapshot_reader;
pub mod tenant_store;

pub use error::{RepoError, RepoResult};
pub use memory::InMemoryShopRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresShopRepository;
pub use records::{
    NewProduct, NewSale, NewShop, NewSupplier, Notification, NotificationKind, Product, Sale, Shop, Supplier,
};
pub use repository::ShopRepository;
pub use snapshot_reader::ShopSnapshotReader;
pub use tenant_store::{InMemoryTenantStore, TenantStore};
