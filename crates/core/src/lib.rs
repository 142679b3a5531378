//! `shopdesk-core`: shared building blocks.
//!
//! This crate contains identifiers, the domain error model and the clock
//! abstraction. No IO, no HTTP, no storage.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{require_non_blank, DomainError, DomainResult};
pub use id::{NotificationId, ProductId, SaleId, ShopId, SupplierId, TenantId, UserId};
