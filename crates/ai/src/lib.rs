//! `shopdesk-ai`
//!
//! **Responsibility:** AI insights for a shop (sales predictions, a summary and
//! restocking suggestions), generated by an external language model and
//! cached per shop with a TTL.
//!
//! This crate stays storage-agnostic and HTTP-agnostic:
//! - shop data comes in through the `ShopDataSource` trait (implemented by the
//!   store crate);
//! - the model is reached through the `LanguageModel` trait;
//! - it never mutates shop data. Insights are read-only outputs.

pub mod aggregator;
pub mod bundle;
pub mod cache;
pub mod error;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod snapshot;

pub use aggregator::{AggregatorConfig, InsightsAggregator};
pub use bundle::{InsightBundle, PredictionItem, RestockSuggestion, Urgency};
pub use cache::{CacheKey, InsightsCache, TtlCache};
pub use error::{DataError, InsightError, ModelError};
pub use model::{AnthropicModel, DisabledModel, LanguageModel, ModelConfig};
pub use prompt::Prompt;
pub use snapshot::{InventoryLevel, MAX_WINDOW_DAYS, ProductSalesSummary, SaleRecord, ShopDataSource, ShopSnapshot, SnapshotWindow};
