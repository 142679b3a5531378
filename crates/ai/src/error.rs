use thiserror::Error;

/// Failure of the read-only shop data query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("shop not found")]
    ShopNotFound,

    #[error("query failed: {0}")]
    Query(String),
}

/// Failure talking to the external language model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("language model is not configured")]
    NotConfigured,

    #[error("language model request timed out")]
    Timeout,

    #[error("language model returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("language model transport error: {0}")]
    Transport(String),

    #[error("language model response had no text content")]
    EmptyResponse,
}

/// Failure classification for insight generation.
///
/// Every variant is scoped to a single request; none of them leaves an entry
/// in the insights cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InsightError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("shop context missing")]
    ShopContextMissing,

    #[error("shop data unavailable: {0}")]
    DataUnavailable(String),

    #[error("insight generation failed: {0}")]
    GenerationFailure(String),

    #[error("model response could not be parsed: {0}")]
    ParseFailure(String),
}

impl InsightError {
    /// Stable machine-readable code (used in JSON error bodies and logs).
    pub fn code(&self) -> &'static str {
        match self {
            InsightError::NotAuthenticated => "not_authenticated",
            InsightError::ShopContextMissing => "shop_context_missing",
            InsightError::DataUnavailable(_) => "data_unavailable",
            InsightError::GenerationFailure(_) => "generation_failure",
            InsightError::ParseFailure(_) => "parse_failure",
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailure(msg.into())
    }
}

impl From<DataError> for InsightError {
    fn from(value: DataError) -> Self {
        InsightError::DataUnavailable(value.to_string())
    }
}

impl From<ModelError> for InsightError {
    fn from(value: ModelError) -> Self {
        InsightError::GenerationFailure(value.to_string())
    }
}
