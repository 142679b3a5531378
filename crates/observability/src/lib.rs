//! Tracing/logging setup shared by binaries and integration tests.

pub mod tracing;

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}
