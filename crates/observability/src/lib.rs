//! Process-wide logging setup.

/// Tracing subscriber configuration (filters, formatting).
pub mod tracing;

/// Initialize process-wide structured logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let _ = tracing::init(tracing::DEFAULT_FILTER);
}
