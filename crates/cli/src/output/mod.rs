//! Output formatting
//!
//! Human-readable output with colors and tables, or strict JSON for scripts.

mod formatter;

pub use formatter::Formatter;

/// Output settings taken from the global flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Emit JSON instead of human-readable text
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
