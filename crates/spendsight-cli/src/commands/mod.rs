//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Input loading, shared output helpers and the config command
//! - `insights` - Analysis commands (suggest, savings, anomalies, forecast, insights)

pub mod core;
pub mod insights;

// Re-export command functions for main.rs
pub use core::*;
pub use insights::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
