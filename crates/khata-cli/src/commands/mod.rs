//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db) and init
//! - `accounts` - Account commands
//! - `import` - JSON statement row import
//! - `merchants` - Merchant rule commands
//! - `recurring` - Recurring payment commands
//! - `serve` - Web server command
//! - `transactions` - Transaction commands
//! - `transfers` - Self-transfer commands

pub mod accounts;
pub mod core;
pub mod import;
pub mod merchants;
pub mod recurring;
pub mod serve;
pub mod transactions;
pub mod transfers;

// Re-export command functions for main.rs
pub use accounts::*;
pub use core::*;
pub use import::*;
pub use merchants::*;
pub use recurring::*;
pub use serve::*;
pub use transactions::*;
pub use transfers::*;

/// All CLI commands act as the seeded local user
pub const LOCAL_USER: i64 = 1;

/// Truncate a string to a maximum char count, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
