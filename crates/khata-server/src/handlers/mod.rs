//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod imports;
pub mod merchants;
pub mod recurring;
pub mod transactions;
pub mod transfers;

// Re-export all handlers for use in router
pub use accounts::*;
pub use imports::*;
pub use merchants::*;
pub use recurring::*;
pub use transactions::*;
pub use transfers::*;
