//! mod `system` provides implementation of adaptive system protection.

mod rule;
mod rule_manager;
mod slot;

pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
