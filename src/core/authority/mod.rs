//! Authority rules: white/black lists of the callers (origins) of a resource.
mod rule;
mod rule_manager;
mod slot;

pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
