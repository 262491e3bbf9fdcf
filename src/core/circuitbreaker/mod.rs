//! Circuit breaking: every rule is bound to a breaker,
//! a state machine driven by the outcome of the passed calls.
pub mod breaker;
mod rule;
mod rule_manager;
mod slot;

pub use breaker::*;
pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
