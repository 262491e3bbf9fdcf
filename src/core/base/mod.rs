//! Basic abstractions shared by all the slots:
//! the resource, the entry and its context, the slot chain, the rule checking result
//! and the statistic traits.
//!
pub mod call_context;
mod block_error;
mod cancel;
mod constant;
mod context;
mod entry;
mod resource;
mod result;
mod rule;
mod slot_chain;
mod stat;

pub use block_error::*;
pub use call_context::CallContext;
pub use cancel::*;
pub use constant::*;
pub use context::*;
pub use entry::*;
pub use resource::*;
pub use result::*;
pub use rule::*;
pub use slot_chain::*;
pub use stat::*;
