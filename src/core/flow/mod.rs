//! Flow control: every rule is turned into a traffic shaping controller,
//! which answers whether more requests may pass right now.
mod rule;
mod rule_manager;
mod slot;
mod traffic_shaping;

pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
pub use traffic_shaping::*;
