//! The `stat` mod implements the statistic slots and the basic data structures,
//! such as the sliding window and its underlying LeapArray.
mod base;
mod cluster_builder_slot;
mod node_selector_slot;
mod node_storage;
mod resource_node;
mod stat_slot;

pub use base::*;
pub use cluster_builder_slot::*;
pub use node_selector_slot::*;
pub use node_storage::*;
pub use resource_node::*;
pub use stat_slot::*;
