use super::NodeStorage;
use crate::base::{BaseSlot, BlockError, ContextPtr, ProcessorSlot, SlotCursor};
use crate::logging;
use std::sync::Arc;

pub const NODE_SELECTOR_SLOT_ORDER: u32 = 1000;

/// Binds the resource node to the context, the node is created on the first call.
pub struct NodeSelectorSlot {
    storage: Arc<NodeStorage>,
}

impl NodeSelectorSlot {
    pub fn new(storage: Arc<NodeStorage>) -> Self {
        NodeSelectorSlot { storage }
    }
}

impl BaseSlot for NodeSelectorSlot {
    fn order(&self) -> u32 {
        NODE_SELECTOR_SLOT_ORDER
    }
}

impl ProcessorSlot for NodeSelectorSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let resource = ctx.read().unwrap().resource().clone();
        match self
            .storage
            .get_or_create_resource_node(resource.name(), *resource.resource_type())
        {
            Ok(node) => ctx.write().unwrap().set_stat_node(node),
            Err(err) => logging::FREQUENT_ERROR_ONCE.call_once(|| {
                logging::error!(
                    "[NodeSelectorSlot entry] Fail to create the resource node, resource: {}, error: {:?}",
                    resource.name(),
                    err
                );
            }),
        }
        next.fire_entry(ctx)
    }
}
