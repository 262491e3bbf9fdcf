use super::NodeStorage;
use crate::base::{BaseSlot, BlockError, ContextPtr, ProcessorSlot, SlotCursor};
use crate::logging;
use std::sync::Arc;

pub const CLUSTER_BUILDER_SLOT_ORDER: u32 = 2000;

/// Binds the node of the (resource, origin) pair when the caller is known,
/// so that the calls from different origins are counted apart.
pub struct ClusterBuilderSlot {
    storage: Arc<NodeStorage>,
}

impl ClusterBuilderSlot {
    pub fn new(storage: Arc<NodeStorage>) -> Self {
        ClusterBuilderSlot { storage }
    }
}

impl BaseSlot for ClusterBuilderSlot {
    fn order(&self) -> u32 {
        CLUSTER_BUILDER_SLOT_ORDER
    }
}

impl ProcessorSlot for ClusterBuilderSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let (resource, origin) = {
            let ctx = ctx.read().unwrap();
            (ctx.resource().clone(), ctx.origin().to_owned())
        };
        if !origin.is_empty() {
            match self.storage.get_or_create_origin_node(
                resource.name(),
                *resource.resource_type(),
                &origin,
            ) {
                Ok(node) => ctx.write().unwrap().set_origin_node(node),
                Err(err) => logging::error!(
                    "[ClusterBuilderSlot entry] Fail to create the origin node, resource: {}, origin: {}, error: {:?}",
                    resource.name(),
                    origin,
                    err
                ),
            }
        }
        next.fire_entry(ctx)
    }
}
