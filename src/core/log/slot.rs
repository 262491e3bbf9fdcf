use crate::base::{BaseSlot, BlockError, ContextPtr, ProcessorSlot, SlotCursor};
use crate::logging;
use std::sync::atomic::{AtomicU64, Ordering};

pub const LOG_SLOT_ORDER: u32 = 3000;
pub const BLOCK_LOG_TARGET: &str = "sentinel::block";

/// LogSlot writes a record for every blocked call to the `sentinel::block` log target,
/// so that the block log can be routed apart from the application logs.
#[derive(Debug, Default)]
pub struct Slot {
    blocked: AtomicU64,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of blocked calls seen so far.
    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::SeqCst)
    }
}

impl BaseSlot for Slot {
    fn order(&self) -> u32 {
        LOG_SLOT_ORDER
    }
}

impl ProcessorSlot for Slot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let res = next.fire_entry(ctx);
        if let Err(err) = &res {
            self.blocked.fetch_add(1, Ordering::SeqCst);
            let ctx = ctx.read().unwrap();
            logging::info!(
                target: BLOCK_LOG_TARGET,
                "{}|{}|{}|{}|{}",
                ctx.resource().name(),
                err.block_type(),
                err.triggered_rule()
                    .map(|rule| rule.resource_name())
                    .unwrap_or_default(),
                ctx.origin(),
                ctx.input().batch_count()
            );
        }
        res
    }
}
