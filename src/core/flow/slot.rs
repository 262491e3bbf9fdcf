use super::*;
use crate::base::{
    BaseSlot, BlockError, BlockType, ContextPtr, ProcessorSlot, SlotCursor, TokenResult,
};
use std::sync::Arc;

pub const FLOW_SLOT_ORDER: u32 = 7000;
pub const BLOCK_MSG_WAIT_CANCELLED: &str = "flow rate limiter wait cancelled";

/// A ProcessorSlot for flow control.
/// Every controller of the resource is checked in turn, a `Wait` answer is served
/// by waiting on the cancel token of the entry, outside of any lock.
pub struct Slot {
    manager: Arc<RuleManager>,
}

impl Slot {
    pub fn new(manager: Arc<RuleManager>) -> Self {
        Slot { manager }
    }
}

impl BaseSlot for Slot {
    fn order(&self) -> u32 {
        FLOW_SLOT_ORDER
    }
}

impl ProcessorSlot for Slot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let (res, origin, batch_count, cancel_token) = {
            let ctx = ctx.read().unwrap();
            (
                ctx.resource().name().clone(),
                ctx.origin().to_owned(),
                ctx.input().batch_count(),
                ctx.input().cancel_token().clone(),
            )
        };
        for tc in self.manager.get_controllers_of_resource(&res) {
            if !tc.rule().matches_origin(&origin) {
                continue;
            }
            match tc.perform_checking(batch_count) {
                TokenResult::Pass => {}
                TokenResult::Blocked(err) => return Err(err),
                TokenResult::Wait(ms_to_wait) => {
                    if !cancel_token.wait_for_ms(ms_to_wait) {
                        return Err(BlockError::new_with_cause(
                            BlockType::Flow,
                            BLOCK_MSG_WAIT_CANCELLED.into(),
                            tc.rule().clone(),
                            Arc::new(ms_to_wait),
                        ));
                    }
                }
            }
        }
        next.fire_entry(ctx)
    }
}
