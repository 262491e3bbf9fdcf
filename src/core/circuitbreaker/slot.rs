use super::*;
use crate::base::{BaseSlot, BlockError, BlockType, ContextPtr, ProcessorSlot, SlotCursor};
use crate::Error;
use std::sync::Arc;

pub const CIRCUIT_BREAKER_SLOT_ORDER: u32 = 8000;
pub const BLOCK_MSG_CIRCUIT_BREAKING: &str = "circuit breaker check blocked";

/// A ProcessorSlot for circuit breaking.
/// On entry every breaker of the resource is asked for a permission,
/// on exit the passed calls report their outcome to the breakers.
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
        CIRCUIT_BREAKER_SLOT_ORDER
    }
}

impl ProcessorSlot for Slot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let res = ctx.read().unwrap().resource().name().clone();
        for breaker in self.manager.get_breakers_of_resource(&res) {
            let passed = breaker.try_pass(&ctx.read().unwrap());
            if !passed {
                return Err(BlockError::new_with_cause(
                    BlockType::CircuitBreaking,
                    BLOCK_MSG_CIRCUIT_BREAKING.into(),
                    breaker.bound_rule().clone(),
                    Arc::new(breaker.current_state()),
                ));
            }
        }
        next.fire_entry(ctx)
    }

    fn exit(&self, ctx: &ContextPtr, next: SlotCursor<'_>) {
        let (res, blocked, rt, err) = {
            let ctx = ctx.read().unwrap();
            (
                ctx.resource().name().clone(),
                ctx.is_blocked(),
                ctx.response_time(),
                ctx.get_err().as_ref().map(|err| Error::msg(err.to_string())),
            )
        };
        // blocked calls never executed, there is nothing to report
        if !blocked {
            for breaker in self.manager.get_breakers_of_resource(&res) {
                breaker.on_request_complete(rt, &err);
            }
        }
        next.fire_exit(ctx)
    }
}
