use super::*;
use crate::base::{BaseSlot, BlockError, BlockType, ContextPtr, ProcessorSlot, SlotCursor};
use std::sync::Arc;

pub const AUTHORITY_SLOT_ORDER: u32 = 5000;
pub const BLOCK_MSG_AUTHORITY: &str = "authority check blocked";

/// A ProcessorSlot checking the origin of the call against the white/black lists.
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
        AUTHORITY_SLOT_ORDER
    }
}

impl ProcessorSlot for Slot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let (res, origin) = {
            let ctx = ctx.read().unwrap();
            (ctx.resource().name().clone(), ctx.origin().to_owned())
        };
        for rule in self.manager.get_rules_of_resource(&res) {
            if !rule.pass_check(&origin) {
                return Err(BlockError::new_with_cause(
                    BlockType::Authority,
                    BLOCK_MSG_AUTHORITY.into(),
                    rule,
                    Arc::new(origin),
                ));
            }
        }
        next.fire_entry(ctx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{
        call_context, EntryContext, ResourceType, ResourceWrapper, SlotChain, TrafficType,
    };
    use std::sync::RwLock;

    fn new_ctx(origin: &str) -> ContextPtr {
        let mut ctx = EntryContext::new();
        ctx.set_resource(ResourceWrapper::new(
            "abc".into(),
            ResourceType::Common,
            TrafficType::Inbound,
        ));
        call_context::exit();
        ctx.set_call_context(call_context::enter("test", origin));
        call_context::exit();
        Arc::new(RwLock::new(ctx))
    }

    #[test]
    fn white_and_black() {
        let manager = Arc::new(RuleManager::new());
        manager.load_rules(vec![Arc::new(Rule {
            resource: "abc".into(),
            limit_app: "app-a,app-b".into(),
            strategy: AuthorityStrategy::White,
            ..Default::default()
        })]);
        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(Slot::new(Arc::clone(&manager))));

        assert!(sc.entry(&new_ctx("app-a")).is_ok());
        assert!(sc.entry(&new_ctx("")).is_ok());
        let err = sc.entry(&new_ctx("app-c")).unwrap_err();
        assert_eq!(err.block_type(), BlockType::Authority);
        let origin = err.triggered_value().unwrap();
        assert_eq!(
            (*origin).as_any().downcast_ref::<String>().unwrap(),
            "app-c"
        );

        manager.load_rules(vec![Arc::new(Rule {
            resource: "abc".into(),
            limit_app: "app-a".into(),
            strategy: AuthorityStrategy::Black,
            ..Default::default()
        })]);
        assert!(sc.entry(&new_ctx("app-a")).is_err());
        assert!(sc.entry(&new_ctx("app-c")).is_ok());
    }
}
