use super::{BlockError, ContextPtr, TokenResult, SLOT_INIT};
use crate::logging;
use crate::utils::AsAny;
use std::sync::Arc;

/// trait PartialOrd is not object safe
/// SlotChain will sort all it's slots by ascending sort value
pub trait BaseSlot: AsAny {
    /// order returns the sort value of the slot.
    fn order(&self) -> u32 {
        0
    }
}

/// ProcessorSlot is one stage of the chain of responsibility.
///
/// A slot receives the cursor of the remaining chain in `entry` and `exit`,
/// it decides whether and when to forward to the next slot.
/// For example, a statistic slot forwards first and records the outcome afterwards,
/// while a rule checking slot checks first and only forwards when the check passes.
/// Returning an `Err` from `entry` stops the chain and marks the context as blocked.
pub trait ProcessorSlot: BaseSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        next.fire_entry(ctx)
    }

    /// A slot that skips `next.fire_exit()` is tolerated,
    /// `SlotChain::exit()` completes the remaining exits afterwards.
    fn exit(&self, ctx: &ContextPtr, next: SlotCursor<'_>) {
        next.fire_exit(ctx)
    }
}

/// The position of a slot in the chain, handed to the current slot to reach its successors.
#[derive(Clone, Copy)]
pub struct SlotCursor<'a> {
    slots: &'a [Arc<dyn ProcessorSlot>],
    pos: usize,
}

impl<'a> SlotCursor<'a> {
    fn new(slots: &'a [Arc<dyn ProcessorSlot>], pos: usize) -> Self {
        SlotCursor { slots, pos }
    }

    /// Runs the entry of the next slot, a cursor past the tail passes.
    pub fn fire_entry(self, ctx: &ContextPtr) -> Result<(), BlockError> {
        match self.slots.get(self.pos) {
            Some(slot) => {
                ctx.write().unwrap().mark_slot_entered();
                slot.entry(ctx, SlotCursor::new(self.slots, self.pos + 1))
            }
            None => Ok(()),
        }
    }

    /// Runs the exit of the next slot, slots whose entry did not run are never exited.
    pub fn fire_exit(self, ctx: &ContextPtr) {
        if self.pos >= ctx.read().unwrap().slots_entered() {
            return;
        }
        if let Some(slot) = self.slots.get(self.pos) {
            ctx.write().unwrap().mark_slot_exited(self.pos);
            slot.exit(ctx, SlotCursor::new(self.slots, self.pos + 1))
        }
    }

    pub fn is_tail(&self) -> bool {
        self.pos >= self.slots.len()
    }
}

/// SlotChain holds the ordered slots that every entry traverses.
/// It is built once, then shared by all the entries.
pub struct SlotChain {
    /// in ascending order by ProcessorSlot.order() value.
    pub(crate) slots: Vec<Arc<dyn ProcessorSlot>>,
}

impl Default for SlotChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotChain {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(SLOT_INIT),
        }
    }

    /// add_slot adds the slot to the SlotChain.
    /// All slots in the list will be sorted according to order() in ascending order,
    /// slots with the same order keep their insertion order.
    /// add_slot is non-thread safe, the chain should be completed before it is shared.
    pub fn add_slot(&mut self, s: Arc<dyn ProcessorSlot>) {
        self.slots.push(s);
        self.slots.sort_by_key(|a| a.order());
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The entrance of slot chain.
    /// On block, the result of the context is set to the block error.
    pub fn entry(&self, ctx: &ContextPtr) -> Result<(), BlockError> {
        ctx.write().unwrap().reset_result_to_pass();
        let res = SlotCursor::new(&self.slots, 0).fire_entry(ctx);
        if let Err(err) = &res {
            ctx.write()
                .unwrap()
                .set_result(TokenResult::Blocked(err.clone()));
        }
        res
    }

    /// Exits every slot whose entry ran, in chain order.
    /// Slots that did not forward the exit are compensated here,
    /// so that `exit` and `entry` stay symmetric.
    pub fn exit(&self, ctx: &ContextPtr) {
        if ctx.read().unwrap().entry().is_none() {
            logging::error!("SentinelEntry is nil in SlotChain.exit()");
        }
        loop {
            let pos = {
                let ctx = ctx.read().unwrap();
                if ctx.slots_exited() >= ctx.slots_entered() {
                    break;
                }
                ctx.slots_exited()
            };
            SlotCursor::new(&self.slots, pos).fire_exit(ctx);
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::{BlockType, EntryContext};
    use super::*;
    use std::sync::{Mutex, RwLock};

    type Trace = Arc<Mutex<Vec<String>>>;

    struct SlotMock {
        name: String,
        order: u32,
        block: bool,
        forward_exit: bool,
        trace: Trace,
    }

    impl SlotMock {
        fn new(name: &str, order: u32, trace: &Trace) -> Self {
            SlotMock {
                name: name.into(),
                order,
                block: false,
                forward_exit: true,
                trace: Arc::clone(trace),
            }
        }
    }

    impl BaseSlot for SlotMock {
        fn order(&self) -> u32 {
            self.order
        }
    }

    impl ProcessorSlot for SlotMock {
        fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
            self.trace
                .lock()
                .unwrap()
                .push(format!("entry:{}", self.name));
            if self.block {
                return Err(BlockError::new(BlockType::Other(1)));
            }
            next.fire_entry(ctx)
        }

        fn exit(&self, ctx: &ContextPtr, next: SlotCursor<'_>) {
            self.trace
                .lock()
                .unwrap()
                .push(format!("exit:{}", self.name));
            if self.forward_exit {
                next.fire_exit(ctx)
            }
        }
    }

    fn new_ctx() -> ContextPtr {
        Arc::new(RwLock::new(EntryContext::new()))
    }

    fn trace_of(trace: &Trace) -> Vec<String> {
        trace.lock().unwrap().clone()
    }

    #[test]
    fn add_slot() {
        let trace = Trace::default();
        let mut sc = SlotChain::new();
        for base in &[2, 1, 3, 0, 4] {
            for i in 0..10 {
                let order = base * 10 + i;
                sc.add_slot(Arc::new(SlotMock::new(
                    &format!("mock{}", order),
                    order,
                    &trace,
                )))
            }
        }
        assert_eq!(sc.len(), 50);
        for (i, s) in sc.slots.iter().enumerate() {
            assert_eq!(
                (**s).as_any().downcast_ref::<SlotMock>().unwrap().name,
                format!("mock{}", i)
            );
        }
    }

    #[test]
    fn same_order_keeps_insertion() {
        let trace = Trace::default();
        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(SlotMock::new("a", 1, &trace)));
        sc.add_slot(Arc::new(SlotMock::new("b", 1, &trace)));
        sc.add_slot(Arc::new(SlotMock::new("c", 0, &trace)));
        let names: Vec<String> = sc
            .slots
            .iter()
            .map(|s| (**s).as_any().downcast_ref::<SlotMock>().unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn pass_through() {
        let trace = Trace::default();
        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(SlotMock::new("b", 2, &trace)));
        sc.add_slot(Arc::new(SlotMock::new("a", 1, &trace)));
        let ctx = new_ctx();
        assert!(sc.entry(&ctx).is_ok());
        assert!(!ctx.read().unwrap().is_blocked());
        sc.exit(&ctx);
        assert_eq!(
            trace_of(&trace),
            vec!["entry:a", "entry:b", "exit:a", "exit:b"]
        );
        assert_eq!(ctx.read().unwrap().slots_entered(), 2);
        assert_eq!(ctx.read().unwrap().slots_exited(), 2);
    }

    #[test]
    fn blocked_in_middle() {
        let trace = Trace::default();
        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(SlotMock::new("a", 1, &trace)));
        let mut blocker = SlotMock::new("b", 2, &trace);
        blocker.block = true;
        sc.add_slot(Arc::new(blocker));
        sc.add_slot(Arc::new(SlotMock::new("c", 3, &trace)));
        let ctx = new_ctx();
        let err = sc.entry(&ctx).unwrap_err();
        assert_eq!(err.block_type(), BlockType::Other(1));
        assert!(ctx.read().unwrap().is_blocked());
        sc.exit(&ctx);
        // "c" never entered, so it is never exited
        assert_eq!(
            trace_of(&trace),
            vec!["entry:a", "entry:b", "exit:a", "exit:b"]
        );
    }

    #[test]
    fn exit_not_forwarded() {
        let trace = Trace::default();
        let mut sc = SlotChain::new();
        let mut lazy = SlotMock::new("a", 1, &trace);
        lazy.forward_exit = false;
        sc.add_slot(Arc::new(lazy));
        sc.add_slot(Arc::new(SlotMock::new("b", 2, &trace)));
        sc.add_slot(Arc::new(SlotMock::new("c", 3, &trace)));
        let ctx = new_ctx();
        assert!(sc.entry(&ctx).is_ok());
        sc.exit(&ctx);
        assert_eq!(
            trace_of(&trace),
            vec!["entry:a", "entry:b", "entry:c", "exit:a", "exit:b", "exit:c"]
        );
    }

    #[test]
    fn empty_chain() {
        let sc = SlotChain::new();
        let ctx = new_ctx();
        assert!(sc.is_empty());
        assert!(sc.entry(&ctx).is_ok());
        sc.exit(&ctx);
        assert_eq!(ctx.read().unwrap().slots_exited(), 0);
    }
}
