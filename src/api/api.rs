use crate::base::{
    call_context, BlockError, CancelToken, EntryContext, EntryStrongPtr, ParamsList, ResourceType,
    ResourceWrapper, SentinelEntry, SentinelInput, SlotChain, TrafficType,
};
use crate::Error;
use std::sync::{Arc, RwLock};

/// EntryBuilder is the basic API of Sentinel.
/// It is usually created by `Sentinel::entry_builder()`, which binds the slot chain.
pub struct EntryBuilder {
    resource_name: String,
    resource_type: ResourceType,
    traffic_type: TrafficType,
    batch_count: u32,
    flag: i32,
    slot_chain: Arc<SlotChain>,
    args: Option<ParamsList>,
    cancel_token: Option<CancelToken>,
}

impl EntryBuilder {
    pub fn new(resource_name: String, slot_chain: Arc<SlotChain>) -> Self {
        EntryBuilder {
            resource_name,
            resource_type: ResourceType::default(),
            traffic_type: TrafficType::default(),
            batch_count: 1,
            flag: 0,
            slot_chain,
            args: None,
            cancel_token: None,
        }
    }

    /// `build()` would consume EntryBuilder.
    /// The entry is attached to the call context of the current thread,
    /// the default one is created if there is none.
    /// On block, the entry has been exited before the error is returned.
    pub fn build(self) -> Result<EntryStrongPtr, BlockError> {
        let call_ctx = call_context::current_or_default();
        let parent = call_ctx.cur_entry().and_then(|entry| entry.upgrade());

        let mut ctx = EntryContext::new();
        ctx.set_resource(ResourceWrapper::new(
            self.resource_name,
            self.resource_type,
            self.traffic_type,
        ));
        let mut input = SentinelInput::new(self.batch_count, self.flag);
        if let Some(args) = self.args {
            input.set_args(args);
        }
        if let Some(cancel_token) = self.cancel_token {
            input.set_cancel_token(cancel_token);
        }
        ctx.set_input(input);
        ctx.set_call_context(Arc::clone(&call_ctx));

        let ctx = Arc::new(RwLock::new(ctx));
        let entry = Arc::new(
            SentinelEntry::new(Arc::clone(&ctx), Arc::clone(&self.slot_chain)).with_parent(parent),
        );
        ctx.write().unwrap().set_entry(Arc::downgrade(&entry));
        call_ctx.set_cur_entry(Some(Arc::downgrade(&entry)));

        match self.slot_chain.entry(&ctx) {
            Ok(_) => Ok(entry),
            Err(err) => {
                entry.exit();
                Err(err)
            }
        }
    }

    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    pub fn with_traffic_type(mut self, traffic_type: TrafficType) -> Self {
        self.traffic_type = traffic_type;
        self
    }

    pub fn with_batch_count(mut self, batch_count: u32) -> Self {
        self.batch_count = batch_count;
        self
    }

    pub fn with_flag(mut self, flag: i32) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_slot_chain(mut self, slot_chain: Arc<SlotChain>) -> Self {
        self.slot_chain = slot_chain;
        self
    }

    pub fn with_args(mut self, args: Option<ParamsList>) -> Self {
        self.args = args;
        self
    }

    /// The token interrupts the queueing wait of the rate limiter, the entry is blocked then.
    pub fn with_cancel_token(mut self, cancel_token: CancelToken) -> Self {
        self.cancel_token = Some(cancel_token);
        self
    }
}

/// Records a business error on the entry, counted when the entry exits.
pub fn trace_error(entry: &EntryStrongPtr, err: Error) {
    entry.set_err(err);
}
