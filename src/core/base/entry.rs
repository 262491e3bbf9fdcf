use super::{call_context, ContextPtr, SlotChain};
use crate::{logging, Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::vec::Vec;

pub type EntryStrongPtr = Arc<SentinelEntry>;
pub type EntryWeakPtr = Weak<SentinelEntry>;

type ExitHandler = Box<dyn FnOnce(&SentinelEntry, &ContextPtr) -> Result<()> + Send>;

/// How a finished entry ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryOutcome {
    Success,
    /// passed the rules, but the business logic recorded an error
    Exception,
    Blocked,
}

pub struct SentinelEntry {
    ctx: ContextPtr,
    exit_handlers: Mutex<Vec<ExitHandler>>,
    /// each entry traverses a slot chain,
    /// global slot chain is wrapped by Arc, thus here we use Arc
    sc: Arc<SlotChain>,
    parent: Option<EntryStrongPtr>,
    exited: AtomicBool,
}

impl SentinelEntry {
    pub fn new(ctx: ContextPtr, sc: Arc<SlotChain>) -> Self {
        SentinelEntry {
            ctx,
            exit_handlers: Mutex::new(Vec::new()),
            sc,
            parent: None,
            exited: AtomicBool::new(false),
        }
    }

    pub fn with_parent(mut self, parent: Option<EntryStrongPtr>) -> Self {
        self.parent = parent;
        self
    }

    /// Registers a handler to run once, after the slot chain exits.
    /// Handlers run in registration order.
    pub fn when_exit(&self, exit_handler: ExitHandler) {
        self.exit_handlers.lock().unwrap().push(exit_handler);
    }

    pub fn context(&self) -> &ContextPtr {
        &self.ctx
    }

    pub fn parent(&self) -> Option<&EntryStrongPtr> {
        self.parent.as_ref()
    }

    pub fn is_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Records a business error, which is counted by the statistic slot
    /// and the error based circuit breakers when the entry exits.
    pub fn set_err(&self, err: Error) {
        self.ctx.write().unwrap().set_err(err);
    }

    pub fn outcome(&self) -> EntryOutcome {
        let ctx = self.ctx.read().unwrap();
        if ctx.is_blocked() {
            EntryOutcome::Blocked
        } else if ctx.get_err().is_some() {
            EntryOutcome::Exception
        } else {
            EntryOutcome::Success
        }
    }

    /// Exits the entry. Only the first call takes effect.
    pub fn exit(&self) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sc.exit(&self.ctx);
        let handlers = std::mem::take(&mut *self.exit_handlers.lock().unwrap());
        for handler in handlers {
            if let Err(err) = handler(self, &self.ctx) {
                logging::error!(
                    "[SentinelEntry::exit] Fail to execute exit handler, resource: {}, error: {:?}",
                    self.ctx.read().unwrap().resource().name(),
                    err
                );
            }
        }
        self.restore_parent();
    }

    fn restore_parent(&self) {
        let call_ctx = match self.ctx.read().unwrap().call_context() {
            Some(call_ctx) => Arc::clone(call_ctx),
            None => return,
        };
        let is_current = call_ctx
            .cur_entry()
            .map_or(false, |cur| std::ptr::eq(cur.as_ptr(), self));
        if !is_current {
            logging::warn!(
                "[SentinelEntry::exit] The exited entry is not the current one of context {}, resource: {}",
                call_ctx.name(),
                self.ctx.read().unwrap().resource().name()
            );
            return;
        }
        call_ctx.set_cur_entry(self.parent.as_ref().map(Arc::downgrade));
        if self.parent.is_none() {
            call_context::release_default(&call_ctx);
        }
    }
}

// the context is only peeked, so that formatting never waits on a writer
impl fmt::Debug for SentinelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource = self
            .ctx
            .try_read()
            .map(|ctx| ctx.resource().name().clone())
            .unwrap_or_default();
        f.debug_struct("SentinelEntry")
            .field("resource", &resource)
            .field("has_parent", &self.parent.is_some())
            .field("exited", &self.is_exited())
            .finish()
    }
}
