//! The call context of an invocation tree.
//!
//! A call context is bound to the current thread. Entries built on the thread
//! attach to it, the latest live entry becomes the parent of the next one,
//! and exiting an entry restores its parent.
use super::{EntryWeakPtr, DEFAULT_CONTEXT_NAME};
use crate::logging;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct CallContext {
    name: String,
    origin: String,
    cur_entry: Mutex<Option<EntryWeakPtr>>,
    auto_created: bool,
}

thread_local! {
    static CALL_CONTEXT: RefCell<Option<Arc<CallContext>>> = RefCell::new(None);
}

impl CallContext {
    fn new(name: String, origin: String, auto_created: bool) -> Self {
        CallContext {
            name,
            origin,
            cur_entry: Mutex::new(None),
            auto_created,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Whether this context was created implicitly by an entry.
    pub fn is_auto_created(&self) -> bool {
        self.auto_created
    }

    /// The latest live entry in this context.
    pub fn cur_entry(&self) -> Option<EntryWeakPtr> {
        self.cur_entry.lock().unwrap().clone()
    }

    pub(crate) fn set_cur_entry(&self, entry: Option<EntryWeakPtr>) {
        *self.cur_entry.lock().unwrap() = entry;
    }
}

/// Enters a call context named `name` on the current thread with the given origin.
/// If there is already one, it is returned and the arguments are ignored.
pub fn enter(name: &str, origin: &str) -> Arc<CallContext> {
    CALL_CONTEXT.with(|cell| {
        let mut cell = cell.borrow_mut();
        match cell.as_ref() {
            Some(ctx) => {
                if ctx.name() != name {
                    logging::debug!(
                        "[CallContext] Context {} is active, ignore entering {}",
                        ctx.name(),
                        name
                    );
                }
                Arc::clone(ctx)
            }
            None => {
                let ctx = Arc::new(CallContext::new(name.into(), origin.into(), false));
                *cell = Some(Arc::clone(&ctx));
                ctx
            }
        }
    })
}

/// Discards the call context of the current thread.
pub fn exit() {
    CALL_CONTEXT.with(|cell| {
        cell.borrow_mut().take();
    })
}

/// The call context of the current thread, if any.
pub fn current() -> Option<Arc<CallContext>> {
    CALL_CONTEXT.with(|cell| cell.borrow().clone())
}

/// Returns the current call context, or creates the default one.
pub(crate) fn current_or_default() -> Arc<CallContext> {
    CALL_CONTEXT.with(|cell| {
        let mut cell = cell.borrow_mut();
        match cell.as_ref() {
            Some(ctx) => Arc::clone(ctx),
            None => {
                let ctx = Arc::new(CallContext::new(
                    DEFAULT_CONTEXT_NAME.into(),
                    String::new(),
                    true,
                ));
                *cell = Some(Arc::clone(&ctx));
                ctx
            }
        }
    })
}

/// Discards `ctx` if it is the auto-created context of the current thread.
pub(crate) fn release_default(ctx: &Arc<CallContext>) {
    if !ctx.is_auto_created() {
        return;
    }
    CALL_CONTEXT.with(|cell| {
        let mut cell = cell.borrow_mut();
        if matches!(cell.as_ref(), Some(cur) if Arc::ptr_eq(cur, ctx)) {
            cell.take();
        }
    })
}
