//! Breakers of the three builtin strategies, sharing one state machine:
//!
//! * `Closed -> Open` when the strategy's metric exceeds the threshold,
//! * `Open -> HalfOpen` for the first call after the retry timeout, which becomes the probe,
//! * `HalfOpen -> Closed` when the probe completes fine,
//! * `HalfOpen -> Open` when the probe fails, or is blocked by a later slot.
//!
//! Every transition is a single compare-and-swap on the state,
//! only the thread winning the swap notifies the listeners.

#![allow(clippy::wrong_self_convention)]

/// Error count and error ratio
pub mod exception;
/// Slow round trip time
pub mod response_time;
pub mod stat;

pub use exception::*;
pub use response_time::*;
pub use stat::*;

use super::*;
use crate::{
    base::{ContextPtr, EntryContext, SentinelEntry, Snapshot},
    logging,
    property::ListenerSet,
    utils, Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};

/// The metric a breaker watches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum BreakerStrategy {
    /// share of completed calls slower than `max_allowed_rt_ms`
    SlowRequestRatio,
    /// share of completed calls carrying an error
    ErrorRatio,
    /// amount of completed calls carrying an error
    ErrorCount,
    #[serde(skip)]
    Custom(u8),
}

impl Default for BreakerStrategy {
    fn default() -> BreakerStrategy {
        BreakerStrategy::SlowRequestRatio
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum State {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl Default for State {
    fn default() -> State {
        State::Closed
    }
}

impl From<u8> for State {
    fn from(num: u8) -> State {
        match num {
            1 => State::HalfOpen,
            2 => State::Open,
            _ => State::Closed,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Observer of the breaker transitions, called synchronously by the thread
/// that performed the transition, after the new state is visible.
pub trait StateChangeListener: Sync + Send {
    fn on_transform_to_closed(&self, prev: State, rule: Arc<Rule>);

    /// `snapshot` is the metric value that tripped the breaker.
    fn on_transform_to_open(&self, prev: State, rule: Arc<Rule>, snapshot: Option<Arc<Snapshot>>);

    fn on_transform_to_half_open(&self, prev: State, rule: Arc<Rule>);
}

pub type StateChangeListeners = ListenerSet<dyn StateChangeListener>;

/// A breaker of one rule. The strategies only differ in what they record on completion.
pub trait CircuitBreakerTrait: Send + Sync + fmt::Debug {
    fn breaker(&self) -> &BreakerBase;

    /// The breaker's own window, shared with its successor when the rule is reloaded.
    fn stat(&self) -> &Arc<CounterLeapArray>;

    fn try_pass(&self, ctx: &EntryContext) -> bool {
        self.try_pass_with_time(ctx, utils::curr_time_millis())
    }

    /// Only the call winning the `Open -> HalfOpen` transition passes as the probe.
    fn try_pass_with_time(&self, ctx: &EntryContext, now: u64) -> bool {
        match self.current_state() {
            State::Closed => true,
            State::Open => {
                self.breaker().retry_timeout_arrived(now) && self.breaker().from_open_to_half_open(ctx)
            }
            State::HalfOpen => false,
        }
    }

    fn next_retry_timestamp_ms(&self) -> u64 {
        self.breaker().next_retry_timestamp_ms()
    }

    fn bound_rule(&self) -> &Arc<Rule> {
        self.breaker().bound_rule()
    }

    fn current_state(&self) -> State {
        self.breaker().current_state()
    }

    /// Records a passed call that finished after `rt` ms, possibly with an error,
    /// and moves the state machine accordingly.
    fn on_request_complete(&self, rt: u64, error: &Option<Error>);

    fn reset_metric(&self) {
        self.stat().reset_all()
    }
}

/// The state machine shared by all the strategies.
#[derive(Debug)]
pub struct BreakerBase {
    rule: Arc<Rule>,
    retry_timeout_ms: u64,
    /// an open breaker lets the probe through from this timestamp on
    next_retry_timestamp_ms: AtomicU64,
    /// shared with the exit hook of the probe
    state: Arc<AtomicU8>,
    listeners: Arc<StateChangeListeners>,
}

fn compare_and_swap_state(state: &AtomicU8, from: State, to: State) -> bool {
    state
        .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

fn notify_open(
    listeners: &StateChangeListeners,
    prev: State,
    rule: &Arc<Rule>,
    snapshot: Arc<Snapshot>,
) {
    for listener in listeners.snapshot().iter() {
        listener.on_transform_to_open(prev, Arc::clone(rule), Some(Arc::clone(&snapshot)));
    }
    #[cfg(feature = "exporter")]
    crate::exporter::add_state_change_counter(&rule.resource, &prev.to_string(), "Open");
}

impl BreakerBase {
    pub fn new(rule: Arc<Rule>, listeners: Arc<StateChangeListeners>) -> Self {
        BreakerBase {
            retry_timeout_ms: rule.retry_timeout_ms(),
            rule,
            next_retry_timestamp_ms: AtomicU64::new(0),
            state: Arc::new(AtomicU8::new(State::default() as u8)),
            listeners,
        }
    }

    pub fn bound_rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    pub fn current_state(&self) -> State {
        State::from(self.state.load(Ordering::SeqCst))
    }

    /// Forces the state, without notifying the listeners.
    pub fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn next_retry_timestamp_ms(&self) -> u64 {
        self.next_retry_timestamp_ms.load(Ordering::SeqCst)
    }

    pub fn retry_timeout_arrived(&self, now: u64) -> bool {
        now >= self.next_retry_timestamp_ms.load(Ordering::SeqCst)
    }

    pub fn update_next_retry_timestamp(&self) {
        let next = utils::curr_time_millis() + self.retry_timeout_ms;
        self.next_retry_timestamp_ms.store(next, Ordering::SeqCst);
    }

    /// Trips the breaker. False if another thread did it first.
    pub fn from_closed_to_open(&self, snapshot: Arc<Snapshot>) -> bool {
        if !compare_and_swap_state(&self.state, State::Closed, State::Open) {
            return false;
        }
        self.update_next_retry_timestamp();
        notify_open(&self.listeners, State::Closed, &self.rule, snapshot);
        true
    }

    /// Makes the call of `ctx` the probe. False if another call already is.
    ///
    /// The probe entry gets an exit hook: if it turns out to be blocked by another slot,
    /// it never executed, and the state is rolled back to open.
    pub fn from_open_to_half_open(&self, ctx: &EntryContext) -> bool {
        if !compare_and_swap_state(&self.state, State::Open, State::HalfOpen) {
            return false;
        }
        for listener in self.listeners.snapshot().iter() {
            listener.on_transform_to_half_open(State::Open, Arc::clone(&self.rule));
        }
        #[cfg(feature = "exporter")]
        crate::exporter::add_state_change_counter(&self.rule.resource, "Open", "HalfOpen");

        match ctx.entry().and_then(|entry| entry.upgrade()) {
            Some(entry) => {
                let rule = Arc::clone(&self.rule);
                let state = Arc::clone(&self.state);
                let listeners = Arc::clone(&self.listeners);
                entry.when_exit(Box::new(
                    move |_entry: &SentinelEntry, ctx: &ContextPtr| -> Result<()> {
                        let blocked = ctx.read().unwrap().is_blocked();
                        if blocked && compare_and_swap_state(&state, State::HalfOpen, State::Open) {
                            notify_open(&listeners, State::HalfOpen, &rule, Arc::new(1.0));
                        }
                        Ok(())
                    },
                ));
            }
            None => logging::error!(
                "[BreakerBase from_open_to_half_open] Entry is None, the probe cannot be rolled back, rule: {:?}",
                self.rule,
            ),
        }
        true
    }

    /// The probe failed, the retry timeout starts over.
    pub fn from_half_open_to_open(&self, snapshot: Arc<Snapshot>) -> bool {
        if !compare_and_swap_state(&self.state, State::HalfOpen, State::Open) {
            return false;
        }
        self.update_next_retry_timestamp();
        notify_open(&self.listeners, State::HalfOpen, &self.rule, snapshot);
        true
    }

    /// The probe succeeded.
    pub fn from_half_open_to_closed(&self) -> bool {
        if !compare_and_swap_state(&self.state, State::HalfOpen, State::Closed) {
            return false;
        }
        for listener in self.listeners.snapshot().iter() {
            listener.on_transform_to_closed(State::HalfOpen, Arc::clone(&self.rule));
        }
        #[cfg(feature = "exporter")]
        crate::exporter::add_state_change_counter(&self.rule.resource, "HalfOpen", "Closed");
        true
    }
}

#[cfg(test)]
pub(crate) use test::{MockCircuitBreaker, MockStateListener};
