//! Traffic Shaping Policy

/// Rate limiter checker
pub mod rate_limiter;
/// Reject checker
pub mod reject;

pub use rate_limiter::*;
pub use reject::*;

use super::Rule;
use crate::core::base::TokenResult;
use std::fmt;
use std::sync::Arc;

/// Traffic Shaping `Checker` answers whether `batch_count` more units may pass right now,
/// according to its own metrics and the traffic shaping strategy.
pub trait Checker: Send + Sync + fmt::Debug {
    fn do_check(&self, batch_count: u32, threshold: f64) -> TokenResult;
}

/// Controller binds a checker to the flow rule it is generated from.
/// Controllers bound to equal rules are kept across rule reloads,
/// so that the state of a checker, e.g., the pacing of a rate limiter, survives.
#[derive(Debug)]
pub struct Controller {
    rule: Arc<Rule>,
    checker: Box<dyn Checker>,
}

impl Controller {
    pub fn new(rule: Arc<Rule>, checker: Box<dyn Checker>) -> Self {
        Controller { rule, checker }
    }

    pub fn rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    pub fn checker(&self) -> &dyn Checker {
        self.checker.as_ref()
    }

    pub fn perform_checking(&self, batch_count: u32) -> TokenResult {
        self.checker.do_check(batch_count, self.rule.threshold)
    }
}
