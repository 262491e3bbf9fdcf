//! The state carried by one entry through the slots.
use super::{CallContext, CancelToken, EntryWeakPtr, ResourceWrapper, StatNode, TokenResult};
use crate::utils::time::curr_time_millis;
use crate::Error;
use std::sync::Arc;
use std::sync::RwLock;
pub type ContextPtr = Arc<RwLock<EntryContext>>;

/// EntryContext is the per-entry state that flows through the slot chain.
#[derive(Default)]
pub struct EntryContext {
    /// the entry owns its context
    entry: Option<EntryWeakPtr>,
    /// creation timestamp in ms
    start_time: u64,
    /// recorded by the statistic slot on exit, `None` until then
    complete_time: Option<u64>,
    /// response time recorded on exit
    round_trip: u64,
    resource: ResourceWrapper,
    /// the statistic node of the resource
    stat_node: Option<Arc<dyn StatNode>>,
    /// the statistic node of the (resource, origin) pair
    origin_node: Option<Arc<dyn StatNode>>,
    call_context: Option<Arc<CallContext>>,
    input: SentinelInput,
    /// verdict of the rule checking slots, `Pass` until one of them refuses
    rule_check_result: TokenResult,
    err: Option<Error>,
    slots_entered: usize,
    slots_exited: usize,
}

impl EntryContext {
    pub fn new() -> Self {
        EntryContext {
            start_time: curr_time_millis(),
            ..Default::default()
        }
    }

    pub fn set_entry(&mut self, entry: EntryWeakPtr) {
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> Option<&EntryWeakPtr> {
        self.entry.as_ref()
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: u64) {
        self.start_time = start_time;
    }

    pub fn set_complete_time(&mut self, complete_time: u64) {
        self.complete_time = Some(complete_time);
    }

    pub fn complete_time(&self) -> Option<u64> {
        self.complete_time
    }

    /// Response time = completion timestamp - creation timestamp,
    /// the completion timestamp defaults to now if it has not been recorded.
    pub fn response_time(&self) -> u64 {
        let complete_time = self.complete_time.unwrap_or_else(curr_time_millis);
        complete_time.saturating_sub(self.start_time)
    }

    pub fn is_blocked(&self) -> bool {
        self.rule_check_result.is_blocked()
    }

    pub fn set_round_trip(&mut self, round_trip: u64) {
        self.round_trip = round_trip
    }

    pub fn round_trip(&self) -> u64 {
        self.round_trip
    }

    pub fn set_resource(&mut self, resource: ResourceWrapper) {
        self.resource = resource;
    }

    pub fn resource(&self) -> &ResourceWrapper {
        &self.resource
    }

    pub fn set_input(&mut self, input: SentinelInput) {
        self.input = input;
    }

    pub fn input(&self) -> &SentinelInput {
        &self.input
    }

    pub fn set_stat_node(&mut self, stat_node: Arc<dyn StatNode>) {
        self.stat_node = Some(stat_node);
    }

    pub fn stat_node(&self) -> Option<Arc<dyn StatNode>> {
        self.stat_node.clone()
    }

    pub fn set_origin_node(&mut self, origin_node: Arc<dyn StatNode>) {
        self.origin_node = Some(origin_node);
    }

    pub fn origin_node(&self) -> Option<Arc<dyn StatNode>> {
        self.origin_node.clone()
    }

    pub fn set_call_context(&mut self, call_context: Arc<CallContext>) {
        self.call_context = Some(call_context);
    }

    pub fn call_context(&self) -> Option<&Arc<CallContext>> {
        self.call_context.as_ref()
    }

    /// The caller (origin) of the call tree, empty if unknown.
    pub fn origin(&self) -> &str {
        match &self.call_context {
            Some(call_context) => call_context.origin(),
            None => "",
        }
    }

    pub fn set_result(&mut self, result: TokenResult) {
        self.rule_check_result = result;
    }

    pub fn reset_result_to_pass(&mut self) {
        self.rule_check_result.reset_to_pass();
    }

    pub fn result(&self) -> &TokenResult {
        &self.rule_check_result
    }

    pub fn set_err(&mut self, err: Error) {
        self.err = Some(err);
    }

    pub fn get_err(&self) -> &Option<Error> {
        &self.err
    }

    pub(crate) fn mark_slot_entered(&mut self) {
        self.slots_entered += 1;
    }

    pub(crate) fn mark_slot_exited(&mut self, pos: usize) {
        self.slots_exited = pos + 1;
    }

    /// Amount of slots whose `entry` ran for this context.
    pub fn slots_entered(&self) -> usize {
        self.slots_entered
    }

    /// Amount of slots whose `exit` ran for this context.
    pub fn slots_exited(&self) -> usize {
        self.slots_exited
    }
}

pub type ParamKey = String;
pub type ParamsList = Vec<ParamKey>;

/// What the caller asks for: how many tokens, custom flags and arguments,
/// and a token to cancel a paced wait.
#[derive(Debug)]
pub struct SentinelInput {
    batch_count: u32,
    flag: i32,
    args: Option<ParamsList>,
    cancel_token: CancelToken,
}

impl Default for SentinelInput {
    fn default() -> Self {
        SentinelInput {
            batch_count: 1,
            flag: 0,
            args: None,
            cancel_token: CancelToken::default(),
        }
    }
}

impl SentinelInput {
    pub fn new(batch_count: u32, flag: i32) -> Self {
        SentinelInput {
            batch_count,
            flag,
            ..Default::default()
        }
    }

    pub fn set_batch_count(&mut self, batch_count: u32) {
        self.batch_count = batch_count;
    }

    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }

    pub fn set_flag(&mut self, flag: i32) {
        self.flag = flag;
    }

    pub fn flag(&self) -> i32 {
        self.flag
    }

    pub fn set_args(&mut self, args: ParamsList) {
        self.args = Some(args);
    }

    pub fn args(&self) -> Option<&ParamsList> {
        self.args.as_ref()
    }

    pub fn set_cancel_token(&mut self, cancel_token: CancelToken) {
        self.cancel_token = cancel_token;
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel_token
    }
}
