//! Verdicts of the rule checkers and the categories of blocking.
use super::{BlockError, SentinelRule, Snapshot};
use crate::{Error, Result};
use lazy_static::lazy_static;
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Identifier of a customized block type.
type CustomBlockId = u8;

/// The category of the slot, or of the customized checker, that blocked an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockType {
    Unknown,
    Flow,
    Authority,
    CircuitBreaking,
    SystemFlow,
    Other(CustomBlockId),
}

impl Default for BlockType {
    fn default() -> Self {
        BlockType::Unknown
    }
}

lazy_static! {
    static ref CUSTOM_BLOCK_TYPES: RwLock<HashMap<CustomBlockId, &'static str>> =
        RwLock::new(HashMap::new());
}

const BLOCK_TYPE_EXISTED: &str = "Block type existed!";

/// Names a customized block type, the name is shown when the type is displayed.
/// Each id can only be named once and the builtin types can not be renamed.
pub fn registry_block_type(block_type: BlockType, desc: &'static str) -> Result<()> {
    let id = match block_type {
        BlockType::Other(id) => id,
        _ => return Err(Error::msg(BLOCK_TYPE_EXISTED)),
    };
    match CUSTOM_BLOCK_TYPES.write().unwrap().entry(id) {
        Entry::Vacant(slot) => {
            slot.insert(desc);
            Ok(())
        }
        Entry::Occupied(_) => Err(Error::msg(BLOCK_TYPE_EXISTED)),
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Other(id) => match CUSTOM_BLOCK_TYPES.read().unwrap().get(id) {
                Some(desc) => f.write_str(desc),
                None => write!(f, "{}", id),
            },
            builtin => write!(f, "{:?}", builtin),
        }
    }
}

/// The answer of a rule checker:
/// pass right now, blocked, or pass after waiting for the given milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenResult {
    Pass,
    Blocked(BlockError),
    Wait(u64),
}

impl Default for TokenResult {
    fn default() -> Self {
        TokenResult::Pass
    }
}

impl TokenResult {
    pub fn new_pass() -> Self {
        TokenResult::Pass
    }

    pub fn new_should_wait(ms_to_wait: u64) -> Self {
        TokenResult::Wait(ms_to_wait)
    }

    pub fn new_blocked(block_type: BlockType) -> Self {
        TokenResult::Blocked(BlockError::new(block_type))
    }

    /// Blocked by `rule`, `snapshot_value` is the statistic that triggered it.
    pub fn new_blocked_with_cause(
        block_type: BlockType,
        block_msg: String,
        rule: Arc<dyn SentinelRule>,
        snapshot_value: Arc<Snapshot>,
    ) -> Self {
        TokenResult::Blocked(BlockError::new_with_cause(
            block_type,
            block_msg,
            rule,
            snapshot_value,
        ))
    }

    pub fn reset_to_pass(&mut self) {
        *self = TokenResult::Pass;
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, TokenResult::Pass)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, TokenResult::Blocked(_))
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, TokenResult::Wait(_))
    }

    pub fn block_err(&self) -> Option<BlockError> {
        if let TokenResult::Blocked(err) = self {
            Some(err.clone())
        } else {
            None
        }
    }

    /// Zero unless the result is `Wait`.
    pub fn ms_to_wait(&self) -> u64 {
        if let TokenResult::Wait(ms) = self {
            *ms
        } else {
            0
        }
    }
}

impl fmt::Display for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenResult::Pass => f.write_str("pass"),
            TokenResult::Blocked(err) => write!(f, "blocked, {}", err),
            TokenResult::Wait(ms) => write!(f, "wait for {}ms", ms),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn custom_block_type() {
        registry_block_type(BlockType::Other(100), "Hotkey").unwrap();
        assert_eq!(BlockType::Other(100).to_string(), "Hotkey");
        assert_eq!(BlockType::Other(101).to_string(), "101");
        assert_eq!(BlockType::CircuitBreaking.to_string(), "CircuitBreaking");
    }

    #[test]
    fn duplicated_block_type() {
        let err = registry_block_type(BlockType::Flow, "Flow").unwrap_err();
        assert_eq!(err.to_string(), BLOCK_TYPE_EXISTED);
        registry_block_type(BlockType::Other(200), "Custom").unwrap();
        assert!(registry_block_type(BlockType::Other(200), "Custom").is_err());
        assert_eq!(BlockType::Other(200).to_string(), "Custom");
    }

    #[test]
    fn verdicts() {
        let mut res = TokenResult::new_should_wait(10);
        assert!(res.is_wait());
        assert_eq!(res.ms_to_wait(), 10);
        assert!(res.block_err().is_none());
        res.reset_to_pass();
        assert!(res.is_pass());
        assert_eq!(res.ms_to_wait(), 0);

        let res = TokenResult::new_blocked(BlockType::SystemFlow);
        assert!(res.is_blocked());
        assert_eq!(res.block_err().unwrap().block_type(), BlockType::SystemFlow);
    }
}
