use super::{BlockType, SentinelRule};
use crate::utils;
use std::any::Any;
use std::error;
use std::fmt;
use std::sync::Arc;

pub trait SnapshotTrait: Any + fmt::Debug + utils::AsAny + Send + Sync {}
impl<T: Any + fmt::Debug + utils::AsAny + Send + Sync> SnapshotTrait for T {}
/// The statistic a rule saw when it blocked a call, e.g., the current QPS.
/// Downcast it through `as_any()` to read the concrete value.
pub type Snapshot = dyn SnapshotTrait;

/// The reason a call was refused. Exactly one `BlockError` is produced for a blocked entry,
/// by the first slot that refuses it.
#[derive(Debug, Clone, Default)]
pub struct BlockError {
    block_type: BlockType,
    block_msg: String,
    rule: Option<Arc<dyn SentinelRule>>,
    snapshot_value: Option<Arc<Snapshot>>,
}

/// Two block errors are equal when they have the same type and message,
/// the triggered rules and values are not compared.
impl PartialEq for BlockError {
    fn eq(&self, other: &BlockError) -> bool {
        self.block_type == other.block_type && self.block_msg == other.block_msg
    }
}

impl BlockError {
    pub fn new(block_type: BlockType) -> Self {
        BlockError {
            block_type,
            ..Default::default()
        }
    }

    pub fn new_with_msg(block_type: BlockType, block_msg: String) -> Self {
        BlockError {
            block_msg,
            ..BlockError::new(block_type)
        }
    }

    pub fn new_with_cause(
        block_type: BlockType,
        block_msg: String,
        rule: Arc<dyn SentinelRule>,
        snapshot_value: Arc<Snapshot>,
    ) -> Self {
        BlockError {
            rule: Some(rule),
            snapshot_value: Some(snapshot_value),
            ..BlockError::new_with_msg(block_type, block_msg)
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn block_msg(&self) -> String {
        self.block_msg.clone()
    }

    pub fn triggered_rule(&self) -> Option<Arc<dyn SentinelRule>> {
        self.rule.as_ref().map(Arc::clone)
    }

    pub fn triggered_value(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_value.as_ref().map(Arc::clone)
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocked by {}", self.block_type)?;
        if !self.block_msg.is_empty() {
            write!(f, ": {}", self.block_msg)?;
        }
        if let Some(rule) = &self.rule {
            write!(f, " (rule of {})", rule.resource_name())?;
        }
        Ok(())
    }
}

impl error::Error for BlockError {}
