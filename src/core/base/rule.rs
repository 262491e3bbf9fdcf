use crate::Result;
use std::fmt;

/// SentinelRule is the common behaviour of all the rules,
/// a rule is immutable once constructed, and the managers replace whole rule sets.
pub trait SentinelRule: fmt::Debug + fmt::Display + Send + Sync {
    fn resource_name(&self) -> String;
    fn is_valid(&self) -> Result<()> {
        Ok(())
    }
}
