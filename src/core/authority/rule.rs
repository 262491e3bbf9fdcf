use crate::{base::SentinelRule, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityStrategy {
    /// Only the listed origins pass.
    White,
    /// The listed origins are blocked.
    Black,
}

impl Default for AuthorityStrategy {
    fn default() -> Self {
        AuthorityStrategy::White
    }
}

/// Rule is the white/black list of the origins calling a resource.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Rule {
    /// unique id
    pub id: String,
    pub resource: String,
    /// the origins, separated by commas, e.g., "app-a,app-b"
    pub limit_app: String,
    pub strategy: AuthorityStrategy,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            resource: String::default(),
            limit_app: String::default(),
            strategy: AuthorityStrategy::default(),
        }
    }
}

impl Rule {
    /// Whether the origin is one of `limit_app`, surrounding whitespaces ignored.
    pub fn contains_origin(&self, origin: &str) -> bool {
        !origin.is_empty() && self.limit_app.split(',').any(|app| app.trim() == origin)
    }

    /// An empty origin always passes.
    pub fn pass_check(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return true;
        }
        match self.strategy {
            AuthorityStrategy::White => self.contains_origin(origin),
            AuthorityStrategy::Black => !self.contains_origin(origin),
        }
    }
}

impl SentinelRule for Rule {
    fn resource_name(&self) -> String {
        self.resource.clone()
    }

    fn is_valid(&self) -> Result<()> {
        if self.resource.is_empty() {
            return Err(Error::msg("empty resource name"));
        }
        if self.limit_app.trim().is_empty() {
            return Err(Error::msg("empty limit_app"));
        }
        Ok(())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && self.limit_app == other.limit_app
            && self.strategy == other.strategy
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.limit_app.hash(state);
        self.strategy.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", fmtted)
    }
}
