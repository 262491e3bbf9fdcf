//! Dynamic data sources of the rules.
//!
//! A readable data source pulls the rules from somewhere, e.g., a file, and pushes them into its
//! [`DynamicProperty`], which the rule managers subscribe to by `register_property()`.
//! A writable data source persists the rules pushed by the command handler.
mod file;
mod registry;

pub use file::*;
pub use registry::*;

use crate::{property::DynamicProperty, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Converter converts the source text into the property value, that is, the sentinel rules.
pub type Converter<T> = fn(src: &str) -> Result<T>;

/// Encoder converts the property value into the text to be persisted.
pub type Encoder<T> = fn(value: &T) -> Result<String>;

/// `rule_json_array_parser` provide JSON as the default serialization for list of rules.
/// A blank source is parsed as an empty list.
pub fn rule_json_array_parser<R: DeserializeOwned>(src: &str) -> Result<Vec<Arc<R>>> {
    if src.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rules: Vec<R> = serde_json::from_str(src)?;
    Ok(rules.into_iter().map(Arc::new).collect())
}

/// Pretty JSON encoding of a list of rules, the reverse of `rule_json_array_parser`.
pub fn rule_json_array_encoder<R: Serialize>(rules: &Vec<Arc<R>>) -> Result<String> {
    let rules: Vec<&R> = rules.iter().map(|rule| rule.as_ref()).collect();
    Ok(serde_json::to_string_pretty(&rules)?)
}

/// The generic interface of the readable data sources.
/// Each data source instance feeds one property.
pub trait ReadableDataSource<T>: Send + Sync {
    /// Reads the source and converts it to the property value.
    fn load_config(&self) -> Result<T>;
    /// Reads the original text from the source.
    fn read_source(&self) -> Result<String>;
    fn property(&self) -> Arc<DynamicProperty<T>>;
    /// Stops the refreshing, the property keeps the last value.
    fn close(&self) -> Result<()>;
}

/// The generic interface of the writable data sources.
pub trait WritableDataSource<T>: Send + Sync {
    fn write(&self, value: &T) -> Result<()>;
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flow;

    #[test]
    fn json_array() {
        let rules: Vec<Arc<flow::Rule>> =
            rule_json_array_parser(r#"[{"resource":"abc","threshold":10.0}]"#).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resource, "abc");
        assert_eq!(rules[0].threshold, 10.0);

        let encoded = rule_json_array_encoder(&rules).unwrap();
        let decoded: Vec<Arc<flow::Rule>> = rule_json_array_parser(&encoded).unwrap();
        assert_eq!(decoded[0].id, rules[0].id);

        assert!(rule_json_array_parser::<flow::Rule>("  ").unwrap().is_empty());
        assert!(rule_json_array_parser::<flow::Rule>("{").is_err());
    }
}
