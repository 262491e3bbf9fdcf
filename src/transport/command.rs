use crate::{
    authority, circuitbreaker,
    datasource::{rule_json_array_parser, WritableDataSource, WritableDataSourceRegistry},
    flow, logging, system, Error, Result, Sentinel,
};
use std::collections::HashMap;
use std::sync::Arc;

pub const FLOW_RULE_TYPE: &str = "flow";
pub const DEGRADE_RULE_TYPE: &str = "degrade";
pub const SYSTEM_RULE_TYPE: &str = "system";
pub const AUTHORITY_RULE_TYPE: &str = "authority";

pub const SUCCESS_MSG: &str = "success";
/// The rules are loaded, but persisting them failed.
pub const WRITE_DS_FAILURE_MSG: &str = "partial success (write data source failed)";
pub const INVALID_TYPE_MSG: &str = "invalid type";

#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    params: HashMap<String, String>,
}

impl CommandRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Success(String),
    Failure(String),
}

impl CommandResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResponse::Success(_))
    }

    pub fn result(&self) -> &str {
        match self {
            CommandResponse::Success(msg) | CommandResponse::Failure(msg) => msg,
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn desc(&self) -> &'static str;
    fn handle(&self, request: &CommandRequest) -> CommandResponse;
}

/// ModifyRulesCommandHandler serves the `setRules` command:
/// the rules are loaded into the matched manager first, and then persisted by the
/// registered writable data source. A failed write never rolls back the loaded rules.
pub struct ModifyRulesCommandHandler {
    flow: Arc<flow::RuleManager>,
    circuit_breaker: Arc<circuitbreaker::RuleManager>,
    authority: Arc<authority::RuleManager>,
    system: Arc<system::RuleManager>,
    registry: Arc<WritableDataSourceRegistry>,
}

impl ModifyRulesCommandHandler {
    pub fn new(sentinel: &Sentinel, registry: Arc<WritableDataSourceRegistry>) -> Self {
        ModifyRulesCommandHandler {
            flow: Arc::clone(sentinel.flow()),
            circuit_breaker: Arc::clone(sentinel.circuit_breaker()),
            authority: Arc::clone(sentinel.authority()),
            system: Arc::clone(sentinel.system()),
            registry,
        }
    }

    /// Loads the JSON encoded rules of `rule_type`, which is case insensitive.
    pub fn handle_rules(&self, rule_type: &str, data: &str) -> CommandResponse {
        logging::info!(
            "[ModifyRulesCommandHandler] Receiving rule change (type: {}): {}",
            rule_type,
            data
        );
        let res = match rule_type.to_lowercase().as_str() {
            FLOW_RULE_TYPE => decode::<flow::Rule>(data).map(|rules| {
                self.flow.load_rules(Vec::clone(&rules));
                write_to_data_source(self.registry.flow_data_source(), &rules)
            }),
            AUTHORITY_RULE_TYPE => decode::<authority::Rule>(data).map(|rules| {
                self.authority.load_rules(Vec::clone(&rules));
                write_to_data_source(self.registry.authority_data_source(), &rules)
            }),
            DEGRADE_RULE_TYPE => decode::<circuitbreaker::Rule>(data).map(|rules| {
                self.circuit_breaker.load_rules(Vec::clone(&rules));
                write_to_data_source(self.registry.degrade_data_source(), &rules)
            }),
            SYSTEM_RULE_TYPE => decode::<system::Rule>(data).map(|rules| {
                self.system.load_rules(Vec::clone(&rules));
                write_to_data_source(self.registry.system_data_source(), &rules)
            }),
            _ => return CommandResponse::Failure(INVALID_TYPE_MSG.into()),
        };
        match res {
            Ok(true) => CommandResponse::Success(SUCCESS_MSG.into()),
            Ok(false) => CommandResponse::Success(WRITE_DS_FAILURE_MSG.into()),
            Err(err) => CommandResponse::Failure(format!("decode rule data error: {}", err)),
        }
    }
}

impl CommandHandler for ModifyRulesCommandHandler {
    fn name(&self) -> &'static str {
        "setRules"
    }

    fn desc(&self) -> &'static str {
        "modify the rules, accept param: type={ruleType}&data={ruleJson}"
    }

    fn handle(&self, request: &CommandRequest) -> CommandResponse {
        let rule_type = request.param("type").unwrap_or_default();
        let data = request.param("data").unwrap_or_default();
        self.handle_rules(rule_type, data)
    }
}

fn decode<R: serde::de::DeserializeOwned>(data: &str) -> Result<Vec<Arc<R>>> {
    rule_json_array_parser(data).map_err(|err| {
        logging::info!("[ModifyRulesCommandHandler] Decode rule data error: {:?}", err);
        Error::msg(err.to_string())
    })
}

/// Returns false if the write failed, a missing data source is not a failure.
fn write_to_data_source<T: 'static>(
    ds: Option<Arc<dyn WritableDataSource<T>>>,
    value: &T,
) -> bool {
    match ds {
        Some(ds) => match ds.write(value) {
            Ok(_) => true,
            Err(err) => {
                logging::warn!(
                    "[ModifyRulesCommandHandler] Write data source failed, error: {:?}",
                    err
                );
                false
            }
        },
        None => true,
    }
}
