use super::*;
use crate::{
    base::SentinelRule,
    logging,
    property::{PropertyBinding, RuleLoader, RuleProperty},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;

/// RuleManager holds the authority rules of each resource.
#[derive(Debug, Default)]
pub struct RuleManager {
    current_rules: Mutex<Vec<Arc<Rule>>>,
    rule_map: RwLock<Arc<RuleMap>>,
    property: PropertyBinding<Rule>,
}

impl RuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `load_rules` replaces all the authority rules,
    /// returns false if the rules are the same with the previous ones.
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut current_rules = self.current_rules.lock().unwrap();
        if *current_rules == rules {
            logging::info!(
                "[Authority] Load rules is the same with current rules, so ignore load operation."
            );
            return false;
        }
        let mut rule_map = RuleMap::new();
        for rule in &rules {
            if let Err(err) = rule.is_valid() {
                logging::warn!(
                    "[Authority load_rules] Ignoring invalid authority rule, rule: {:?}, reason: {:?}",
                    rule,
                    err
                );
                continue;
            }
            rule_map
                .entry(rule.resource.clone())
                .or_default()
                .push(Arc::clone(rule));
        }
        if rule_map.is_empty() {
            logging::info!("[Authority] Authority rules were cleared")
        } else {
            logging::info!(
                "[Authority] Authority rules were loaded: {:?}",
                rule_map.values()
            )
        }
        *self.rule_map.write().unwrap() = Arc::new(rule_map);
        *current_rules = rules;
        true
    }

    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.rule_map().values().flatten().cloned().collect()
    }

    pub fn get_rules_of_resource(&self, res: &str) -> Vec<Arc<Rule>> {
        self.rule_map().get(res).cloned().unwrap_or_default()
    }

    pub fn clear_rules(&self) {
        self.current_rules.lock().unwrap().clear();
        *self.rule_map.write().unwrap() = Arc::new(RuleMap::new());
    }

    /// Subscribes to the rule property, e.g., of a data source.
    /// The previously registered property is detached.
    pub fn register_property(self: &Arc<Self>, property: Arc<RuleProperty<Rule>>) {
        self.property.bind(self, property);
    }

    fn rule_map(&self) -> Arc<RuleMap> {
        Arc::clone(&self.rule_map.read().unwrap())
    }
}

impl RuleLoader<Rule> for RuleManager {
    fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        RuleManager::load_rules(self, rules)
    }
}
