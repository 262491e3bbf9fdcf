use super::*;
use crate::{
    base::{ReadStat, ResourceType, SentinelRule, StatNode},
    logging,
    property::{PropertyBinding, RuleLoader, RuleProperty},
    stat::NodeStorage,
    utils, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// ControllerMap represents the map storage for Controller.
pub type ControllerMap = HashMap<String, Vec<Arc<Controller>>>;
pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;

fn log_rule_update(map: &RuleMap) {
    if map.is_empty() {
        logging::info!("[FlowRuleManager] Flow rules were cleared")
    } else {
        logging::info!(
            "[FlowRuleManager] Flow rules were loaded: {:?}",
            map.values()
        )
    }
}

/// RuleManager holds the flow rules and the traffic shaping controllers generated from them.
/// The controllers of all resources are swapped at once on every effective reload,
/// the slot always sees a complete rule set.
#[derive(Debug)]
pub struct RuleManager {
    storage: Arc<NodeStorage>,
    // the rules as loaded, including the invalid ones, to detect repeated loads
    rule_map: Mutex<RuleMap>,
    controller_map: RwLock<Arc<ControllerMap>>,
    property: PropertyBinding<Rule>,
}

impl RuleManager {
    pub fn new(storage: Arc<NodeStorage>) -> Self {
        RuleManager {
            storage,
            rule_map: Mutex::new(RuleMap::new()),
            controller_map: RwLock::new(Arc::new(ControllerMap::new())),
            property: PropertyBinding::default(),
        }
    }

    pub fn storage(&self) -> &Arc<NodeStorage> {
        &self.storage
    }

    /// `load_rules` loads the given flow rules to the rule manager, while all previous rules will be replaced.
    /// The returned `bool` indicates whether do real load operation, if the rules is the same with previous rules, return false
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut rule_map = RuleMap::new();
        for rule in rules {
            rule_map.entry(rule.resource.clone()).or_default().push(rule);
        }

        let mut global_rule_map = self.rule_map.lock().unwrap();
        if *global_rule_map == rule_map {
            logging::info!(
                "[Flow] Load rules is the same with current rules, so ignore load operation."
            );
            return false;
        }

        let mut valid_rules_map = RuleMap::with_capacity(rule_map.len());
        for (res, rules) in &rule_map {
            let valid_rules: Vec<_> = rules
                .iter()
                .filter(|rule| match rule.is_valid() {
                    Ok(_) => true,
                    Err(err) => {
                        logging::warn!(
                            "[Flow load_rules] Ignoring invalid flow rule {:?}, reason: {:?}",
                            rule,
                            err
                        );
                        false
                    }
                })
                .cloned()
                .collect();
            if !valid_rules.is_empty() {
                valid_rules_map.insert(res.clone(), valid_rules);
            }
        }

        let start = utils::curr_time_nanos();
        let old_controller_map = self.controller_map();
        let mut controller_map = ControllerMap::with_capacity(valid_rules_map.len());
        for (res, rules) in &valid_rules_map {
            let old_tcs = old_controller_map
                .get(res)
                .map(|tcs| tcs.as_slice())
                .unwrap_or(&[]);
            let tcs = self.build_resource_controllers(res, rules, old_tcs);
            if !tcs.is_empty() {
                controller_map.insert(res.clone(), tcs);
            }
        }
        *self.controller_map.write().unwrap() = Arc::new(controller_map);
        *global_rule_map = rule_map;
        drop(global_rule_map);
        logging::debug!(
            "[Flow load_rules] Time statistic(ns) for updating flow rule, time cost {}",
            utils::curr_time_nanos() - start
        );
        log_rule_update(&valid_rules_map);
        true
    }

    /// `get_rules` returns all the effective rules, that is the valid ones.
    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.controller_map()
            .values()
            .flatten()
            .map(|tc| Arc::clone(tc.rule()))
            .collect()
    }

    /// `get_rules_of_resource` returns specific resource's rules
    pub fn get_rules_of_resource(&self, res: &str) -> Vec<Arc<Rule>> {
        self.get_controllers_of_resource(res)
            .iter()
            .map(|tc| Arc::clone(tc.rule()))
            .collect()
    }

    pub fn get_controllers_of_resource(&self, res: &str) -> Vec<Arc<Controller>> {
        self.controller_map()
            .get(res)
            .cloned()
            .unwrap_or_default()
    }

    /// clear_rules clears all the rules in flow module.
    pub fn clear_rules(&self) {
        self.rule_map.lock().unwrap().clear();
        *self.controller_map.write().unwrap() = Arc::new(ControllerMap::new());
    }

    /// Subscribes to the rule property, e.g., of a data source.
    /// The previously registered property is detached.
    pub fn register_property(self: &Arc<Self>, property: Arc<RuleProperty<Rule>>) {
        self.property.bind(self, property);
    }

    fn controller_map(&self) -> Arc<ControllerMap> {
        Arc::clone(&self.controller_map.read().unwrap())
    }

    /// Controllers bound to equal rules are reused, the others are generated.
    fn build_resource_controllers(
        &self,
        res: &str,
        rules: &[Arc<Rule>],
        old_tcs: &[Arc<Controller>],
    ) -> Vec<Arc<Controller>> {
        let mut reusable: Vec<Option<&Arc<Controller>>> = old_tcs.iter().map(Some).collect();
        let mut tcs = Vec::with_capacity(rules.len());
        for rule in rules {
            let reused = reusable
                .iter_mut()
                .find(|tc| tc.map_or(false, |tc| tc.rule().as_ref() == rule.as_ref()))
                .and_then(|tc| tc.take());
            if let Some(tc) = reused {
                tcs.push(Arc::clone(tc));
                continue;
            }
            match self.generate_controller(rule) {
                Ok(tc) => tcs.push(tc),
                Err(err) => logging::warn!(
                    "[Flow build_resource_controllers] Ignoring the flow rule of resource {}, rule: {:?}, reason: {:?}",
                    res,
                    rule,
                    err
                ),
            }
        }
        tcs
    }

    fn generate_controller(&self, rule: &Arc<Rule>) -> Result<Arc<Controller>> {
        let checker: Box<dyn Checker> = match rule.control_strategy {
            ControlStrategy::Reject => {
                Box::new(RejectChecker::new(Arc::clone(rule), self.read_stat_for(rule)?))
            }
            ControlStrategy::RateLimiter => Box::new(RateLimiterChecker::new(Arc::clone(rule))),
        };
        Ok(Arc::new(Controller::new(Arc::clone(rule), checker)))
    }

    /// The metric a `Reject` rule reads, a view over the global statistic of the resource,
    /// or of the (resource, origin) pair when the rule limits an origin.
    fn read_stat_for(&self, rule: &Rule) -> Result<Arc<dyn ReadStat>> {
        let node = if rule.limit_origin.is_empty() {
            self.storage
                .get_or_create_resource_node(&rule.resource, ResourceType::Common)?
        } else {
            self.storage.get_or_create_origin_node(
                &rule.resource,
                ResourceType::Common,
                &rule.limit_origin,
            )?
        };
        if rule.stat_interval_ms == 0 {
            return Ok(node.default_metric());
        }
        let stat = self.storage.stat_config();
        let bucket_len_ms = stat.interval_ms_total / stat.sample_count_total.max(1);
        let sample_count = rule.stat_interval_ms / bucket_len_ms.max(1);
        node.generate_read_stat(sample_count, rule.stat_interval_ms)
    }
}

impl RuleLoader<Rule> for RuleManager {
    fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        RuleManager::load_rules(self, rules)
    }
}
