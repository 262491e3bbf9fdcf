use super::*;
use crate::{
    base::SentinelRule,
    logging,
    property::{PropertyBinding, RuleLoader, RuleProperty},
    utils,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

pub type RuleMap = HashMap<MetricType, Vec<Arc<Rule>>>;

/// RuleManager holds the system adaptive rules, grouped by the metric they guard.
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

    /// `load_rules` loads given system rules to the rule manager, while all previous rules will be replaced.
    /// Returns false if the rules are the same with the previous ones.
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut current_rules = self.current_rules.lock().unwrap();
        if *current_rules == rules {
            logging::info!(
                "[System] Load rules is the same with current rules, so ignore load operation."
            );
            return false;
        }

        let start = utils::curr_time_nanos();
        let rule_map = build_rule_map(&rules);
        logging::info!(
            "[SystemRuleManager] System rules loaded, rules {:?}",
            rule_map
        );
        *self.rule_map.write().unwrap() = Arc::new(rule_map);
        *current_rules = rules;
        logging::debug!(
            "[System load_rules] Time statistic(ns) for updating system rule, timeCost {:?}",
            utils::curr_time_nanos() - start
        );
        true
    }

    /// `get_rules` returns all the valid rules.
    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.rule_map().values().flatten().cloned().collect()
    }

    pub fn get_rules_of_metric(&self, metric_type: MetricType) -> Vec<Arc<Rule>> {
        self.rule_map()
            .get(&metric_type)
            .cloned()
            .unwrap_or_default()
    }

    /// `clear_rules` clear all the previous rules
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

fn build_rule_map(rules: &[Arc<Rule>]) -> RuleMap {
    let mut m = RuleMap::new();
    for rule in rules {
        if let Err(err) = rule.is_valid() {
            logging::warn!(
                "[System build_rule_map] Ignoring invalid system rule, rule: {:?}, error: {:?}",
                rule,
                err
            );
            continue;
        }
        m.entry(rule.metric_type)
            .or_default()
            .push(Arc::clone(rule));
    }
    m
}

#[cfg(test)]
mod test {
    use super::*;

    fn qps_rule(threshold: f64) -> Arc<Rule> {
        Arc::new(Rule {
            metric_type: MetricType::InboundQPS,
            threshold,
            ..Default::default()
        })
    }

    #[test]
    fn empty_rules() {
        let manager = RuleManager::new();
        assert!(manager.get_rules().is_empty());
    }

    #[test]
    fn load_and_clear() {
        let manager = RuleManager::new();
        let rules = vec![
            qps_rule(1.0),
            Arc::new(Rule {
                metric_type: MetricType::Concurrency,
                threshold: 2.0,
                ..Default::default()
            }),
            qps_rule(-1.0),
        ];
        assert!(manager.load_rules(rules.clone()));
        assert!(!manager.load_rules(rules));
        assert_eq!(manager.get_rules().len(), 2);
        assert_eq!(manager.get_rules_of_metric(MetricType::InboundQPS).len(), 1);
        assert!(manager.get_rules_of_metric(MetricType::Load).is_empty());

        manager.clear_rules();
        assert!(manager.get_rules().is_empty());
    }

    #[test]
    fn invalid_build_map() {
        assert!(build_rule_map(&[qps_rule(-1.0)]).is_empty());
    }

    #[test]
    fn valid_build_map() {
        let map = build_rule_map(&[qps_rule(1.0), qps_rule(2.0)]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&MetricType::InboundQPS].len(), 2);
    }
}
