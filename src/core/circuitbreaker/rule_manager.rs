use super::*;
use crate::{
    base::SentinelRule,
    logging,
    property::{PropertyBinding, RuleLoader, RuleProperty},
    utils, Error, Result,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Builds a circuit breaker of a rule. The statistic of a previous breaker is passed in
/// when it is reusable, otherwise the generator creates a new one.
pub type BreakerGenFn = dyn Send
    + Sync
    + Fn(
        Arc<Rule>,
        Option<Arc<CounterLeapArray>>,
        Arc<StateChangeListeners>,
    ) -> Result<Arc<dyn CircuitBreakerTrait>>;

pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;
pub type BreakerMap = HashMap<String, Vec<Arc<dyn CircuitBreakerTrait>>>;

const DEFAULT_GENERATOR_IMMUTABLE: &str = "Default circuit breakers are not allowed to be modified.";

fn gen_slow_request(
    rule: Arc<Rule>,
    stat: Option<Arc<CounterLeapArray>>,
    listeners: Arc<StateChangeListeners>,
) -> Result<Arc<dyn CircuitBreakerTrait>> {
    Ok(match stat {
        Some(stat) => Arc::new(SlowRtBreaker::new_with_stat(rule, stat, listeners)),
        None => Arc::new(SlowRtBreaker::new(rule, listeners)?),
    })
}

fn gen_exception(
    rule: Arc<Rule>,
    stat: Option<Arc<CounterLeapArray>>,
    listeners: Arc<StateChangeListeners>,
) -> Result<Arc<dyn CircuitBreakerTrait>> {
    Ok(match stat {
        Some(stat) => Arc::new(ExceptionBreaker::new_with_stat(rule, stat, listeners)),
        None => Arc::new(ExceptionBreaker::new(rule, listeners)?),
    })
}

fn default_generators() -> HashMap<BreakerStrategy, Arc<BreakerGenFn>> {
    let mut generators: HashMap<BreakerStrategy, Arc<BreakerGenFn>> = HashMap::new();
    generators.insert(BreakerStrategy::SlowRequestRatio, Arc::new(gen_slow_request));
    generators.insert(BreakerStrategy::ErrorCount, Arc::new(gen_exception));
    generators.insert(BreakerStrategy::ErrorRatio, Arc::new(gen_exception));
    generators
}

/// RuleManager holds the circuit breaking rules and the breakers bound to them.
/// A breaker of a rule equal to a previous one survives reloads together with its state.
pub struct RuleManager {
    // the rules as loaded, to detect repeated loads
    rule_map: Mutex<RuleMap>,
    breaker_map: RwLock<Arc<BreakerMap>>,
    generators: RwLock<HashMap<BreakerStrategy, Arc<BreakerGenFn>>>,
    // shared by all the breakers
    listeners: Arc<StateChangeListeners>,
    property: PropertyBinding<Rule>,
}

impl fmt::Debug for RuleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleManager")
            .field("breaker_map", &self.breaker_map)
            .field("listeners", &self.listeners)
            .field("property", &self.property)
            .finish()
    }
}

impl Default for RuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleManager {
    pub fn new() -> Self {
        RuleManager {
            rule_map: Mutex::new(RuleMap::new()),
            breaker_map: RwLock::new(Arc::new(BreakerMap::new())),
            generators: RwLock::new(default_generators()),
            listeners: Arc::new(StateChangeListeners::new()),
            property: PropertyBinding::default(),
        }
    }

    /// load_rules replaces old rules with the given circuit breaking rules.
    /// returned `bool` indicate whether the internal map has been changed
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut rule_map = RuleMap::new();
        for rule in rules {
            rule_map.entry(rule.resource.clone()).or_default().push(rule);
        }

        let mut global_rule_map = self.rule_map.lock().unwrap();
        if *global_rule_map == rule_map {
            logging::info!(
                "[CircuitBreaker] Loaded rules is the same with current rules, so ignore load operation."
            );
            return false;
        }

        let start = utils::curr_time_nanos();
        let old_breaker_map = self.breaker_map();
        let mut breaker_map = BreakerMap::with_capacity(rule_map.len());
        for (res, rules) in &rule_map {
            let valid_rules: Vec<_> = rules
                .iter()
                .filter(|rule| match rule.is_valid() {
                    Ok(_) => true,
                    Err(err) => {
                        logging::warn!(
                            "[CircuitBreaker load_rules] Ignoring invalid circuit breaking rule {:?}, reason: {:?}",
                            rule,
                            err
                        );
                        false
                    }
                })
                .cloned()
                .collect();
            let old_cbs = old_breaker_map
                .get(res)
                .map(|cbs| cbs.as_slice())
                .unwrap_or(&[]);
            let cbs = self.build_resource_circuit_breaker(res, &valid_rules, old_cbs);
            if !cbs.is_empty() {
                breaker_map.insert(res.clone(), cbs);
            }
        }

        if breaker_map.is_empty() {
            logging::info!("[CircuitBreaker] Circuit breaking rules were cleared")
        } else {
            logging::info!(
                "[CircuitBreaker] Circuit breaking rules were loaded: {:?}",
                breaker_map
                    .values()
                    .flatten()
                    .map(|cb| cb.bound_rule())
                    .collect::<Vec<_>>()
            )
        }
        *self.breaker_map.write().unwrap() = Arc::new(breaker_map);
        *global_rule_map = rule_map;
        drop(global_rule_map);
        logging::debug!(
            "[CircuitBreaker load_rules] Time statistic(ns) for updating circuit breaker rule, time cost {}",
            utils::curr_time_nanos() - start
        );
        true
    }

    /// `get_rules` returns the rules of all the active breakers.
    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.breaker_map()
            .values()
            .flatten()
            .map(|cb| Arc::clone(cb.bound_rule()))
            .collect()
    }

    /// `get_rules_of_resource` returns specific resource's rules
    pub fn get_rules_of_resource(&self, res: &str) -> Vec<Arc<Rule>> {
        self.get_breakers_of_resource(res)
            .iter()
            .map(|cb| Arc::clone(cb.bound_rule()))
            .collect()
    }

    pub fn get_breakers_of_resource(&self, res: &str) -> Vec<Arc<dyn CircuitBreakerTrait>> {
        self.breaker_map().get(res).cloned().unwrap_or_default()
    }

    /// `clear_rules` clear all the previous rules.
    pub fn clear_rules(&self) {
        self.rule_map.lock().unwrap().clear();
        *self.breaker_map.write().unwrap() = Arc::new(BreakerMap::new());
    }

    /// register_state_change_listeners registers the state change listeners for all circuit breakers,
    /// including the ones generated before.
    pub fn register_state_change_listeners(&self, listeners: Vec<Arc<dyn StateChangeListener>>) {
        for listener in listeners {
            self.listeners.add(listener);
        }
    }

    /// clear_state_change_listeners clears the all StateChangeListener
    pub fn clear_state_change_listeners(&self) {
        self.listeners.clear();
    }

    /// set_circuit_breaker_generator sets the circuit breaker generator for the given strategy.
    /// Note that modifying the generator of default strategies is not allowed.
    pub fn set_circuit_breaker_generator(
        &self,
        strategy: BreakerStrategy,
        generator: Arc<BreakerGenFn>,
    ) -> Result<()> {
        match strategy {
            BreakerStrategy::Custom(_) => {
                self.generators.write().unwrap().insert(strategy, generator);
                Ok(())
            }
            _ => Err(Error::msg(DEFAULT_GENERATOR_IMMUTABLE)),
        }
    }

    pub fn remove_circuit_breaker_generator(&self, strategy: &BreakerStrategy) -> Result<()> {
        match strategy {
            BreakerStrategy::Custom(_) => {
                self.generators.write().unwrap().remove(strategy);
                Ok(())
            }
            _ => Err(Error::msg(DEFAULT_GENERATOR_IMMUTABLE)),
        }
    }

    /// Subscribes to the rule property, e.g., of a data source.
    /// The previously registered property is detached.
    pub fn register_property(self: &Arc<Self>, property: Arc<RuleProperty<Rule>>) {
        self.property.bind(self, property);
    }

    fn breaker_map(&self) -> Arc<BreakerMap> {
        Arc::clone(&self.breaker_map.read().unwrap())
    }

    /// build_resource_circuit_breaker builds the breakers of the rules of `res`.
    /// The breaker of an equal rule is reused as is,
    /// the statistic of a stat-reusable rule is handed to the new breaker.
    fn build_resource_circuit_breaker(
        &self,
        res: &str,
        rules: &[Arc<Rule>],
        old_cbs: &[Arc<dyn CircuitBreakerTrait>],
    ) -> Vec<Arc<dyn CircuitBreakerTrait>> {
        let mut reusable: Vec<Option<&Arc<dyn CircuitBreakerTrait>>> =
            old_cbs.iter().map(Some).collect();
        let mut cbs = Vec::with_capacity(rules.len());
        for rule in rules {
            let (eq_idx, reuse_stat_idx) = calculate_reuse_index_for(rule, &reusable);
            if let Some(cb) = eq_idx.and_then(|idx| reusable[idx].take()) {
                cbs.push(Arc::clone(cb));
                continue;
            }
            let stat = reuse_stat_idx
                .and_then(|idx| reusable[idx].take())
                .map(|cb| Arc::clone(cb.stat()));
            let generator = self.generators.read().unwrap().get(&rule.strategy).cloned();
            let generator = match generator {
                Some(generator) => generator,
                None => {
                    logging::warn!(
                        "[CircuitBreaker build_resource_circuit_breaker] Ignoring the rule due to unsupported circuit breaking strategy, resource: {}, rule: {:?}",
                        res,
                        rule
                    );
                    continue;
                }
            };
            match generator(Arc::clone(rule), stat, Arc::clone(&self.listeners)) {
                Ok(cb) => cbs.push(cb),
                Err(err) => logging::warn!(
                    "[CircuitBreaker build_resource_circuit_breaker] Ignoring the rule due to bad generated circuit breaker, resource: {}, rule: {:?}, error: {:?}",
                    res,
                    rule,
                    err
                ),
            }
        }
        cbs
    }
}

/// Returns the index of the breaker with an equal rule,
/// and the index of the first breaker whose statistic can be reused by `rule`.
pub fn calculate_reuse_index_for(
    rule: &Rule,
    old_cbs: &[Option<&Arc<dyn CircuitBreakerTrait>>],
) -> (Option<usize>, Option<usize>) {
    let mut reuse_stat_idx = None;
    for (idx, old_cb) in old_cbs.iter().enumerate() {
        let old_rule = match old_cb {
            Some(cb) => cb.bound_rule(),
            None => continue,
        };
        if old_rule.as_ref() == rule {
            return (Some(idx), reuse_stat_idx);
        }
        if reuse_stat_idx.is_none() && old_rule.is_stat_reusable(rule) {
            reuse_stat_idx = Some(idx);
        }
    }
    (None, reuse_stat_idx)
}

impl RuleLoader<Rule> for RuleManager {
    fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        RuleManager::load_rules(self, rules)
    }
}
