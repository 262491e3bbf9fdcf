//! Initialization of the Sentinel's runtime environment, including:
//! 1. resolve the config, from manually config or yaml file or env variable
//! 2. initialize the logger
//! 3. build the statistic storage, the rule managers and the slot chain
//! 4. start the background tasks, i.e., the system metric collectors and the time ticker
use super::{build_slot_chain, EntryBuilder, SlotChainParts};
use crate::{
    authority,
    base::SlotChain,
    circuitbreaker,
    config::{self, ConfigEntity},
    flow, log, logging,
    stat::NodeStorage,
    system,
    system_metric::SystemMetrics,
    utils, Result,
};
use std::sync::Arc;

/// Sentinel owns everything an entry relies on:
/// the config, the statistic nodes, the rule managers and the slot chain built upon them.
/// Entries built from different instances share nothing but the call context of the thread.
pub struct Sentinel {
    config: ConfigEntity,
    storage: Arc<NodeStorage>,
    flow: Arc<flow::RuleManager>,
    circuit_breaker: Arc<circuitbreaker::RuleManager>,
    authority: Arc<authority::RuleManager>,
    system: Arc<system::RuleManager>,
    system_metrics: Arc<SystemMetrics>,
    log_slot: Arc<log::Slot>,
    slot_chain: Arc<SlotChain>,
}

impl Sentinel {
    /// `new` initializes Sentinel using the configuration from system
    /// environment and the default value.
    pub fn new() -> Result<Self> {
        Self::from_yaml("")
    }

    /// `from_yaml` loads Sentinel general configuration from the given YAML file
    /// and initializes Sentinel. The system environment overrides the file.
    pub fn from_yaml(config_path: &str) -> Result<Self> {
        Self::with_config(config::load_config(config_path)?)
    }

    /// `with_config` initializes Sentinel using given config.
    pub fn with_config(config: ConfigEntity) -> Result<Self> {
        config.check()?;
        logging::logger_init(&config.config.log.logger);
        logging::info!("[Sentinel] Initializing with config: {}", config);

        let storage = Arc::new(NodeStorage::new(config.stat().clone())?);
        let flow = Arc::new(flow::RuleManager::new(Arc::clone(&storage)));
        let circuit_breaker = Arc::new(circuitbreaker::RuleManager::new());
        let authority = Arc::new(authority::RuleManager::new());
        let system = Arc::new(system::RuleManager::new());
        let system_metrics = Arc::new(SystemMetrics::new());
        let log_slot = Arc::new(log::Slot::new());
        let slot_chain = Arc::new(build_slot_chain(SlotChainParts {
            storage: Arc::clone(&storage),
            metrics: Arc::clone(&system_metrics),
            log_slot: Arc::clone(&log_slot),
            authority: Arc::clone(&authority),
            system: Arc::clone(&system),
            flow: Arc::clone(&flow),
            circuit_breaker: Arc::clone(&circuit_breaker),
        }));

        let sentinel = Sentinel {
            config,
            storage,
            flow,
            circuit_breaker,
            authority,
            system,
            system_metrics,
            log_slot,
            slot_chain,
        };
        sentinel.init_core_components();
        Ok(sentinel)
    }

    fn init_core_components(&self) {
        self.system_metrics
            .start_collectors(&self.config.config.stat.system);
        if self.config.config.use_cache_time {
            utils::start_time_ticker();
        }
        #[cfg(feature = "exporter")]
        crate::exporter::init(&self.config.config.log.exporter);
    }

    /// Starts to build an entry of the resource on the slot chain of this instance.
    pub fn entry_builder(&self, resource_name: &str) -> EntryBuilder {
        EntryBuilder::new(resource_name.into(), Arc::clone(&self.slot_chain))
    }

    pub fn config(&self) -> &ConfigEntity {
        &self.config
    }

    pub fn slot_chain(&self) -> &Arc<SlotChain> {
        &self.slot_chain
    }

    pub fn storage(&self) -> &Arc<NodeStorage> {
        &self.storage
    }

    pub fn flow(&self) -> &Arc<flow::RuleManager> {
        &self.flow
    }

    pub fn circuit_breaker(&self) -> &Arc<circuitbreaker::RuleManager> {
        &self.circuit_breaker
    }

    pub fn authority(&self) -> &Arc<authority::RuleManager> {
        &self.authority
    }

    pub fn system(&self) -> &Arc<system::RuleManager> {
        &self.system
    }

    pub fn system_metrics(&self) -> &Arc<SystemMetrics> {
        &self.system_metrics
    }

    /// Count of the entries blocked so far.
    pub fn blocked_count(&self) -> u64 {
        self.log_slot.blocked_count()
    }

    /// Clears every rule, every statistic node and the breaker state listeners.
    /// Mostly used between tests.
    pub fn reset(&self) {
        self.flow.clear_rules();
        self.circuit_breaker.clear_rules();
        self.circuit_breaker.clear_state_change_listeners();
        self.authority.clear_rules();
        self.system.clear_rules();
        self.storage.reset();
    }
}
