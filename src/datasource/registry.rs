use super::WritableDataSource;
use crate::{authority, circuitbreaker, flow, system};
use std::sync::{Arc, RwLock};

pub type FlowWritableDataSource = dyn WritableDataSource<Vec<Arc<flow::Rule>>>;
pub type AuthorityWritableDataSource = dyn WritableDataSource<Vec<Arc<authority::Rule>>>;
pub type DegradeWritableDataSource = dyn WritableDataSource<Vec<Arc<circuitbreaker::Rule>>>;
pub type SystemWritableDataSource = dyn WritableDataSource<Vec<Arc<system::Rule>>>;

/// The writable data sources the rules pushed by the command handler are persisted to,
/// at most one per rule type.
#[derive(Default)]
pub struct WritableDataSourceRegistry {
    flow: RwLock<Option<Arc<FlowWritableDataSource>>>,
    authority: RwLock<Option<Arc<AuthorityWritableDataSource>>>,
    degrade: RwLock<Option<Arc<DegradeWritableDataSource>>>,
    system: RwLock<Option<Arc<SystemWritableDataSource>>>,
}

impl WritableDataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_flow_data_source(&self, ds: Arc<FlowWritableDataSource>) {
        *self.flow.write().unwrap() = Some(ds);
    }

    pub fn register_authority_data_source(&self, ds: Arc<AuthorityWritableDataSource>) {
        *self.authority.write().unwrap() = Some(ds);
    }

    pub fn register_degrade_data_source(&self, ds: Arc<DegradeWritableDataSource>) {
        *self.degrade.write().unwrap() = Some(ds);
    }

    pub fn register_system_data_source(&self, ds: Arc<SystemWritableDataSource>) {
        *self.system.write().unwrap() = Some(ds);
    }

    pub fn flow_data_source(&self) -> Option<Arc<FlowWritableDataSource>> {
        self.flow.read().unwrap().clone()
    }

    pub fn authority_data_source(&self) -> Option<Arc<AuthorityWritableDataSource>> {
        self.authority.read().unwrap().clone()
    }

    pub fn degrade_data_source(&self) -> Option<Arc<DegradeWritableDataSource>> {
        self.degrade.read().unwrap().clone()
    }

    pub fn system_data_source(&self) -> Option<Arc<SystemWritableDataSource>> {
        self.system.read().unwrap().clone()
    }
}
