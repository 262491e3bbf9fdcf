use super::ResourceNode;
use crate::{
    base::{ResourceType, DEFAULT_MAX_RESOURCE_AMOUNT, TOTAL_IN_BOUND_RESOURCE_NAME},
    config::StatConfig,
    logging, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type ResourceNodeMap = HashMap<String, Arc<ResourceNode>>;
type OriginNodeMap = HashMap<(String, String), Arc<ResourceNode>>;

/// NodeStorage caches the statistic nodes.
/// Nodes are created on the first visit and live as long as the storage,
/// `reset()` drops them all.
#[derive(Debug)]
pub struct NodeStorage {
    stat: StatConfig,
    inbound: Arc<ResourceNode>,
    resource_nodes: RwLock<ResourceNodeMap>,
    origin_nodes: RwLock<OriginNodeMap>,
}

impl NodeStorage {
    pub fn new(stat: StatConfig) -> Result<Self> {
        let inbound = Arc::new(ResourceNode::new(
            TOTAL_IN_BOUND_RESOURCE_NAME.into(),
            ResourceType::Common,
            &stat,
        )?);
        Ok(NodeStorage {
            stat,
            inbound,
            resource_nodes: RwLock::new(ResourceNodeMap::new()),
            origin_nodes: RwLock::new(OriginNodeMap::new()),
        })
    }

    pub fn stat_config(&self) -> &StatConfig {
        &self.stat
    }

    /// The node of all the inbound traffic, used by the system rules.
    pub fn inbound_node(&self) -> Arc<ResourceNode> {
        Arc::clone(&self.inbound)
    }

    // resource_node_list returns the slice of all existing resource nodes.
    pub fn resource_node_list(&self) -> Vec<Arc<ResourceNode>> {
        self.resource_nodes.read().unwrap().values().cloned().collect()
    }

    pub fn get_resource_node(&self, res_name: &str) -> Option<Arc<ResourceNode>> {
        self.resource_nodes.read().unwrap().get(res_name).cloned()
    }

    pub fn get_or_create_resource_node(
        &self,
        res_name: &str,
        resource_type: ResourceType,
    ) -> Result<Arc<ResourceNode>> {
        if let Some(node) = self.get_resource_node(res_name) {
            return Ok(node);
        }
        let mut nodes = self.resource_nodes.write().unwrap();
        // created by another thread in the meantime
        if let Some(node) = nodes.get(res_name) {
            return Ok(Arc::clone(node));
        }
        if nodes.len() >= DEFAULT_MAX_RESOURCE_AMOUNT {
            logging::warn!(
                "[NodeStorage get_or_create_resource_node] Resource amount exceeds the threshold {}",
                DEFAULT_MAX_RESOURCE_AMOUNT
            );
        }
        let node = Arc::new(ResourceNode::new(res_name.into(), resource_type, &self.stat)?);
        nodes.insert(res_name.into(), Arc::clone(&node));
        Ok(node)
    }

    pub fn get_origin_node(&self, res_name: &str, origin: &str) -> Option<Arc<ResourceNode>> {
        self.origin_nodes
            .read()
            .unwrap()
            .get(&(res_name.to_owned(), origin.to_owned()))
            .cloned()
    }

    /// The node of the calls to `res_name` from `origin`.
    pub fn get_or_create_origin_node(
        &self,
        res_name: &str,
        resource_type: ResourceType,
        origin: &str,
    ) -> Result<Arc<ResourceNode>> {
        if let Some(node) = self.get_origin_node(res_name, origin) {
            return Ok(node);
        }
        let key = (res_name.to_owned(), origin.to_owned());
        let mut nodes = self.origin_nodes.write().unwrap();
        if let Some(node) = nodes.get(&key) {
            return Ok(Arc::clone(node));
        }
        let node = Arc::new(ResourceNode::new(res_name.into(), resource_type, &self.stat)?);
        nodes.insert(key, Arc::clone(&node));
        Ok(node)
    }

    pub fn reset(&self) {
        self.resource_nodes.write().unwrap().clear();
        self.origin_nodes.write().unwrap().clear();
        self.inbound.reset();
    }
}
