//! Identity of a guarded resource.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a resource, only used for display and for grouping in the exporter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceType {
    Common = 0,
    Web,
    RPC,
    APIGateway,
    DBSQL,
    Cache,
    MQ,
}

impl Default for ResourceType {
    fn default() -> ResourceType {
        ResourceType::Common
    }
}

/// Unknown codes fall back to `Common`.
impl From<u8> for ResourceType {
    fn from(num: u8) -> ResourceType {
        match num {
            1 => ResourceType::Web,
            2 => ResourceType::RPC,
            3 => ResourceType::APIGateway,
            4 => ResourceType::DBSQL,
            5 => ResourceType::Cache,
            6 => ResourceType::MQ,
            _ => ResourceType::Common,
        }
    }
}

/// Whether the resource serves incoming requests or calls other services.
/// Only inbound traffic is checked by the system rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficType {
    Outbound,
    Inbound,
}

impl Default for TrafficType {
    fn default() -> TrafficType {
        TrafficType::Outbound
    }
}

/// The resource an entry is built for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceWrapper {
    name: String,
    resource_type: ResourceType,
    traffic_type: TrafficType,
}

impl fmt::Display for ResourceWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.resource_type, self.traffic_type
        )
    }
}

impl ResourceWrapper {
    pub fn new(name: String, resource_type: ResourceType, traffic_type: TrafficType) -> Self {
        ResourceWrapper {
            name,
            resource_type,
            traffic_type,
        }
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn traffic_type(&self) -> &TrafficType {
        &self.traffic_type
    }
}
