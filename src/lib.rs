#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # Sentinel Guard
//!
//! An in-process traffic protection engine. Every guarded call ("resource" invocation)
//! traverses an ordered chain of processing slots on entry and on exit:
//!
//! node selection -> origin (cluster) statistics -> logging -> statistics ->
//! authority -> system protection -> flow control -> circuit breaking
//!
//! The slots decide whether the call may proceed, and record how it finished so that
//! the sliding-window statistics, the circuit breakers and the rate limiters see
//! real-time health data.
//!
//! Generally, there are several steps when using the crate:
//! 1. Build a [`Sentinel`] instance, optionally from a YAML configuration file.
//! 2. Load the rules for each resource through the rule managers owned by it.
//! 3. Build an entry before the guarded logic and exit it afterwards.
//!
//! ```rust
//! use sentinel_guard::{base, flow, Sentinel};
//! use std::sync::Arc;
//!
//! let sentinel = Sentinel::new().unwrap();
//! sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
//!     resource: "example".into(),
//!     threshold: 10.0,
//!     control_strategy: flow::ControlStrategy::Reject,
//!     ..Default::default()
//! })]);
//!
//! match sentinel
//!     .entry_builder("example")
//!     .with_traffic_type(base::TrafficType::Inbound)
//!     .build()
//! {
//!     Ok(entry) => {
//!         // The request is allowed to be processed.
//!         entry.exit();
//!     }
//!     Err(block_error) => {
//!         // The request is blocked, the entry has already been exited.
//!         println!("{}", block_error);
//!     }
//! }
//! ```
//!
//! Optional features lists:
//! - exporter: Export metric statistics to Prometheus.
//! - logger_env: Use `env_logger` to initialize logging.
//! - logger_log4rs: Use `log4rs` to initialize logging.

// This module is not intended to be part of the public API.
#[macro_use]
#[doc(hidden)]
pub mod macros;

/// Sentinel API: the owner object and the entry builder.
pub mod api;
/// Core implementations, including the statistic structures,
/// such as the sliding window and its underlying LeapArray, the slots,
/// the rule managers and the configuration.
pub mod core;
/// Dynamic datasource support for rule management.
pub mod datasource;
/// Adapters for different logging crates.
pub mod logging;
/// Command handlers consumed by the transport layer.
pub mod transport;
// Utility functions.
pub mod utils;
cfg_exporter! {
    /// Metric Exporter implementations. Currently, only Prometheus is supported.
    pub mod exporter;
}

// re-export precludes
pub use crate::core::*;
pub use api::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
