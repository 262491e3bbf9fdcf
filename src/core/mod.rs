pub mod base;
pub mod config;
pub mod property;
pub mod system_metric;

// slots preparing the nodes and recording the statistics
pub mod stat;
pub mod log;

// slots checking the rules
pub mod authority;
pub mod circuitbreaker;
pub mod flow;
pub mod system;
