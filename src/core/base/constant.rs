/// Name of the node aggregating every inbound resource, read by the system rules.
pub const TOTAL_IN_BOUND_RESOURCE_NAME: &str = "__total_inbound_traffic__";
/// Name of the context created when an entry is built outside any explicit context.
pub const DEFAULT_CONTEXT_NAME: &str = "sentinel_default_context";

/// Resource nodes beyond this amount are not created, the entries of such resources
/// still pass through the chain without being counted.
pub const DEFAULT_MAX_RESOURCE_AMOUNT: usize = 10000;

// The window read by the flow rules: 2 buckets of 500ms.
pub const DEFAULT_SAMPLE_COUNT: u32 = 2;
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

// The global window kept by every resource node: 20 buckets of 500ms.
pub const DEFAULT_SAMPLE_COUNT_TOTAL: u32 = 20;
pub const DEFAULT_INTERVAL_MS_TOTAL: u32 = 10000;

/// Upper bound of a recorded response time, and the initial value of a bucket's minimum.
pub const DEFAULT_STATISTIC_MAX_RT: u64 = 60000;

/// Preallocated capacity of each slot list in a chain.
pub const SLOT_INIT: usize = 8;
