mod authority;
mod chain;
mod circuit_breaker;
mod datasource;
mod flow;

use sentinel_guard::{base::call_context, config::ConfigEntity, Sentinel};

pub fn new_sentinel() -> Sentinel {
    // entries of the tests share the thread local call context
    call_context::exit();
    Sentinel::with_config(ConfigEntity::new()).unwrap()
}
