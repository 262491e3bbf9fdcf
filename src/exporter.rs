//! Prometheus metrics of the guarded process.
//!
//! Every series is labelled with the host, the process and its pid,
//! so that the series of several processes on a host can be told apart.
use crate::{config::ExporterConfig, logging};
use lazy_static::lazy_static;
use prometheus_exporter::{
    prometheus::{core::Collector, default_registry, opts, CounterVec, GaugeVec, Registry},
    Builder,
};
use std::net::SocketAddr;
use std::sync::Once;
use sysinfo::{System, SystemExt};

const METRICS_PATH: &str = "/metrics";
const PROCESS_LABELS: [&str; 3] = ["host", "process", "pid"];

/// Values of the labels shared by every series.
struct ProcessLabels {
    host: String,
    process: String,
    pid: String,
}

impl ProcessLabels {
    fn collect() -> Self {
        ProcessLabels {
            host: System::new()
                .host_name()
                .unwrap_or_else(|| "<unknown>".to_owned()),
            process: std::env::args().next().unwrap_or_default(),
            pid: std::process::id().to_string(),
        }
    }

    fn with<'a>(&'a self, extra: &[&'a str]) -> Vec<&'a str> {
        let mut values = vec![self.host.as_str(), self.process.as_str(), self.pid.as_str()];
        values.extend_from_slice(extra);
        values
    }
}

fn label_names(extra: &[&'static str]) -> Vec<&'static str> {
    PROCESS_LABELS.iter().chain(extra).copied().collect()
}

lazy_static! {
    static ref LABELS: ProcessLabels = ProcessLabels::collect();
    static ref CPU_RATIO_GAUGE: GaugeVec = GaugeVec::new(
        opts!("sentinel_process_cpu_ratio", "CPU usage ratio of the host, in [0, 1]"),
        &label_names(&[])
    )
    .unwrap();
    static ref MEMORY_SIZE_GAUGE: GaugeVec = GaugeVec::new(
        opts!("sentinel_process_memory_size", "resident memory of the process, in KiB"),
        &label_names(&[])
    )
    .unwrap();
    static ref STATE_CHANGE_COUNTER: CounterVec = CounterVec::new(
        opts!(
            "sentinel_circuit_breaker_state_changed_total",
            "state transitions of the circuit breakers"
        ),
        &label_names(&["resource", "from_state", "to_state"])
    )
    .unwrap();
    static ref HANDLED_COUNTER: CounterVec = CounterVec::new(
        opts!("sentinel_handled_total", "entries handled by the slot chain"),
        &label_names(&["resource", "result"])
    )
    .unwrap();
    static ref INIT_ONCE: Once = Once::new();
}

pub fn set_cpu_ratio(ratio: f32) {
    CPU_RATIO_GAUGE
        .with_label_values(&LABELS.with(&[]))
        .set(ratio as f64);
}

pub fn set_memory_size(mem_size: u64) {
    MEMORY_SIZE_GAUGE
        .with_label_values(&LABELS.with(&[]))
        .set(mem_size as f64);
}

pub fn add_state_change_counter(resource: &str, from: &str, to: &str) {
    STATE_CHANGE_COUNTER
        .with_label_values(&LABELS.with(&[resource, from, to]))
        .inc();
}

/// Counts `batch_count` entries of `resource`, labelled "pass" or "block".
pub fn add_handled_counter(batch_count: u32, resource: &str, passed: bool) {
    let result = if passed { "pass" } else { "block" };
    HANDLED_COUNTER
        .with_label_values(&LABELS.with(&[resource, result]))
        .inc_by(batch_count as f64);
}

fn collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(CPU_RATIO_GAUGE.clone()),
        Box::new(MEMORY_SIZE_GAUGE.clone()),
        Box::new(STATE_CHANGE_COUNTER.clone()),
        Box::new(HANDLED_COUNTER.clone()),
    ]
}

fn register_sentinel_metrics(registry: &Registry) {
    for collector in collectors() {
        if let Err(err) = registry.register(collector) {
            logging::error!("[Exporter] Failed to register a metric, error: {:?}", err);
        }
    }
}

/// Drops every series recorded so far.
pub fn reset_sentinel_metrics() {
    CPU_RATIO_GAUGE.reset();
    MEMORY_SIZE_GAUGE.reset();
    STATE_CHANGE_COUNTER.reset();
    HANDLED_COUNTER.reset();
}

/// Registers the metrics and serves them on `config.addr`, only the first call takes effect.
/// Failures are logged, the engine keeps running without the endpoint.
pub fn init(config: &ExporterConfig) {
    INIT_ONCE.call_once(|| {
        // `prometheus_exporter` only serves the default registry
        register_sentinel_metrics(default_registry());
        let binding: SocketAddr = match config.addr.parse() {
            Ok(binding) => binding,
            Err(err) => {
                logging::error!(
                    "[Exporter] Invalid exporter address, addr: {}, error: {:?}",
                    config.addr,
                    err
                );
                return;
            }
        };
        let mut builder = Builder::new(binding);
        if let Err(err) = builder.with_endpoint(METRICS_PATH) {
            logging::error!("[Exporter] Invalid metrics path, error: {:?}", err);
            return;
        }
        match builder.start() {
            Ok(_) => logging::info!("[Exporter] Serving metrics on {}{}", binding, METRICS_PATH),
            Err(err) => logging::error!(
                "[Exporter] Failed to start the exporter, addr: {}, error: {:?}",
                config.addr,
                err
            ),
        }
    });
}
