//! Collectors of the process and host metrics read by the system adaptive rules.
//!
//! Each collector runs on its own background thread, refreshing a cached value
//! every configured interval. The threads stop once the owning `SystemMetrics` is dropped.
use crate::{config::SystemStatConfig, logging, utils};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, Weak,
};
use sysinfo::{get_current_pid, ProcessExt, System, SystemExt};

#[derive(Debug)]
pub struct SystemMetrics {
    // created on the first use, scanning the processes is expensive
    system: Mutex<Option<System>>,
    // f64 bits
    current_load: AtomicU64,
    // f32 ratio, stored as f64 bits
    current_cpu: AtomicU64,
    // KBytes
    current_memory: AtomicU64,
    started: AtomicBool,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics {
    pub fn new() -> Self {
        SystemMetrics {
            system: Mutex::new(None),
            current_load: AtomicU64::new(0f64.to_bits()),
            current_cpu: AtomicU64::new(0f64.to_bits()),
            current_memory: AtomicU64::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Starts the load, cpu and memory collectors, only the first call takes effect.
    /// An interval of 0 disables the matched collector.
    pub fn start_collectors(self: &Arc<Self>, config: &SystemStatConfig) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        spawn_collector(self, "sentinel-load-collector", config.load_interval_ms, |m| {
            let load = m.retrieve_system_load();
            m.set_system_load(load);
        });
        spawn_collector(self, "sentinel-cpu-collector", config.cpu_interval_ms, |m| {
            let cpu = m.retrieve_process_cpu();
            #[cfg(feature = "exporter")]
            crate::exporter::set_cpu_ratio(cpu);
            m.set_cpu_usage(cpu);
        });
        spawn_collector(
            self,
            "sentinel-memory-collector",
            config.memory_interval_ms,
            |m| {
                let memory = m.retrieve_process_memory();
                #[cfg(feature = "exporter")]
                crate::exporter::set_memory_size(memory);
                m.set_memory_usage(memory);
            },
        );
    }

    /// total_memory_size returns the current machine's memory statistic in KBytes
    pub fn total_memory_size(&self) -> u64 {
        self.with_system(|system| {
            system.refresh_memory();
            system.total_memory()
        })
    }

    fn with_system<T>(&self, f: impl FnOnce(&mut System) -> T) -> T {
        let mut system = self.system.lock().unwrap();
        f(system.get_or_insert_with(System::new_all))
    }

    /// The one minute load average of the host.
    pub fn current_load(&self) -> f64 {
        f64::from_bits(self.current_load.load(Ordering::SeqCst))
    }

    pub fn set_system_load(&self, load: f64) {
        self.current_load.store(load.to_bits(), Ordering::SeqCst)
    }

    /// The cpu usage of the process, as a ratio in [0, 1] per core.
    pub fn current_cpu_usage(&self) -> f32 {
        f64::from_bits(self.current_cpu.load(Ordering::SeqCst)) as f32
    }

    pub fn set_cpu_usage(&self, usage: f32) {
        self.current_cpu
            .store((usage as f64).to_bits(), Ordering::SeqCst)
    }

    /// The memory used by the process, in KBytes.
    pub fn current_memory_usage(&self) -> u64 {
        self.current_memory.load(Ordering::SeqCst)
    }

    pub fn set_memory_usage(&self, usage: u64) {
        self.current_memory.store(usage, Ordering::SeqCst)
    }

    fn retrieve_system_load(&self) -> f64 {
        self.with_system(|system| system.load_average().one)
    }

    fn retrieve_process_cpu(&self) -> f32 {
        match get_current_pid() {
            Ok(pid) => self.with_system(|system| {
                system.refresh_process(pid);
                system
                    .process(pid)
                    .map_or(0.0, |process| process.cpu_usage() / 100.0)
            }),
            Err(err) => {
                logging::FREQUENT_ERROR_ONCE.call_once(|| {
                    logging::error!(
                        "[SystemMetrics] Failed to retrieve current pid, error: {}",
                        err
                    )
                });
                0.0
            }
        }
    }

    fn retrieve_process_memory(&self) -> u64 {
        match get_current_pid() {
            Ok(pid) => self.with_system(|system| {
                system.refresh_process(pid);
                system.process(pid).map_or(0, |process| process.memory())
            }),
            Err(_) => 0,
        }
    }
}

fn spawn_collector<F>(metrics: &Arc<SystemMetrics>, name: &str, interval_ms: u32, collect: F)
where
    F: Fn(&SystemMetrics) + Send + 'static,
{
    if interval_ms == 0 {
        return;
    }
    let metrics: Weak<SystemMetrics> = Arc::downgrade(metrics);
    let spawned = std::thread::Builder::new()
        .name(name.into())
        .spawn(move || loop {
            match metrics.upgrade() {
                Some(metrics) => collect(&metrics),
                None => break,
            }
            utils::sleep_for_ms(interval_ms as u64);
        });
    if let Err(err) = spawned {
        logging::error!(
            "[SystemMetrics] Failed to start the collector, name: {}, error: {:?}",
            name,
            err
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::curr_time_millis;

    #[test]
    fn setters() {
        let metrics = SystemMetrics::new();
        assert!((metrics.current_load() - 0.0).abs() < f64::EPSILON);
        metrics.set_system_load(1.5);
        assert!((metrics.current_load() - 1.5).abs() < f64::EPSILON);

        metrics.set_cpu_usage(0.3);
        assert!((metrics.current_cpu_usage() - 0.3).abs() < f32::EPSILON);

        assert_eq!(metrics.current_memory_usage(), 0);
        metrics.set_memory_usage(200);
        assert_eq!(metrics.current_memory_usage(), 200);
    }

    #[test]
    #[ignore]
    #[cfg(not(target_os = "macos"))]
    fn process_stat() {
        std::thread::spawn(|| loop {
            let start = curr_time_millis();
            while curr_time_millis() - start < 50 {
                let _ = 0;
            }
            utils::sleep_for_ms(20);
        });
        let metrics = Arc::new(SystemMetrics::new());
        metrics.start_collectors(&SystemStatConfig {
            cpu_interval_ms: 50,
            memory_interval_ms: 50,
            ..Default::default()
        });
        utils::sleep_for_ms(500);
        assert!(metrics.current_cpu_usage() > 0.0);
        assert!(metrics.current_memory_usage() > 0);
    }
}
