//! Wall clock in milliseconds, optionally served by a cached ticker.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use time::OffsetDateTime;

const NANOS_PER_MILLI: i128 = 1_000_000;

static CACHED_NOW_MS: AtomicU64 = AtomicU64::new(0);
static TICKER_ONCE: Once = Once::new();

#[inline]
pub fn sleep_for_ms(ms: u64) {
    std::thread::sleep(std::time::Duration::from_millis(ms));
}

#[inline]
pub fn curr_time_nanos() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos()
}

#[inline]
fn system_time_millis() -> u64 {
    (curr_time_nanos() / NANOS_PER_MILLI) as u64
}

/// The cached timestamp once the ticker runs, the system clock otherwise.
pub fn curr_time_millis() -> u64 {
    match CACHED_NOW_MS.load(Ordering::Relaxed) {
        0 => system_time_millis(),
        cached => cached,
    }
}

/// Starts a thread refreshing the cached timestamp every millisecond,
/// which spares the clock reads on hot paths. It is process-wide and started at most once.
pub fn start_time_ticker() {
    TICKER_ONCE.call_once(|| {
        CACHED_NOW_MS.store(system_time_millis(), Ordering::Relaxed);
        let spawned = std::thread::Builder::new()
            .name("sentinel-time-ticker".into())
            .spawn(|| loop {
                sleep_for_ms(1);
                CACHED_NOW_MS.store(system_time_millis(), Ordering::Relaxed);
            });
        if let Err(err) = spawned {
            // fall back to the system clock
            CACHED_NOW_MS.store(0, Ordering::Relaxed);
            crate::logging::error!("[TimeTicker] Failed to spawn the ticker, error: {:?}", err);
        }
    });
}
