use super::MetricTrait;
use crate::base::TimePredicate;
use crate::utils::curr_time_millis;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One bucket of a `LeapArray`, covering `[start_stamp, start_stamp + bucket_len_ms)`.
#[derive(Debug, Default)]
pub struct BucketWrap<T: MetricTrait> {
    start_stamp: AtomicU64,
    value: T,
    // guards the reset path only, writers of `value` never take it
    reset_lock: Mutex<()>,
}

impl<T: MetricTrait> BucketWrap<T> {
    pub fn new(start_stamp: u64) -> Self {
        BucketWrap {
            start_stamp: AtomicU64::new(start_stamp),
            value: T::default(),
            reset_lock: Mutex::new(()),
        }
    }

    pub fn start_stamp(&self) -> u64 {
        self.start_stamp.load(Ordering::SeqCst)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// The value is cleared before the new start is published,
    /// so a reader that observes the new start never sees stale counts.
    pub fn reset(&self, start_stamp: u64) {
        self.value.reset();
        self.start_stamp.store(start_stamp, Ordering::SeqCst);
    }

    pub fn is_time_in_bucket(&self, now: u64, bucket_len_ms: u32) -> bool {
        let start = self.start_stamp();
        start <= now && now < start + (bucket_len_ms as u64)
    }

    /// A bucket is valid at `now` if its start lies in `[now - interval, now]`.
    pub fn is_deprecated(&self, now: u64, interval: u64) -> bool {
        let start = self.start_stamp();
        start > now || now - start > interval
    }
}

/// A ring of `sample_count` buckets spanning `interval_ms`.
///
/// A timestamp maps to the bucket `(now / bucket_len_ms) % sample_count`. When that bucket
/// still holds an older span, it is cleared and reused in place, so the ring never allocates
/// after construction. Counters are updated through the atomics of `T` without locking.
#[derive(Debug)]
pub struct LeapArray<T: MetricTrait> {
    bucket_len_ms: u32,
    sample_count: u32,
    interval_ms: u32,
    pub(crate) array: Vec<Arc<BucketWrap<T>>>,
}

impl<T: MetricTrait> LeapArray<T> {
    pub fn new(sample_count: u32, interval_ms: u32) -> Result<Self> {
        if sample_count == 0 || interval_ms == 0 || interval_ms % sample_count != 0 {
            return Err(Error::msg(format!(
                "invalid leap array: {}ms can not be split into {} buckets",
                interval_ms, sample_count
            )));
        }
        let array = (0..sample_count)
            .map(|_| Arc::new(BucketWrap::new(0)))
            .collect();
        Ok(LeapArray {
            bucket_len_ms: interval_ms / sample_count,
            sample_count,
            interval_ms,
            array,
        })
    }

    pub fn bucket_len_ms(&self) -> u32 {
        self.bucket_len_ms
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn current_bucket(&self) -> Result<Arc<BucketWrap<T>>> {
        self.get_bucket_of_time(curr_time_millis())
    }

    pub fn get_bucket_of_time(&self, now: u64) -> Result<Arc<BucketWrap<T>>> {
        let idx = self.time2idx(now) as usize;
        let target_start = self.calculate_start_stamp(now);
        let bucket = &self.array[idx];
        loop {
            let start = bucket.start_stamp();
            if start == target_start {
                return Ok(Arc::clone(bucket));
            }
            // Older spans are reused. A bucket ahead of `now` is only reused when it is
            // more than a whole cycle ahead, i.e., the clock went backward that far.
            let stale = target_start > start
                || start - target_start > self.interval_ms as u64;
            if !stale {
                return Err(Error::msg(format!(
                    "no bucket for timestamp {}, the bucket already holds {}",
                    now, start
                )));
            }
            // a single thread clears the bucket, the others spin until the new start shows up
            if let Ok(_guard) = bucket.reset_lock.try_lock() {
                // another thread may have finished the reset before we got the lock
                if bucket.start_stamp() == start {
                    bucket.reset(target_start);
                }
                continue;
            }
            std::thread::yield_now();
        }
    }

    /// start of the span holding `now`
    pub(crate) fn calculate_start_stamp(&self, now: u64) -> u64 {
        now - now % (self.bucket_len_ms as u64)
    }

    pub(crate) fn time2idx(&self, now: u64) -> u64 {
        let idx = now / (self.bucket_len_ms as u64);
        idx % (self.sample_count as u64)
    }

    pub fn get_current_values(&self) -> Vec<Arc<BucketWrap<T>>> {
        self.get_valid_values(curr_time_millis())
    }

    /// The buckets whose span started within the last interval before `now`.
    pub fn get_valid_values(&self, now: u64) -> Vec<Arc<BucketWrap<T>>> {
        self.get_valid_values_conditional(now, &|_| true)
    }

    pub fn get_valid_values_conditional(
        &self,
        now: u64,
        condition: &TimePredicate,
    ) -> Vec<Arc<BucketWrap<T>>> {
        self.array
            .iter()
            .filter(|bucket| {
                !bucket.is_deprecated(now, self.interval_ms as u64)
                    && condition(bucket.start_stamp())
            })
            .cloned()
            .collect()
    }

    /// Clears all the buckets, e.g., when a circuit breaker is closed again.
    pub fn reset_all(&self) {
        for bucket in &self.array {
            let _guard = bucket.reset_lock.lock().unwrap();
            bucket.reset(0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    // 20 buckets of 500ms
    const SAMPLE_COUNT: u32 = 20;
    const INTERVAL_MS: u32 = 10_000;

    impl MetricTrait for AtomicU64 {
        fn reset(&self) {
            self.store(0, Ordering::SeqCst);
        }
    }
    type LeapArrayAtomicU64 = LeapArray<AtomicU64>;

    fn sum_of(arr: &LeapArrayAtomicU64, now: u64) -> u64 {
        arr.get_valid_values(now)
            .iter()
            .map(|b| b.value().load(Ordering::SeqCst))
            .sum()
    }

    #[test]
    fn invalid_params() {
        assert!(LeapArrayAtomicU64::new(0, 1000).is_err());
        assert!(LeapArrayAtomicU64::new(3, 1000).is_err());
        assert!(LeapArrayAtomicU64::new(2, 0).is_err());
    }

    #[test]
    fn time_idx() {
        let arr = LeapArrayAtomicU64::new(SAMPLE_COUNT, INTERVAL_MS).unwrap();
        assert_eq!(arr.time2idx(1576296044907), 9);
        assert_eq!(arr.calculate_start_stamp(1576296044907), 1576296044500);
    }

    #[test]
    fn start_time() {
        let arr = LeapArrayAtomicU64::new(SAMPLE_COUNT, INTERVAL_MS).unwrap();
        let now = 1596199310000;
        let bucket = arr.get_bucket_of_time(now + 801).unwrap();
        assert_eq!(bucket.start_stamp(), now + 500);
        assert!(Arc::ptr_eq(&bucket, arr.array.get(1).unwrap()));
    }

    #[test]
    fn deprecated() {
        let now = 1576296044907;
        let bucket = BucketWrap::<AtomicU64>::new(1576296004907);
        assert!(bucket.is_deprecated(now, INTERVAL_MS as u64));
        let bucket = BucketWrap::<AtomicU64>::new(now - 100);
        assert!(!bucket.is_deprecated(now, INTERVAL_MS as u64));
        let bucket = BucketWrap::<AtomicU64>::new(now - INTERVAL_MS as u64);
        assert!(!bucket.is_deprecated(now, INTERVAL_MS as u64));
        assert!(bucket.is_deprecated(now + 1, INTERVAL_MS as u64));
    }

    #[test]
    fn window_excludes_expired_bucket() {
        let arr = LeapArrayAtomicU64::new(2, 1000).unwrap();
        arr.get_bucket_of_time(0)
            .unwrap()
            .value()
            .fetch_add(3, Ordering::SeqCst);
        arr.get_bucket_of_time(600)
            .unwrap()
            .value()
            .fetch_add(5, Ordering::SeqCst);
        assert_eq!(sum_of(&arr, 900), 8);
        // a bucket starting exactly one interval ago is still counted
        assert_eq!(sum_of(&arr, 1000), 8);
        // the bucket of t=0 has fully elapsed
        assert_eq!(sum_of(&arr, 1100), 5);
    }

    #[test]
    fn stale_bucket_reset_in_place() {
        let arr = LeapArrayAtomicU64::new(2, 1000).unwrap();
        let first = arr.get_bucket_of_time(100).unwrap();
        first.value().fetch_add(7, Ordering::SeqCst);
        let again = arr.get_bucket_of_time(1100).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.start_stamp(), 1000);
        assert_eq!(again.value().load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clock_backward() {
        let arr = LeapArrayAtomicU64::new(2, 1000).unwrap();
        let now = 1596199310000;
        arr.get_bucket_of_time(now + 1000)
            .unwrap()
            .value()
            .fetch_add(1, Ordering::SeqCst);
        assert!(arr.get_bucket_of_time(now + 500).is_ok());
        // the bucket of `now` holds a span less than a cycle ahead
        assert!(arr.get_bucket_of_time(now).is_err());
        // a whole cycle behind, treated as a fresh bucket
        let bucket = arr.get_bucket_of_time(now - 1000).unwrap();
        assert_eq!(bucket.start_stamp(), now - 1000);
        assert_eq!(bucket.value().load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reset_all() {
        let arr = LeapArrayAtomicU64::new(2, 1000).unwrap();
        let now = curr_time_millis();
        arr.get_bucket_of_time(now)
            .unwrap()
            .value()
            .fetch_add(1, Ordering::SeqCst);
        arr.reset_all();
        assert_eq!(sum_of(&arr, now), 0);
    }

    #[test]
    fn concurrent_reset() {
        let arr = Arc::new(LeapArrayAtomicU64::new(SAMPLE_COUNT, INTERVAL_MS).unwrap());
        let now = 1976296040000u64;
        arr.get_bucket_of_time(now)
            .unwrap()
            .value()
            .fetch_add(100, Ordering::SeqCst);
        let later = now + INTERVAL_MS as u64;
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let arr = Arc::clone(&arr);
                thread::spawn(move || {
                    arr.get_bucket_of_time(later)
                        .unwrap()
                        .value()
                        .fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sum_of(&arr, later), 64);
    }
}
