use super::{Checker, Rule};
use crate::{
    core::base::{BlockType, TokenResult},
    utils,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub const BLOCK_MSG_QUEUEING: &str = "flow rate limiter check blocked, estimated queueing time exceeds max queueing time";

/// RateLimiterChecker paces the requests as a leaky bucket,
/// one unit passes every `1000 / threshold` ms.
/// Requests arriving earlier wait in queue, up to `max_queueing_time_ms`.
///
/// The reservation is optimistic, under heavy contention a few requests may be
/// reserved and rolled back concurrently, the error is bounded and self-correcting.
#[derive(Debug)]
pub struct RateLimiterChecker {
    rule: Arc<Rule>,
    max_queueing_time_ms: i64,
    // the timestamp (ms) granted to the latest passed request, -1 before the first one
    latest_passed_time: AtomicI64,
}

impl RateLimiterChecker {
    pub fn new(rule: Arc<Rule>) -> Self {
        RateLimiterChecker {
            max_queueing_time_ms: rule.max_queueing_time_ms as i64,
            rule,
            latest_passed_time: AtomicI64::new(-1),
        }
    }

    fn blocked(&self, estimated_queueing_ms: i64) -> TokenResult {
        TokenResult::new_blocked_with_cause(
            BlockType::Flow,
            BLOCK_MSG_QUEUEING.into(),
            self.rule.clone(),
            Arc::new(estimated_queueing_ms),
        )
    }

    pub(crate) fn do_check_with_time(&self, now: i64, batch_count: u32, threshold: f64) -> TokenResult {
        if batch_count == 0 {
            return TokenResult::new_pass();
        }
        if threshold <= 0.0 {
            return TokenResult::new_blocked_with_cause(
                BlockType::Flow,
                BLOCK_MSG_QUEUEING.into(),
                self.rule.clone(),
                Arc::new(threshold),
            );
        }
        let cost_time = (batch_count as f64 / threshold * 1000.0).round() as i64;

        let expected_time = self.latest_passed_time.load(Ordering::SeqCst) + cost_time;
        if expected_time <= now {
            self.latest_passed_time.store(now, Ordering::SeqCst);
            return TokenResult::new_pass();
        }
        // fast path for the obvious rejections, without touching the reservation
        if expected_time - now > self.max_queueing_time_ms {
            return self.blocked(expected_time - now);
        }
        let reserved_time = self
            .latest_passed_time
            .fetch_add(cost_time, Ordering::SeqCst)
            + cost_time;
        let wait_time = reserved_time - now;
        if wait_time > self.max_queueing_time_ms {
            self.latest_passed_time
                .fetch_sub(cost_time, Ordering::SeqCst);
            return self.blocked(wait_time);
        }
        if wait_time > 0 {
            TokenResult::new_should_wait(wait_time as u64)
        } else {
            TokenResult::new_pass()
        }
    }
}

impl Checker for RateLimiterChecker {
    fn do_check(&self, batch_count: u32, threshold: f64) -> TokenResult {
        self.do_check_with_time(utils::curr_time_millis() as i64, batch_count, threshold)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_checker(max_queueing_time_ms: u32) -> RateLimiterChecker {
        RateLimiterChecker::new(Arc::new(Rule {
            resource: "abc".into(),
            control_strategy: crate::flow::ControlStrategy::RateLimiter,
            max_queueing_time_ms,
            ..Default::default()
        }))
    }

    #[test]
    fn no_queueing() {
        let checker = new_checker(0);
        let now = 1_000_000;
        assert!(checker.do_check_with_time(now, 1, 10.0).is_pass());
        let res = checker.do_check_with_time(now, 1, 10.0);
        assert!(res.is_blocked());
        assert_eq!(res.block_err().unwrap().block_type(), BlockType::Flow);
        // the rejected request reserved nothing
        assert!(checker.do_check_with_time(now + 100, 1, 10.0).is_pass());
    }

    #[test]
    fn queueing() {
        let checker = new_checker(250);
        let now = 1_000_000;
        assert!(checker.do_check_with_time(now, 1, 10.0).is_pass());
        assert_eq!(checker.do_check_with_time(now, 1, 10.0), TokenResult::Wait(100));
        assert_eq!(checker.do_check_with_time(now, 1, 10.0), TokenResult::Wait(200));
        // 300 ms exceeds the max queueing time and is rolled back
        assert!(checker.do_check_with_time(now, 1, 10.0).is_blocked());
        assert_eq!(checker.do_check_with_time(now + 50, 1, 10.0), TokenResult::Wait(250));
    }

    #[test]
    fn batch_cost() {
        let checker = new_checker(1000);
        let now = 1_000_000;
        assert!(checker.do_check_with_time(now, 1, 4.0).is_pass());
        // 3 units cost round(3 / 4 * 1000) = 750 ms
        assert_eq!(checker.do_check_with_time(now, 3, 4.0), TokenResult::Wait(750));
    }

    #[test]
    fn boundaries() {
        let checker = new_checker(0);
        assert!(checker.do_check_with_time(1000, 0, 10.0).is_pass());
        assert!(checker.do_check_with_time(1000, 0, 0.0).is_pass());
        assert!(checker.do_check_with_time(1000, 1, 0.0).is_blocked());
        assert!(checker.do_check_with_time(1000, 1, -1.0).is_blocked());
    }

    #[test]
    fn real_clock() {
        let checker = new_checker(0);
        assert!(checker.do_check(1, 10.0).is_pass());
        assert!(checker.do_check(1, 10.0).is_blocked());
        utils::sleep_for_ms(110);
        assert!(checker.do_check(1, 10.0).is_pass());
    }
}
