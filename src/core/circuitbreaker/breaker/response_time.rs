use super::*;

/// The slow ratio threshold at which "all requests are slow" trips the breaker.
pub const SLOW_REQUEST_RATIO_MAX_VALUE: f64 = 1.0;

/// Trips on the ratio of requests slower than `max_allowed_rt_ms`.
#[derive(Debug)]
pub struct SlowRtBreaker {
    breaker: BreakerBase,
    max_allowed_rt: u64,
    max_slow_request_ratio: f64,
    min_request_amount: u64,
    stat: Arc<CounterLeapArray>,
}

impl SlowRtBreaker {
    pub fn new(rule: Arc<Rule>, listeners: Arc<StateChangeListeners>) -> Result<Self> {
        let interval = rule.stat_interval_ms;
        let bucket_count = rule.get_rule_stat_sliding_window_bucket_count();
        let stat = CounterLeapArray::new(bucket_count, interval)?;
        Ok(Self::new_with_stat(rule, Arc::new(stat), listeners))
    }

    pub fn new_with_stat(
        rule: Arc<Rule>,
        stat: Arc<CounterLeapArray>,
        listeners: Arc<StateChangeListeners>,
    ) -> Self {
        let max_allowed_rt = rule.max_allowed_rt_ms;
        let max_slow_request_ratio = rule.threshold;
        let min_request_amount = rule.min_request_amount;
        Self {
            breaker: BreakerBase::new(rule, listeners),
            max_allowed_rt,
            max_slow_request_ratio,
            min_request_amount,
            stat,
        }
    }
}

impl CircuitBreakerTrait for SlowRtBreaker {
    fn breaker(&self) -> &BreakerBase {
        &self.breaker
    }

    fn stat(&self) -> &Arc<CounterLeapArray> {
        &self.stat
    }

    fn on_request_complete(&self, rt: u64, _err: &Option<Error>) {
        let is_slow = rt > self.max_allowed_rt;
        if let Err(e) = self.stat.add_count(is_slow) {
            logging::error!(
                "[SlowRtBreaker::on_request_complete] Fail to get current counter, rule: {:?}, error: {:?}",
                self.breaker.bound_rule(),
                e
            );
            return;
        }

        match self.current_state() {
            // the probe alone decides
            State::HalfOpen => {
                if is_slow {
                    self.breaker.from_half_open_to_open(Arc::new(1.0));
                } else if self.breaker.from_half_open_to_closed() {
                    self.reset_metric();
                }
            }
            State::Closed => {
                let (slow_count, total_count) = self.stat.sums();
                if total_count < self.min_request_amount {
                    return;
                }
                let ratio = slow_count as f64 / total_count as f64;
                let exceeded = ratio > self.max_slow_request_ratio
                    || (ratio == self.max_slow_request_ratio
                        && self.max_slow_request_ratio == SLOW_REQUEST_RATIO_MAX_VALUE);
                if exceeded {
                    self.breaker.from_closed_to_open(Arc::new(ratio));
                }
            }
            State::Open => {}
        }
    }
}
