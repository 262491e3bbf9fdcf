use super::*;

/// Trips on the error count or on the error ratio of the window,
/// depending on the strategy of the bound rule.
#[derive(Debug)]
pub struct ExceptionBreaker {
    breaker: BreakerBase,
    min_request_amount: u64,
    threshold: f64,
    by_ratio: bool,
    // stat needs to be shared, so we take Arc
    stat: Arc<CounterLeapArray>,
}

impl ExceptionBreaker {
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
        let min_request_amount = rule.min_request_amount;
        let threshold = rule.threshold;
        let by_ratio = rule.strategy == BreakerStrategy::ErrorRatio;
        Self {
            breaker: BreakerBase::new(rule, listeners),
            min_request_amount,
            threshold,
            by_ratio,
            stat,
        }
    }
}

impl CircuitBreakerTrait for ExceptionBreaker {
    fn breaker(&self) -> &BreakerBase {
        &self.breaker
    }

    fn stat(&self) -> &Arc<CounterLeapArray> {
        &self.stat
    }

    fn on_request_complete(&self, _rt: u64, err: &Option<Error>) {
        if let Err(e) = self.stat.add_count(err.is_some()) {
            logging::error!(
                "[ExceptionBreaker::on_request_complete] Fail to get current counter, rule: {:?}, error: {:?}",
                self.breaker.bound_rule(),
                e
            );
            return;
        }

        match self.current_state() {
            State::HalfOpen => {
                if err.is_none() {
                    if self.breaker.from_half_open_to_closed() {
                        self.reset_metric();
                    }
                } else {
                    self.breaker.from_half_open_to_open(Arc::new(1.0));
                }
            }
            State::Closed => {
                let (error_count, total_count) = self.stat.sums();
                if total_count < self.min_request_amount {
                    return;
                }
                if self.by_ratio {
                    let ratio = error_count as f64 / total_count as f64;
                    if ratio > self.threshold {
                        self.breaker.from_closed_to_open(Arc::new(ratio));
                    }
                } else if error_count as f64 > self.threshold {
                    self.breaker.from_closed_to_open(Arc::new(error_count));
                }
            }
            State::Open => {}
        }
    }
}
