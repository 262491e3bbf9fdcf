use super::new_sentinel;
use sentinel_guard::utils::sleep_for_ms;
use sentinel_guard::{
    base::{BlockType, Snapshot},
    circuitbreaker::{BreakerStrategy, Rule, State, StateChangeListener},
    trace_error, Error,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordListener {
    transitions: Mutex<Vec<(State, State)>>,
}

impl StateChangeListener for RecordListener {
    fn on_transform_to_closed(&self, prev: State, _rule: Arc<Rule>) {
        self.transitions.lock().unwrap().push((prev, State::Closed));
    }

    fn on_transform_to_open(&self, prev: State, _rule: Arc<Rule>, _snapshot: Option<Arc<Snapshot>>) {
        self.transitions.lock().unwrap().push((prev, State::Open));
    }

    fn on_transform_to_half_open(&self, prev: State, _rule: Arc<Rule>) {
        self.transitions.lock().unwrap().push((prev, State::HalfOpen));
    }
}

fn error_count_rule(res: &str, time_window_sec: u32) -> Arc<Rule> {
    Arc::new(Rule {
        resource: res.into(),
        strategy: BreakerStrategy::ErrorCount,
        time_window_sec,
        min_request_amount: 5,
        stat_interval_ms: 10000,
        threshold: 3.0,
        ..Default::default()
    })
}

#[test]
fn trip_and_recover() {
    let sentinel = new_sentinel();
    let res = "breaker_recover_test";
    let listener = Arc::new(RecordListener::default());
    sentinel
        .circuit_breaker()
        .register_state_change_listeners(vec![listener.clone() as Arc<dyn StateChangeListener>]);
    sentinel
        .circuit_breaker()
        .load_rules(vec![error_count_rule(res, 1)]);
    let breaker = &sentinel.circuit_breaker().get_breakers_of_resource(res)[0];

    for i in 0..5 {
        let entry = sentinel.entry_builder(res).build().unwrap();
        trace_error(&entry, Error::msg("biz error"));
        entry.exit();
        let expected = if i < 4 { State::Closed } else { State::Open };
        assert_eq!(breaker.current_state(), expected);
    }
    let err = sentinel.entry_builder(res).build().unwrap_err();
    assert_eq!(err.block_type(), BlockType::CircuitBreaking);

    sleep_for_ms(1100);
    let probe = sentinel.entry_builder(res).build().unwrap();
    assert_eq!(breaker.current_state(), State::HalfOpen);
    // only the probe passes while half open
    assert!(sentinel.entry_builder(res).build().is_err());
    probe.exit();
    assert_eq!(breaker.current_state(), State::Closed);

    assert_eq!(
        *listener.transitions.lock().unwrap(),
        vec![
            (State::Closed, State::Open),
            (State::Open, State::HalfOpen),
            (State::HalfOpen, State::Closed)
        ]
    );
    // counters are reset on closing
    let entry = sentinel.entry_builder(res).build().unwrap();
    trace_error(&entry, Error::msg("biz error"));
    entry.exit();
    assert_eq!(breaker.current_state(), State::Closed);
}

#[test]
fn blocked_probe_rolls_back() {
    let sentinel = new_sentinel();
    let res = "breaker_rollback_test";
    // both breakers trip on the same errors, the second one recovers much later
    sentinel
        .circuit_breaker()
        .load_rules(vec![error_count_rule(res, 1), error_count_rule(res, 60)]);
    let breakers = sentinel.circuit_breaker().get_breakers_of_resource(res);
    assert_eq!(breakers.len(), 2);

    for _ in 0..5 {
        let entry = sentinel.entry_builder(res).build().unwrap();
        trace_error(&entry, Error::msg("biz error"));
        entry.exit();
    }
    assert_eq!(breakers[0].current_state(), State::Open);
    assert_eq!(breakers[1].current_state(), State::Open);

    sleep_for_ms(1100);
    // the first breaker admits a probe, which is then blocked by the second one
    let err = sentinel.entry_builder(res).build().unwrap_err();
    assert_eq!(err.block_type(), BlockType::CircuitBreaking);
    assert_eq!(breakers[0].current_state(), State::Open);
    assert_eq!(breakers[1].current_state(), State::Open);
}

#[test]
fn slow_requests() {
    let sentinel = new_sentinel();
    let res = "breaker_slow_test";
    sentinel.circuit_breaker().load_rules(vec![Arc::new(Rule {
        resource: res.into(),
        strategy: BreakerStrategy::SlowRequestRatio,
        time_window_sec: 10,
        min_request_amount: 2,
        stat_interval_ms: 10000,
        max_allowed_rt_ms: 10,
        threshold: 1.0,
        ..Default::default()
    })]);
    for _ in 0..2 {
        let entry = sentinel.entry_builder(res).build().unwrap();
        sleep_for_ms(30);
        entry.exit();
    }
    let breaker = &sentinel.circuit_breaker().get_breakers_of_resource(res)[0];
    assert_eq!(breaker.current_state(), State::Open);
}
