use super::new_sentinel;
use sentinel_guard::utils::sleep_for_ms;
use sentinel_guard::{
    base::{BlockType, CancelToken, TrafficType},
    flow,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn direct_reject() {
    let sentinel = Arc::new(new_sentinel());
    let resource_name = "direct_reject_test";
    sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
        resource: resource_name.into(),
        threshold: 10.0,
        stat_interval_ms: 10000,
        control_strategy: flow::ControlStrategy::Reject,
        ..Default::default()
    })]);
    let passed = Arc::new(AtomicU32::new(0));
    let mut handlers = Vec::new();
    for _ in 0..8 {
        let sentinel = Arc::clone(&sentinel);
        let passed = Arc::clone(&passed);
        handlers.push(std::thread::spawn(move || {
            for _ in 0..10 {
                let entry_builder = sentinel
                    .entry_builder(resource_name)
                    .with_traffic_type(TrafficType::Inbound);
                if let Ok(entry) = entry_builder.build() {
                    passed.fetch_add(1, Ordering::SeqCst);
                    sleep_for_ms(rand::random::<u64>() % 3);
                    entry.exit()
                } else {
                    sleep_for_ms(rand::random::<u64>() % 3);
                }
            }
        }));
    }
    for h in handlers {
        h.join().expect("Couldn't join on the associated thread");
    }
    // the pass count of the window is checked before each entry, a few races may slip through
    let passed = passed.load(Ordering::SeqCst);
    assert!(passed >= 10 && passed <= 18, "passed: {}", passed);
}

#[test]
fn rate_limiter_pacing() {
    let sentinel = new_sentinel();
    sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
        resource: "rate_limiter_test".into(),
        threshold: 10.0,
        control_strategy: flow::ControlStrategy::RateLimiter,
        max_queueing_time_ms: 0,
        ..Default::default()
    })]);
    let entry = sentinel.entry_builder("rate_limiter_test").build().unwrap();
    entry.exit();
    let err = sentinel
        .entry_builder("rate_limiter_test")
        .build()
        .unwrap_err();
    assert_eq!(err.block_type(), BlockType::Flow);
}

#[test]
fn rate_limiter_queueing() {
    let sentinel = new_sentinel();
    sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
        resource: "rate_limiter_queueing_test".into(),
        threshold: 10.0,
        control_strategy: flow::ControlStrategy::RateLimiter,
        max_queueing_time_ms: 1000,
        ..Default::default()
    })]);
    let start = Instant::now();
    for _ in 0..3 {
        sentinel
            .entry_builder("rate_limiter_queueing_test")
            .build()
            .unwrap()
            .exit();
    }
    // the 2nd and the 3rd requests are paced by 100 ms each
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[test]
fn cancelled_wait_rejects() {
    let sentinel = new_sentinel();
    sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
        resource: "rate_limiter_cancel_test".into(),
        threshold: 1.0,
        control_strategy: flow::ControlStrategy::RateLimiter,
        max_queueing_time_ms: 5000,
        ..Default::default()
    })]);
    sentinel
        .entry_builder("rate_limiter_cancel_test")
        .build()
        .unwrap()
        .exit();

    let token = CancelToken::new();
    let canceller = token.clone();
    let handle = std::thread::spawn(move || {
        sleep_for_ms(50);
        canceller.cancel();
    });
    let start = Instant::now();
    let err = sentinel
        .entry_builder("rate_limiter_cancel_test")
        .with_cancel_token(token)
        .build()
        .unwrap_err();
    handle.join().unwrap();
    assert_eq!(err.block_type(), BlockType::Flow);
    assert_eq!(err.block_msg(), flow::BLOCK_MSG_WAIT_CANCELLED);
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[test]
fn idempotent_reload() {
    let sentinel = new_sentinel();
    let rules = vec![Arc::new(flow::Rule {
        resource: "reload_test".into(),
        threshold: 10.0,
        ..Default::default()
    })];
    assert!(sentinel.flow().load_rules(rules.clone()));
    assert!(!sentinel.flow().load_rules(rules));
}
