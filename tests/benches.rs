#[macro_use]
extern crate criterion;
use criterion::Criterion;

mod window {
    use super::*;
    use sentinel_guard::base::{MetricEvent, ReadStat, WriteStat};
    use sentinel_guard::stat::{BucketLeapArray, SlidingWindowMetric};
    use std::sync::Arc;

    pub fn bench_add_count(c: &mut Criterion) {
        let array = BucketLeapArray::new(20, 10000).unwrap();
        c.bench_function("leap array add_count", |b| {
            b.iter(|| array.add_count(MetricEvent::Pass, 1))
        });
    }

    pub fn bench_sum(c: &mut Criterion) {
        let array = Arc::new(BucketLeapArray::new(20, 10000).unwrap());
        let metric = SlidingWindowMetric::new(2, 1000, Arc::clone(&array)).unwrap();
        array.add_count(MetricEvent::Pass, 1);
        c.bench_function("sliding window sum", |b| {
            b.iter(|| metric.sum(MetricEvent::Pass))
        });
    }
}

mod entry {
    use super::*;
    use sentinel_guard::{base::TrafficType, flow, Sentinel};
    use std::sync::Arc;

    pub fn bench_entry(c: &mut Criterion) {
        let sentinel = Sentinel::new().unwrap();
        sentinel.flow().load_rules(vec![Arc::new(flow::Rule {
            resource: "bench".into(),
            threshold: 1e9,
            ..Default::default()
        })]);
        c.bench_function("entry and exit", |b| {
            b.iter(|| {
                if let Ok(entry) = sentinel
                    .entry_builder("bench")
                    .with_traffic_type(TrafficType::Inbound)
                    .build()
                {
                    entry.exit();
                }
            })
        });
    }
}

criterion_group!(
    benches,
    window::bench_add_count,
    window::bench_sum,
    entry::bench_entry
);
criterion_main!(benches);
