//! Benchmarks for per-message ingest cost: decode, verify, dispatch

use std::net::SocketAddr;
use std::sync::Arc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tally_config::{NotificationListenerConfig, PipelineConfig, PipelinesConfig, UdpListenerConfig};
use tally_pipeline::{PipelineManager, SinkSet};
use tally_protocol::{Datum, Sample, SampleType, Utc, wire};
use tally_sinks::{NullDispatcher, PublisherSink, SinkOptions};
use tally_sources::{NotificationIngest, UdpListener, encode_notification};
use tally_transform::default_registry;

const SECRET: &str = "bench-secret";

fn manager() -> Arc<PipelineManager> {
    let mut sinks = SinkSet::new();
    let sink = PublisherSink::new("null", Arc::new(NullDispatcher::new()), SinkOptions::default());
    sinks.insert(Arc::new(sink)).unwrap();

    let mut pipelines = PipelinesConfig::default();
    pipelines.insert("all", PipelineConfig::new(["*"], ["null"]));
    let manager = PipelineManager::new(sinks, default_registry());
    manager.reload(&pipelines).unwrap();
    Arc::new(manager)
}

fn sample() -> Sample {
    Sample::new("cpu_util", SampleType::Gauge, "%", 0.42, "vm-1", Utc::now())
}

fn bench_udp(c: &mut Criterion) {
    let mut group = c.benchmark_group("udp");
    group.throughput(Throughput::Elements(1));
    let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();

    let unsigned = UdpListener::new(UdpListenerConfig::default(), manager());
    let payload = wire::encode_sample(&sample(), None).unwrap();
    group.bench_function("unsigned", |b| {
        b.iter(|| unsigned.handle_datagram(black_box(&payload), peer))
    });

    let config = UdpListenerConfig {
        secret: Some(SECRET.to_string()),
        ..Default::default()
    };
    let signed = UdpListener::new(config, manager());
    let payload = wire::encode_sample(&sample(), Some(SECRET.as_bytes())).unwrap();
    group.bench_function("signed", |b| {
        b.iter(|| signed.handle_datagram(black_box(&payload), peer))
    });

    group.finish();
}

fn bench_notification(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification");
    group.throughput(Throughput::Elements(1));

    let config = NotificationListenerConfig {
        secret: SECRET.to_string(),
        ..Default::default()
    };
    let ingest = NotificationIngest::new(config, manager()).unwrap();
    let datum: Datum = sample().into();
    let mut next_id = 0u64;

    group.bench_function("sample", |b| {
        b.iter_batched(
            || {
                next_id += 1;
                encode_notification(&datum, &format!("msg-{next_id}"), SECRET.as_bytes()).unwrap()
            },
            |line| black_box(ingest.ingest(&line[..line.len() - 1]).is_ok()),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_udp, bench_notification);
criterion_main!(benches);
