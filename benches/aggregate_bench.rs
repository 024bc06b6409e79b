use bench_harness::config::RunConfig;
use bench_harness::models::{DataType, ExtraResult, RunResult};
use bench_harness::results::aggregate_by_test_id;
use bench_harness::results::parse::{parse_mxnet_log, parse_tf_cnn_log};
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;
use std::path::PathBuf;

fn mxnet_log(batches: u64) -> String {
    let mut log = String::new();
    for batch in (10..=batches).step_by(10) {
        let _ = writeln!(
            log,
            "INFO:root:Epoch[0] Batch [{batch}]\tSpeed: {}.25 samples/sec\taccuracy=0.001",
            200 + batch % 7
        );
    }
    log
}

fn tf_cnn_log(steps: u64) -> String {
    let mut log = String::from("Done warm up\nStep\tImg/sec\ttotal_loss\n");
    for step in (10..=steps).step_by(10) {
        let _ = writeln!(log, "{step}\timages/sec: 221.4 +/- 0.3 (jitter = 1.2)\t7.860");
    }
    log.push_str("----------------------------------------------------------------\n");
    log.push_str("total images/sec: 221.40\n");
    log
}

fn synthetic_results(groups: usize, copies: usize) -> Vec<RunResult> {
    (0..groups * copies)
        .map(|i| RunResult {
            test_id: format!("model_{}.gpu_8.64", i % groups),
            imgs_sec: Some(1000.0 + (i % 13) as f64),
            batches_sampled: 90,
            gpu: 8,
            data_type: DataType::Synth,
            result_dir: PathBuf::from(format!("/tmp/results/{i}")),
            config: RunConfig::default(),
            extra_results: vec![ExtraResult::new(0.75, "top_1", "accuracy")],
        })
        .collect()
}

fn bench_parse_logs(c: &mut Criterion) {
    let mxnet = mxnet_log(1000);
    let tf_cnn = tf_cnn_log(1000);

    c.bench_function("parse_mxnet_log", |b| {
        b.iter(|| parse_mxnet_log(black_box(&mxnet)))
    });
    c.bench_function("parse_tf_cnn_log", |b| {
        b.iter(|| parse_tf_cnn_log(black_box(&tf_cnn)))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let results = synthetic_results(50, 20);

    c.bench_function("aggregate_by_test_id", |b| {
        b.iter(|| aggregate_by_test_id(black_box(&results)))
    });
}

criterion_group!(benches, bench_parse_logs, bench_aggregate);
criterion_main!(benches);
