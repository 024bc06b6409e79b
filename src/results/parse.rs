//! # Log Parsing Module / 日志解析模块
//!
//! Line scanners for the throughput lines each framework prints. Early
//! batches are skipped as warm-up; a log without usable lines yields no
//! throughput rather than an error.
//!
//! 各框架输出吞吐量行的逐行扫描器。前几个批次作为预热被跳过；
//! 没有可用行的日志不产生吞吐量，而不是报错。

use crate::core::config::RunConfig;
use crate::core::models::{DataType, ExtraResult, Framework};
use crate::infra::t;
use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;

/// Throughput extracted from one worker log.
/// 从一个工作日志中提取的吞吐量。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogSummary {
    pub imgs_sec: Option<f64>,
    pub batches_sampled: usize,
}

impl LogSummary {
    fn from_mean(sum: f64, samples: usize) -> Self {
        Self {
            imgs_sec: (samples > 0).then(|| sum / samples as f64),
            batches_sampled: samples,
        }
    }
}

/// Accuracy and eval throughput from a tf_cnn_benchmarks eval log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalSummary {
    pub extras: Vec<ExtraResult>,
    pub exp_per_sec: Option<f64>,
}

static TF_CNN_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^total images/sec:\s*([0-9.eE+-]+)").expect("valid tf_cnn total pattern")
});
static TF_CNN_ACCURACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Accuracy @ 1 = ([0-9.eE+-]+)\s+Accuracy @ 5 = ([0-9.eE+-]+)")
        .expect("valid accuracy pattern")
});
static MXNET_SPEED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Epoch\[\d+\]\s*Batch\s*\[(?:\d+-)?(\d+)\]\s*Speed:\s*([0-9.eE+-]+)\s*samples/sec")
        .expect("valid mxnet pattern")
});
static PYTORCH_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Epoch:\s*\[\d+\]\[\s*(\d+)/\s*\d+\]\s*Time\s+([0-9.eE+-]+)")
        .expect("valid pytorch pattern")
});
static TF_MODELS_EXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Batch \[(\d+)\]:\s*current exp/sec = ([0-9.eE+-]+)")
        .expect("valid tf_models pattern")
});
static KERAS_NUM_BATCHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'num_batches':\s*(\d+)").expect("valid keras batches pattern"));
static KERAS_TIME_TAKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'time_taken':\s*([0-9.eE+-]+)").expect("valid keras time pattern")
});

fn capture_f64(caps: &regex::Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index)?.as_str().parse().ok()
}

fn capture_u64(caps: &regex::Captures<'_>, index: usize) -> Option<u64> {
    caps.get(index)?.as_str().parse().ok()
}

/// tf_cnn_benchmarks prints a single summary line, `total images/sec: x`.
pub fn parse_tf_cnn_log(content: &str) -> LogSummary {
    let imgs_sec = content
        .lines()
        .find_map(|line| TF_CNN_TOTAL.captures(line).and_then(|c| capture_f64(&c, 1)));
    LogSummary {
        imgs_sec,
        batches_sampled: 0,
    }
}

/// Parses `eval_0_stdout.log`. The last accuracy line wins.
///
/// 解析评估日志。以最后一行准确率为准。
pub fn parse_tf_cnn_eval_log(content: &str) -> EvalSummary {
    let mut extras = Vec::new();
    let mut exp_per_sec = None;

    for line in content.lines() {
        if let Some(caps) = TF_CNN_ACCURACY.captures(line) {
            extras.clear();
            if let Some(top_1) = capture_f64(&caps, 1) {
                extras.push(ExtraResult::new(top_1, "top_1", "accuracy"));
            }
            if let Some(top_5) = capture_f64(&caps, 2) {
                extras.push(ExtraResult::new(top_5, "top_5", "accuracy"));
            }
        } else if let Some(caps) = TF_CNN_TOTAL.captures(line) {
            exp_per_sec = capture_f64(&caps, 1).or(exp_per_sec);
        }
    }

    if let Some(exp) = exp_per_sec {
        extras.push(ExtraResult::new(exp, "eval_exp_per_sec", "exp_per_sec"));
    }
    EvalSummary {
        extras,
        exp_per_sec,
    }
}

/// MXNet prints `Epoch[e] Batch [n]  Speed: x samples/sec`.
/// Batches above 10 are averaged; scanning stops after batch 100.
pub fn parse_mxnet_log(content: &str) -> LogSummary {
    let mut sum = 0.0;
    let mut samples = 0;
    for line in content.lines() {
        let Some(caps) = MXNET_SPEED.captures(line) else {
            continue;
        };
        let (Some(batch), Some(speed)) = (capture_u64(&caps, 1), capture_f64(&caps, 2)) else {
            continue;
        };
        if batch > 10 {
            sum += speed;
            samples += 1;
        }
        if batch > 100 {
            break;
        }
    }
    LogSummary::from_mean(sum, samples)
}

/// PyTorch prints the step time, `Epoch: [e][ b/N]  Time t`.
/// Batches above 20 are sampled (stopping after 200) and throughput is
/// `total_batch_size / mean(t)`.
pub fn parse_pytorch_log(content: &str, total_batch_size: u64) -> LogSummary {
    let mut total_time = 0.0;
    let mut samples = 0;
    for line in content.lines() {
        let Some(caps) = PYTORCH_TIME.captures(line) else {
            continue;
        };
        let (Some(batch), Some(time)) = (capture_u64(&caps, 1), capture_f64(&caps, 2)) else {
            continue;
        };
        if batch > 20 {
            total_time += time;
            samples += 1;
        }
        if batch > 200 {
            break;
        }
    }

    let imgs_sec = (samples > 0 && total_time > 0.0)
        .then(|| total_batch_size as f64 / (total_time / samples as f64));
    LogSummary {
        imgs_sec,
        batches_sampled: samples,
    }
}

/// TF official models log `Batch [n]:  current exp/sec = x`; batches above 100 count.
pub fn parse_tf_models_log(content: &str) -> LogSummary {
    let mut sum = 0.0;
    let mut samples = 0;
    for line in content.lines() {
        let Some(caps) = TF_MODELS_EXP.captures(line) else {
            continue;
        };
        if let (Some(batch), Some(exp)) = (capture_u64(&caps, 1), capture_f64(&caps, 2)) {
            if batch > 100 {
                sum += exp;
                samples += 1;
            }
        }
    }
    LogSummary::from_mean(sum, samples)
}

/// Keras models log `BenchmarkMetric: {'num_batches': n, 'time_taken': t}` every
/// 100 batches, so each line covers `num_samples` examples.
pub fn parse_keras_log(content: &str, num_samples: f64) -> LogSummary {
    let mut sum = 0.0;
    let mut samples = 0;
    for line in content.lines() {
        if !line.contains("BenchmarkMetric") {
            continue;
        }
        let num_batches = KERAS_NUM_BATCHES
            .captures(line)
            .and_then(|c| capture_u64(&c, 1));
        let time_taken = KERAS_TIME_TAKEN
            .captures(line)
            .and_then(|c| capture_f64(&c, 1));
        if let (Some(num_batches), Some(time_taken)) = (num_batches, time_taken) {
            if num_batches > 100 && time_taken > 0.0 {
                sum += num_samples / time_taken;
                samples += 1;
            }
        }
    }
    LogSummary::from_mean(sum, samples)
}

/// Parses a worker log with the scanner of `framework`.
///
/// PyTorch and Keras throughput is derived from `batch_size` and `gpus`; without
/// both the log yields no throughput.
///
/// 使用 `framework` 对应的扫描器解析工作日志。PyTorch 与 Keras 的吞吐量由
/// `batch_size` 和 `gpus` 推算，缺少任一项时不产生吞吐量。
pub fn parse_worker_log(framework: Framework, content: &str, config: &RunConfig) -> LogSummary {
    match framework {
        Framework::TfCnnBenchmarks => parse_tf_cnn_log(content),
        Framework::Mxnet => parse_mxnet_log(content),
        Framework::TfModels => parse_tf_models_log(content),
        Framework::Pytorch | Framework::KerasTfModels => {
            let Some(global_batch) = global_batch_size(config) else {
                println!(
                    "{}",
                    t!(
                        "results.batch_size_missing",
                        test_id = config.test_id().unwrap_or_default()
                    )
                    .yellow()
                );
                return LogSummary::default();
            };
            if framework == Framework::Pytorch {
                parse_pytorch_log(content, global_batch)
            } else {
                parse_keras_log(content, (global_batch * 100) as f64)
            }
        }
    }
}

fn global_batch_size(config: &RunConfig) -> Option<u64> {
    Some(config.batch_size()? * config.gpus()?).filter(|&n| n > 0)
}

/// Real or synthetic data, decided by the config as each framework expects.
pub fn data_type(framework: Framework, config: &RunConfig) -> DataType {
    let real = match framework {
        Framework::TfCnnBenchmarks => config.contains("data_dir"),
        Framework::Mxnet => config.has_arg("data-train"),
        Framework::Pytorch => true,
        Framework::TfModels | Framework::KerasTfModels => !config.has_arg("use_synthetic_data"),
    };
    if real { DataType::Real } else { DataType::Synth }
}
