//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the harness:
//! supported frameworks, per-run parse results, aggregated statistics and
//! the outcome of executing a single benchmark copy.
//!
//! 此模块定义了整个工具中使用的核心数据结构：
//! 支持的框架、单次运行的解析结果、汇总统计以及单个基准副本的执行结果。

use crate::core::config::RunConfig;
use crate::infra::t;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// The benchmark frameworks the harness knows how to drive and parse.
/// 工具能够驱动和解析的基准测试框架。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    /// TensorFlow `tf_cnn_benchmarks.py` / TensorFlow `tf_cnn_benchmarks.py` 脚本
    #[default]
    TfCnnBenchmarks,
    /// TensorFlow official models driven through an `args` map.
    /// 通过 `args` 映射驱动的 TensorFlow 官方模型。
    TfModels,
    /// Keras models from the TensorFlow model garden.
    /// TensorFlow 模型库中的 Keras 模型。
    KerasTfModels,
    Mxnet,
    Pytorch,
}

impl Framework {
    /// The identifier used in suite files and stored in `config.yaml`.
    pub fn key(&self) -> &'static str {
        match self {
            Framework::TfCnnBenchmarks => "tf_cnn_benchmarks",
            Framework::TfModels => "tf_models",
            Framework::KerasTfModels => "keras_tf_models",
            Framework::Mxnet => "mxnet",
            Framework::Pytorch => "pytorch",
        }
    }

    /// The framework name reported in upload rows.
    pub fn name(&self) -> &'static str {
        match self {
            Framework::TfCnnBenchmarks | Framework::TfModels | Framework::KerasTfModels => {
                "tensorflow"
            }
            Framework::Mxnet => "mxnet",
            Framework::Pytorch => "pytorch",
        }
    }

    /// Default `test_harness` value for upload rows.
    pub fn test_harness(&self) -> &'static str {
        match self {
            Framework::TfCnnBenchmarks => "tf_cnn_benchmark",
            Framework::TfModels => "tf_models",
            Framework::KerasTfModels => "keras_tf_models",
            Framework::Mxnet => "mxnet",
            Framework::Pytorch => "pytorch",
        }
    }

    /// Frameworks whose command line is built from the sorted `args` map.
    /// 命令行由排序后的 `args` 映射构建的框架。
    pub fn uses_args_map(&self) -> bool {
        !matches!(self, Framework::TfCnnBenchmarks)
    }

    pub fn all() -> [Framework; 5] {
        [
            Framework::TfCnnBenchmarks,
            Framework::TfModels,
            Framework::KerasTfModels,
            Framework::Mxnet,
            Framework::Pytorch,
        ]
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Framework {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tf_cnn_benchmarks" | "tf_cnn_benchmark" | "tf_cnn" => Ok(Framework::TfCnnBenchmarks),
            "tf_models" => Ok(Framework::TfModels),
            "keras_tf_models" | "keras" => Ok(Framework::KerasTfModels),
            "mxnet" => Ok(Framework::Mxnet),
            "pytorch" | "torch" => Ok(Framework::Pytorch),
            other => bail!(t!("config.unknown_framework", framework = other).to_string()),
        }
    }
}

/// Whether a run read real data from disk or generated synthetic input.
/// 运行读取真实数据还是使用合成输入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Real,
    Synth,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Real => f.write_str("real"),
            DataType::Synth => f.write_str("synth"),
        }
    }
}

fn default_result_type() -> String {
    "total_time".to_string()
}

fn default_result_units() -> String {
    "ms".to_string()
}

/// An additional measurement reported next to throughput (accuracy, timings...).
/// 吞吐量之外的附加测量值（准确率、耗时等）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraResult {
    pub result: f64,
    #[serde(default = "default_result_type")]
    pub result_type: String,
    #[serde(default = "default_result_units")]
    pub result_units: String,
}

impl ExtraResult {
    pub fn new(result: f64, result_type: &str, result_units: &str) -> Self {
        Self {
            result,
            result_type: result_type.to_string(),
            result_units: result_units.to_string(),
        }
    }
}

/// The parsed outcome of one result directory (one benchmark copy).
///
/// 一个结果目录（一次基准副本）的解析结果。
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub test_id: String,
    /// Throughput for this copy, `None` when the log yielded no samples.
    /// 该副本的吞吐量；日志中没有样本时为 `None`。
    pub imgs_sec: Option<f64>,
    pub batches_sampled: usize,
    pub gpu: u64,
    pub data_type: DataType,
    pub result_dir: PathBuf,
    pub config: RunConfig,
    pub extra_results: Vec<ExtraResult>,
}

/// Summary statistics over a set of samples. Std is the population std.
/// 一组样本的汇总统计。标准差为总体标准差。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregated statistics for one extra result type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraAggregate {
    pub result_type: String,
    pub result_units: String,
    pub samples: usize,
    pub stats: Stats,
}

/// All copies of one `test_id` folded into a single record.
///
/// 同一 `test_id` 的所有副本合并为一条记录。
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub test_id: String,
    /// Number of copies that contributed a throughput sample.
    /// 提供了吞吐量样本的副本数。
    pub samples: usize,
    pub stats: Stats,
    pub gpu: u64,
    pub data_type: DataType,
    pub batches_sampled: usize,
    /// The configuration of the first record in the group.
    /// 组内第一条记录的配置。
    pub config: RunConfig,
    pub extras: Vec<ExtraAggregate>,
}

impl AggregateResult {
    /// A zero-valued aggregate for a group that produced no results.
    /// 为没有产生任何结果的组生成零值汇总。
    pub fn empty(test_id: &str, config: RunConfig) -> Self {
        let gpu = config.gpus().unwrap_or(0);
        Self {
            test_id: test_id.to_string(),
            samples: 0,
            stats: Stats::default(),
            gpu,
            data_type: DataType::Synth,
            batches_sampled: 0,
            config,
            extras: Vec::new(),
        }
    }

    pub fn has_samples(&self) -> bool {
        self.samples > 0
    }
}

/// Enumerates the possible reasons for a copy failure.
/// 枚举副本失败的可能原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// The process exited with a non-zero status before the stop marker appeared.
    /// 进程在停止标记出现之前以非零状态退出。
    NonZeroExit,
    /// The copy exceeded `timeout_secs`.
    /// 副本超出了 `timeout_secs`。
    Timeout,
    /// The process could not be started or its output could not be captured.
    /// 无法启动进程或无法捕获其输出。
    Spawn,
    /// The run was interrupted (Ctrl-C).
    /// 运行被中断（Ctrl-C）。
    Cancelled,
    /// An OOM search probe ran out of memory, which the search expects.
    /// OOM 搜索的探测耗尽了内存，这是搜索预期的结果。
    OutOfMemory,
}

/// Represents the final result of executing a single benchmark copy.
///
/// 表示执行单个基准副本的最终结果。
#[derive(Debug, Clone)]
pub enum CopyOutcome {
    /// The process finished, either on its own or because the stop marker was reached.
    /// 进程已结束，可能是自行退出，也可能是因为到达了停止标记。
    Completed {
        test_id: String,
        copy: u64,
        result_dir: PathBuf,
        duration: Duration,
        stopped_at_marker: bool,
    },
    Failed {
        test_id: String,
        copy: u64,
        result_dir: Option<PathBuf>,
        /// Short description of what went wrong / 出错内容的简短描述
        output: String,
        reason: FailureReason,
        exit_code: Option<i32>,
        duration: Duration,
    },
    /// The copy never ran (interrupted run or already tracked).
    /// 副本未运行（运行被中断或已被追踪记录）。
    Skipped { test_id: String, copy: u64 },
}

impl CopyOutcome {
    pub fn test_id(&self) -> &str {
        match self {
            CopyOutcome::Completed { test_id, .. }
            | CopyOutcome::Failed { test_id, .. }
            | CopyOutcome::Skipped { test_id, .. } => test_id,
        }
    }

    pub fn copy(&self) -> u64 {
        match self {
            CopyOutcome::Completed { copy, .. }
            | CopyOutcome::Failed { copy, .. }
            | CopyOutcome::Skipped { copy, .. } => *copy,
        }
    }

    pub fn result_dir(&self) -> Option<&PathBuf> {
        match self {
            CopyOutcome::Completed { result_dir, .. } => Some(result_dir),
            CopyOutcome::Failed { result_dir, .. } => result_dir.as_ref(),
            CopyOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CopyOutcome::Failed { .. })
    }

    /// A failure that should fail the run: not an interruption and not an OOM probe.
    pub fn is_unexpected_failure(&self) -> bool {
        matches!(
            self,
            CopyOutcome::Failed { reason, .. }
                if !matches!(reason, FailureReason::Cancelled | FailureReason::OutOfMemory)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CopyOutcome::Failed {
                reason: FailureReason::Timeout,
                ..
            }
        )
    }

    pub fn get_duration(&self) -> Duration {
        match self {
            CopyOutcome::Completed { duration, .. } | CopyOutcome::Failed { duration, .. } => {
                *duration
            }
            CopyOutcome::Skipped { .. } => Duration::default(),
        }
    }

    /// Gets the status of the outcome as a string for display.
    /// 以字符串形式获取结果状态以供显示。
    pub fn get_status_str(&self, locale: &str) -> String {
        match self {
            CopyOutcome::Completed { .. } => {
                t!("report.status_completed", locale = locale).to_string()
            }
            CopyOutcome::Failed { reason, .. } => match reason {
                FailureReason::Timeout => t!("report.status_timeout", locale = locale).to_string(),
                FailureReason::Cancelled => {
                    t!("report.status_cancelled", locale = locale).to_string()
                }
                FailureReason::OutOfMemory => t!("report.status_oom", locale = locale).to_string(),
                _ => t!("report.status_failed", locale = locale).to_string(),
            },
            CopyOutcome::Skipped { .. } => t!("report.status_skipped", locale = locale).to_string(),
        }
    }
}
