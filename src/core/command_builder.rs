//! # Command Builder Module / 命令构建模块
//!
//! Turns a run config into the shell command that launches the benchmark
//! script, and decides which log marker means "enough batches ran".
//!
//! 将运行配置转换为启动基准脚本的 shell 命令，并决定哪个日志标记表示"已运行足够的批次"。

use crate::core::config::{RunConfig, scalar_to_string};
use crate::core::models::Framework;
use crate::infra::t;
use anyhow::{Result, anyhow};
use std::path::PathBuf;

/// Config keys forwarded verbatim to `tf_cnn_benchmarks.py` as `--key=value`.
pub const TF_CNN_PASS_THROUGH_ARGS: &[&str] = &[
    "data_format",
    "batch_size",
    "num_batches",
    "model",
    "data_dir",
    "optimizer",
    "learning_rate",
    "sync_on_finish",
    "weight_decay",
    "data_name",
    "variable_update",
    "num_intra_threads",
    "num_inter_threads",
    "mkl",
    "num_warmup_batches",
    "forward_only",
    "kmp_blocktime",
    "device",
    "staged_vars",
    "staged_grads",
    "cross_replica_sync",
    "all_reduce_spec",
    "use_datasets",
    "batch_group_size",
    "use_nccl",
    "use_fp16",
    "use_tf_layers",
];

const DEFAULT_TF_CNN_SCRIPT: &str = "python tf_cnn_benchmarks.py";
const DEFAULT_DISPLAY_EVERY: u64 = 10;

/// Quotes a value for a POSIX shell. The empty string becomes `''`.
pub fn shell_quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Builds the `tf_cnn_benchmarks.py` command line.
///
/// 构建 `tf_cnn_benchmarks.py` 命令行。
pub fn build_tf_cnn_command(config: &RunConfig) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(env_vars) = config.str("env_vars").filter(|e| !e.trim().is_empty()) {
        parts.push(env_vars);
    }
    parts.push(
        config
            .str("script")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TF_CNN_SCRIPT.to_string()),
    );

    for arg in TF_CNN_PASS_THROUGH_ARGS {
        if let Some(value) = config.get(arg).and_then(scalar_to_string) {
            parts.push(format!("--{}={}", arg, shell_quote(&value)));
        }
    }

    if let Some(ps_server) = config.str("ps_server") {
        parts.push(format!("--local_parameter_device={}", shell_quote(&ps_server)));
    }
    if let Some(gpus) = config.str("gpus") {
        parts.push(format!("--num_gpus={}", shell_quote(&gpus)));
    }

    parts.push("--nodistortions".to_string());

    let display_every = config.u64("display_every").unwrap_or(DEFAULT_DISPLAY_EVERY);
    parts.push(format!("--display_every={display_every}"));

    if let Some(trace_file) = config.str("trace_file") {
        let model = config.str("model").unwrap_or_default();
        let trace = match config.str("gpus") {
            Some(gpus) => format!("{trace_file}_{model}_{gpus}.txt"),
            None => format!("{trace_file}_{model}.txt"),
        };
        parts.push(format!("--trace_file={}", shell_quote(&trace)));
    }

    parts.join(" ")
}

/// Renders the `args` map as `--key value` pairs sorted by key.
/// An empty value renders as a bare `--key`.
pub fn render_args(config: &RunConfig) -> String {
    let Some(args) = config.args() else {
        return String::new();
    };

    let mut pairs: Vec<(String, String)> = args
        .iter()
        .filter_map(|(key, value)| {
            let key = scalar_to_string(key)?;
            let value = scalar_to_string(value).unwrap_or_default();
            Some((key, value))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    pairs
        .into_iter()
        .map(|(key, value)| {
            if value.is_empty() {
                format!("--{key}")
            } else {
                format!("--{key} {}", shell_quote(&value))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the command line of an args-map framework from `pycmd` and `args`.
///
/// A `{}` placeholder in `pycmd` receives the rendered arguments; otherwise the
/// command is `python <pycmd> <args>`.
///
/// 根据 `pycmd` 和 `args` 构建命令行。
pub fn build_args_command(config: &RunConfig) -> Result<String> {
    let pycmd = config.str("pycmd").ok_or_else(|| {
        anyhow!(
            t!(
                "command.missing_pycmd",
                test_id = config.test_id().unwrap_or("?")
            )
            .to_string()
        )
    })?;
    let args = render_args(config);

    let command = if pycmd.contains("{}") {
        pycmd.replacen("{}", &args, 1)
    } else if args.is_empty() {
        format!("python {pycmd}")
    } else {
        format!("python {pycmd} {args}")
    };
    Ok(command.trim().to_string())
}

/// Dispatches to the builder for `framework`.
pub fn build_command(framework: Framework, config: &RunConfig) -> Result<String> {
    match framework {
        Framework::TfCnnBenchmarks => Ok(build_tf_cnn_command(config)),
        Framework::TfModels | Framework::KerasTfModels | Framework::Mxnet | Framework::Pytorch => {
            build_args_command(config)
        }
    }
}

/// The log substring after which the run is stopped, if any.
///
/// 之后会停止运行的日志子串（如果有）。
pub fn stop_marker(framework: Framework, config: &RunConfig) -> Option<String> {
    let total_batches = config.total_batches()?;
    match framework {
        Framework::TfModels | Framework::Mxnet => Some(format!("[{total_batches}]")),
        Framework::Pytorch => Some(format!("{total_batches}/")),
        Framework::TfCnnBenchmarks | Framework::KerasTfModels => None,
    }
}

/// `bench_home` joined with `cmd_path`, with `~` and variables expanded.
pub fn working_dir(config: &RunConfig) -> Result<Option<PathBuf>> {
    let Some(bench_home) = config.str("bench_home").filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let mut dir = crate::infra::fs::expand_path(&bench_home)?;
    if let Some(cmd_path) = config.str("cmd_path").filter(|p| !p.is_empty()) {
        dir = dir.join(cmd_path);
    }
    Ok(Some(dir))
}

/// The full shell line: change into the working directory, then run `command`.
pub fn full_shell_command(config: &RunConfig, command: &str) -> Result<String> {
    Ok(match working_dir(config)? {
        Some(dir) => format!("cd {} && {}", shell_quote(&dir.to_string_lossy()), command),
        None => command.to_string(),
    })
}
