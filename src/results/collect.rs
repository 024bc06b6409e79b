//! Walks a results folder and turns every copy directory into a `RunResult`.

use crate::core::config::RunConfig;
use crate::core::models::{ExtraResult, Framework, RunResult};
use crate::infra::fs::{
    CONFIG_FILE, EVAL_STDOUT_LOG, EXTRA_RESULTS_FILE, WORKER_STDOUT_LOG, read_optional,
};
use crate::infra::t;
use crate::results::parse;
use anyhow::{Context, Result, anyhow};
use colored::*;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use walkdir::WalkDir;

/// Finds every `config.yaml` below `folder` and parses its directory.
///
/// `framework` overrides the framework recorded in each config.
///
/// 查找 `folder` 下的每个 `config.yaml` 并解析其所在目录。
pub fn collect_results(folder: &Path, framework: Option<Framework>) -> Result<Vec<RunResult>> {
    let mut results = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.with_context(|| t!("results.walk_failed", path = folder.display()).to_string())?;
        if entry.file_type().is_file() && entry.file_name() == CONFIG_FILE {
            if let Some(dir) = entry.path().parent() {
                results.push(parse_result_dir(dir, framework)?);
            }
        }
    }
    Ok(results)
}

/// A malformed `extra_results.yaml` is reported and skipped so the copy's
/// throughput still counts.
fn load_extra_results(dir: &Path) -> Result<Vec<ExtraResult>> {
    let path = dir.join(EXTRA_RESULTS_FILE);
    let content = match read_optional(&path)? {
        Some(content) if !content.trim().is_empty() => content,
        _ => return Ok(Vec::new()),
    };
    match serde_yaml::from_str(&content) {
        Ok(extras) => Ok(extras),
        Err(e) => {
            println!(
                "{}",
                t!("results.extra_results_invalid", path = path.display(), error = e).yellow()
            );
            Ok(Vec::new())
        }
    }
}

/// Parses one copy directory: its config, worker log, eval log and extra results.
pub fn parse_result_dir(dir: &Path, framework: Option<Framework>) -> Result<RunResult> {
    let config_path = dir.join(CONFIG_FILE);
    let content = read_optional(&config_path)?
        .ok_or_else(|| anyhow!(t!("results.config_missing", path = config_path.display()).to_string()))?;
    let mapping: Mapping = match serde_yaml::from_str::<Value>(&content)
        .with_context(|| t!("config.parse_failed", path = config_path.display()).to_string())?
    {
        Value::Mapping(mapping) => mapping,
        _ => return Err(anyhow!(t!("config.not_a_mapping", path = config_path.display()).to_string())),
    };
    let config = RunConfig(mapping);

    let framework = match framework {
        Some(framework) => framework,
        None => config.framework()?,
    };
    let test_id = config
        .test_id()
        .ok_or_else(|| anyhow!(t!("results.test_id_missing", path = config_path.display()).to_string()))?
        .to_string();

    let mut result = RunResult {
        test_id,
        imgs_sec: None,
        batches_sampled: 0,
        gpu: config.gpus().unwrap_or(0),
        data_type: parse::data_type(framework, &config),
        result_dir: dir.to_path_buf(),
        extra_results: load_extra_results(dir)?,
        config,
    };

    let worker_log = dir.join(WORKER_STDOUT_LOG);
    match read_optional(&worker_log)? {
        Some(log) => {
            let summary = parse::parse_worker_log(framework, &log, &result.config);
            result.imgs_sec = summary.imgs_sec;
            result.batches_sampled = summary.batches_sampled;
        }
        None => println!(
            "{}",
            t!("results.log_missing", path = worker_log.display()).yellow()
        ),
    }

    if framework == Framework::TfCnnBenchmarks {
        if let Some(eval_log) = read_optional(&dir.join(EVAL_STDOUT_LOG))? {
            let eval = parse::parse_tf_cnn_eval_log(&eval_log);
            if result.imgs_sec.is_none() {
                result.imgs_sec = eval.exp_per_sec;
            }
            result.extra_results.extend(eval.extras);
        }
    }

    Ok(result)
}
