//! # File System Operations Module / 文件系统操作模块
//!
//! This module owns the on-disk layout of a benchmark workspace:
//! `<workspace>/results/<suite_start>_<test_id>/<timestamp>_<run_index>/`
//! holding `config.yaml` and the worker logs of one copy.
//!
//! 此模块负责基准工作区在磁盘上的布局：
//! `<workspace>/results/<suite_start>_<test_id>/<timestamp>_<run_index>/`
//! 保存一个副本的 `config.yaml` 和工作日志。

use crate::core::config::RunConfig;
use crate::infra::t;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const EXTRA_RESULTS_FILE: &str = "extra_results.yaml";
pub const WORKER_STDOUT_LOG: &str = "worker_0_stdout.log";
pub const WORKER_STDERR_LOG: &str = "worker_0_stderr.log";
pub const EVAL_STDOUT_LOG: &str = "eval_0_stdout.log";

/// Timestamp format used in directory names.
pub const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Expands `~` and environment variables in a path string.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| t!("fs.expand_failed", path = raw).to_string())?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Replaces characters that do not belong in a directory name.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The current local time formatted for directory names.
pub fn dir_timestamp() -> String {
    Local::now().format(DIR_TIMESTAMP_FORMAT).to_string()
}

/// `<workspace>/results/<start_time>_<test_id>`, the folder shared by all copies of a group.
/// 同一测试组所有副本共享的目录。
pub fn suite_directory(workspace: &Path, start_time: &str, test_id: &str) -> PathBuf {
    workspace
        .join("results")
        .join(format!("{}_{}", start_time, sanitize_name(test_id)))
}

/// Creates the result directory of one copy.
///
/// The group folder comes from the config's `test_suite_start_time` and
/// `test_id`; the copy folder is the current time plus `run_index`, so copies
/// started within the same second never collide.
///
/// 创建一个副本的结果目录。
pub fn results_directory(workspace: &Path, config: &RunConfig, run_index: usize) -> Result<PathBuf> {
    let start_time = config
        .str("test_suite_start_time")
        .unwrap_or_else(dir_timestamp);
    let test_id = config.test_id().unwrap_or("unnamed");
    let dir = suite_directory(workspace, &start_time, test_id)
        .join(format!("{}_{}", dir_timestamp(), run_index));
    fs::create_dir_all(&dir)
        .with_context(|| t!("fs.create_dir_failed", path = dir.display()).to_string())?;
    Ok(dir)
}

/// Writes the run config as `config.yaml` into `dir`.
pub fn write_config_yaml(dir: &Path, config: &RunConfig) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, config.to_yaml()?)
        .with_context(|| t!("fs.write_failed", path = path.display()).to_string())?;
    Ok(path)
}

/// Reads a file if it exists. A missing file is `Ok(None)`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| t!("fs.read_failed", path = path.display()).to_string()),
    }
}

/// Removes a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if is_directory(path) {
        fs::remove_dir_all(path)
            .with_context(|| t!("fs.remove_failed", path = path.display()).to_string())?;
    }
    Ok(())
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}
