//! # Test Tracker Module / 测试追踪模块
//!
//! Remembers which tests already ran for a given framework build so repeated
//! invocations (e.g. nightly cron) skip them. Builds are keyed by SHA-256
//! digests; state files keyed by SHA-1 digests are not recognised.
//!
//! 记录某个框架构建已经运行过哪些测试，以便重复调用（例如夜间定时任务）时跳过它们。
//! 构建以 SHA-256 摘要为键；以 SHA-1 摘要为键的状态文件不会被识别。

use crate::infra::t;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "test_tracker.yaml";

/// Identifies one framework build. / 标识一个框架构建。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerKey {
    pub framework: String,
    pub channel: Option<String>,
    pub build_type: Option<String>,
    pub version: Option<String>,
}

impl TrackerKey {
    /// Hex SHA-256 of the concatenated fields; unset fields read as `None`.
    pub fn hash(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
        let key_str = format!(
            "{}{}{}{}",
            self.framework,
            field(&self.channel),
            field(&self.build_type),
            field(&self.version)
        );
        hex::encode(Sha256::digest(key_str.as_bytes()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub framework: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tests: Vec<String>,
}

type StateObject = BTreeMap<String, TrackerEntry>;

fn state_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_FILE)
}

fn load_state(workspace: &Path) -> Result<StateObject> {
    let path = state_path(workspace);
    if !path.exists() {
        return Ok(StateObject::new());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| t!("tracker.read_failed", path = path.display()).to_string())?;
    if content.trim().is_empty() {
        return Ok(StateObject::new());
    }
    serde_yaml::from_str(&content)
        .with_context(|| t!("tracker.read_failed", path = path.display()).to_string())
}

fn save_state(workspace: &Path, state: &StateObject) -> Result<()> {
    let path = state_path(workspace);
    fs::create_dir_all(workspace)
        .with_context(|| t!("fs.create_dir_failed", path = workspace.display()).to_string())?;
    let content = serde_yaml::to_string(state).context(t!("config.serialize_failed").to_string())?;
    fs::write(&path, content)
        .with_context(|| t!("fs.write_failed", path = path.display()).to_string())
}

/// Returns true if `test` was already recorded for `key`.
/// 如果 `test` 已为 `key` 记录过，则返回 true。
pub fn check_state(workspace: &Path, key: &TrackerKey, test: &str) -> Result<bool> {
    let state = load_state(workspace)?;
    Ok(state
        .get(&key.hash())
        .is_some_and(|entry| entry.tests.iter().any(|t| t == test)))
}

/// Records `test` for `key`, creating the entry on first use.
/// 为 `key` 记录 `test`，首次使用时创建条目。
pub fn update_state(workspace: &Path, key: &TrackerKey, test: &str) -> Result<()> {
    let mut state = load_state(workspace)?;
    let entry = state.entry(key.hash()).or_insert_with(|| TrackerEntry {
        framework: key.framework.clone(),
        channel: key.channel.clone(),
        build_type: key.build_type.clone(),
        version: key.version.clone(),
        tests: Vec::new(),
    });
    if !entry.tests.iter().any(|t| t == test) {
        entry.tests.push(test.to_string());
    }
    save_state(workspace, &state)
}
