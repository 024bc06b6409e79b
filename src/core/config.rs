//! # Suite Configuration Module / 套件配置模块
//!
//! Suite files list `run_configs`; each entry becomes a test group. The first
//! entry is the base every later entry is merged onto, root fields are laid
//! over every merged config, and `repeat` expands a group into copies.
//!
//! 套件文件列出 `run_configs`；每个条目成为一个测试组。第一个条目是之后所有
//! 条目合并的基础，根字段覆盖每个合并后的配置，`repeat` 将测试组展开为多个副本。

use crate::core::models::Framework;
use crate::infra::sysinfo::{CpuInfo, GitRepoInfo};
use crate::infra::t;
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root keys that describe the suite layout rather than a run.
const RUN_CONFIGS: &str = "run_configs";
const SUB_CONFIGS: &str = "sub_configs";
const CONFIG_PATH: &str = "config_path";

/// An open-ended run configuration, kept in file order.
///
/// Framework scripts accept arbitrary flags, so the harness keeps every key it
/// was given and only interprets the ones it needs through typed accessors.
///
/// 开放式的运行配置，按文件顺序保存。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunConfig(pub Mapping);

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::String(key.to_string()), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Renders a scalar value as the string a command line would carry.
    pub fn str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// Reads an unsigned integer, accepting numeric strings as well.
    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness of a key: booleans, non-zero numbers and common string spellings.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => {
                matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on")
            }
            _ => false,
        }
    }

    pub fn test_id(&self) -> Option<&str> {
        self.get("test_id").and_then(Value::as_str)
    }

    pub fn repeat(&self) -> Option<u64> {
        self.u64("repeat")
    }

    pub fn copy(&self) -> Option<u64> {
        self.u64("copy")
    }

    pub fn gpus(&self) -> Option<u64> {
        self.u64("gpus")
    }

    pub fn batch_size(&self) -> Option<u64> {
        self.u64("batch_size")
    }

    pub fn total_batches(&self) -> Option<u64> {
        self.u64("total_batches")
    }

    /// The framework this config targets, `tf_cnn_benchmarks` when unset.
    pub fn framework(&self) -> Result<Framework> {
        match self.str("framework") {
            Some(name) => name.parse(),
            None => Ok(Framework::default()),
        }
    }

    /// The pass-through argument map of args-driven frameworks.
    pub fn args(&self) -> Option<&Mapping> {
        self.get("args").and_then(Value::as_mapping)
    }

    pub fn has_arg(&self, key: &str) -> bool {
        self.args().is_some_and(|args| args.contains_key(key))
    }

    pub fn set_arg(&mut self, key: &str, value: impl Into<Value>) {
        let args = self
            .0
            .entry(Value::String("args".to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !args.is_mapping() {
            *args = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(map) = args {
            map.insert(Value::String(key.to_string()), value.into());
        }
    }

    /// Returns a copy of `self` with every entry of `other` laid over it.
    pub fn merged_with(&self, other: &Mapping) -> RunConfig {
        let mut merged = self.0.clone();
        for (key, value) in other {
            merged.insert(key.clone(), value.clone());
        }
        RunConfig(merged)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.0).context(t!("config.serialize_failed").to_string())
    }
}

/// Renders a YAML value as a flag value. Sequences are comma joined.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(items) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar_to_string).collect();
            parts.map(|p| p.join(","))
        }
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Mapping(_) => None,
    }
}

/// All copies expanded from one `run_configs` entry.
/// 由一个 `run_configs` 条目展开的所有副本。
#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    pub test_id: String,
    pub copies: Vec<RunConfig>,
}

/// One loaded suite file and the groups it expands to.
#[derive(Debug, Clone)]
pub struct Suite {
    pub source: PathBuf,
    pub root: Mapping,
    pub groups: Vec<TestGroup>,
}

/// Reads a suite file into a mapping and records its location in `config_path`.
///
/// YAML is the native format; files ending in `.toml` are read with `toml`.
///
/// 将套件文件读取为映射，并在 `config_path` 中记录其位置。
pub fn load_suite_file(path: &Path) -> Result<Mapping> {
    let content = fs::read_to_string(path)
        .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;

    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let value: Value = if is_toml {
        let parsed: toml::Table = toml::from_str(&content)
            .with_context(|| t!("config.parse_failed", path = path.display()).to_string())?;
        serde_yaml::to_value(parsed)
            .with_context(|| t!("config.parse_failed", path = path.display()).to_string())?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| t!("config.parse_failed", path = path.display()).to_string())?
    };

    let Value::Mapping(mut mapping) = value else {
        bail!(t!("config.not_a_mapping", path = path.display()).to_string());
    };
    mapping.insert(
        Value::String(CONFIG_PATH.to_string()),
        Value::String(path.display().to_string()),
    );
    Ok(mapping)
}

/// Loads suite files, resolving `sub_configs` relative to the listing file.
///
/// Each sub config receives the listing file's fields (except the layout keys).
pub fn load_suite_mappings(paths: &[PathBuf]) -> Result<Vec<Mapping>> {
    let mut full_configs = Vec::new();
    for path in paths {
        let global = load_suite_file(path)?;
        let sub_configs = global.get(SUB_CONFIGS).and_then(Value::as_sequence);
        match sub_configs {
            Some(subs) => {
                let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
                for sub in subs {
                    let sub_name = sub
                        .as_str()
                        .ok_or_else(|| anyhow!(t!("config.bad_sub_config", path = path.display()).to_string()))?;
                    let mut full = load_suite_file(&base_dir.join(sub_name))?;
                    for (key, value) in &global {
                        let skip = matches!(
                            key.as_str(),
                            Some(RUN_CONFIGS) | Some(SUB_CONFIGS) | Some(CONFIG_PATH)
                        );
                        if !skip {
                            full.insert(key.clone(), value.clone());
                        }
                    }
                    full_configs.push(full);
                }
            }
            None => full_configs.push(global),
        }
    }
    Ok(full_configs)
}

/// Expands one full suite mapping into test groups.
///
/// 将一个完整的套件映射展开为测试组。
pub fn build_suite(full_config: &Mapping) -> Result<Vec<TestGroup>> {
    let source = full_config
        .get(CONFIG_PATH)
        .and_then(Value::as_str)
        .unwrap_or("<inline>")
        .to_string();
    let run_configs = full_config
        .get(RUN_CONFIGS)
        .and_then(Value::as_sequence)
        .ok_or_else(|| anyhow!(t!("config.missing_run_configs", path = source).to_string()))?;

    let mut root = full_config.clone();
    root.remove(RUN_CONFIGS);

    let mut base: Option<RunConfig> = None;
    let mut groups = Vec::with_capacity(run_configs.len());
    for (index, entry) in run_configs.iter().enumerate() {
        let entry = entry.as_mapping().ok_or_else(|| {
            anyhow!(t!("config.entry_not_mapping", path = source, index = index).to_string())
        })?;

        let merged = match &base {
            None => {
                let first = RunConfig(entry.clone());
                base = Some(first.clone());
                first
            }
            Some(base) => base.merged_with(entry),
        };
        let config = merged.merged_with(&root);

        let test_id = config
            .test_id()
            .ok_or_else(|| anyhow!(t!("config.missing_test_id", path = source, index = index).to_string()))?
            .to_string();

        let copies = match config.repeat() {
            Some(repeat) => (0..repeat)
                .map(|i| {
                    let mut copy = config.clone();
                    copy.insert("copy", i);
                    copy
                })
                .collect(),
            None => vec![config],
        };
        groups.push(TestGroup { test_id, copies });
    }
    Ok(groups)
}

/// Loads every suite file and expands it.
pub fn load_suites(paths: &[PathBuf]) -> Result<Vec<Suite>> {
    load_suite_mappings(paths)?
        .into_iter()
        .map(|full| -> Result<Suite> {
            let groups = build_suite(&full)?;
            let source = full
                .get(CONFIG_PATH)
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .unwrap_or_default();
            let mut root = full;
            root.remove(RUN_CONFIGS);
            Ok(Suite {
                source,
                root,
                groups,
            })
        })
        .collect()
}

/// Parses a `key=value` override. The value is read as a YAML scalar so
/// `batch_size=64` yields an integer and `use_fp16=true` a boolean.
///
/// 解析 `key=value` 覆盖项。值按 YAML 标量读取。
pub fn parse_override(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!(t!("config.bad_override", value = raw).to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        bail!(t!("config.bad_override", value = raw).to_string());
    }
    let value = if value.is_empty() {
        Value::String(String::new())
    } else {
        match serde_yaml::from_str::<Value>(value) {
            Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Null)) => v,
            _ => Value::String(value.to_string()),
        }
    };
    Ok((key.to_string(), value))
}

/// Applies overrides to every copy of every group.
pub fn apply_overrides(groups: &mut [TestGroup], overrides: &[(String, Value)]) {
    if overrides.is_empty() {
        return;
    }
    for group in groups.iter_mut() {
        for copy in group.copies.iter_mut() {
            for (key, value) in overrides {
                copy.insert(key, value.clone());
            }
        }
        if let Some(test_id) = group.copies.first().and_then(RunConfig::test_id) {
            group.test_id = test_id.to_string();
        }
    }
}

fn default_report_project() -> String {
    "google.com:tensorflow-performance".to_string()
}

fn default_report_dataset() -> String {
    "benchmark_results_dev".to_string()
}

fn default_report_table() -> String {
    "result".to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Report metadata read from the suite's root fields.
///
/// 从套件根字段读取的报告元数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_project")]
    pub report_project: String,
    #[serde(default = "default_report_dataset")]
    pub report_dataset: String,
    #[serde(default = "default_report_table")]
    pub report_table: String,
    #[serde(default)]
    pub test_harness: Option<String>,
    #[serde(default = "unknown")]
    pub test_environment: String,
    #[serde(default = "unknown")]
    pub platform: String,
    #[serde(default = "unknown")]
    pub platform_type: String,
    #[serde(default = "unknown")]
    pub accel_type: String,
    #[serde(default)]
    pub framework_version: Option<String>,
    #[serde(default)]
    pub framework_describe: Option<String>,
    #[serde(default)]
    pub gpu_driver: Option<String>,
    #[serde(default)]
    pub cpu_info: Option<CpuInfo>,
    #[serde(default)]
    pub git_repo_info: BTreeMap<String, GitRepoInfo>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    /// Skip groups already recorded in the tracker and record new ones.
    /// 跳过追踪器中已记录的测试组并记录新的测试组。
    #[serde(default)]
    pub track: bool,
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_project: default_report_project(),
            report_dataset: default_report_dataset(),
            report_table: default_report_table(),
            test_harness: None,
            test_environment: unknown(),
            platform: unknown(),
            platform_type: unknown(),
            accel_type: unknown(),
            framework_version: None,
            framework_describe: None,
            gpu_driver: None,
            cpu_info: None,
            git_repo_info: BTreeMap::new(),
            channel: None,
            build_type: None,
            track: false,
            device: None,
        }
    }
}

impl ReportConfig {
    /// Deserializes report metadata from a (merged) config mapping. Unknown keys are ignored.
    pub fn from_mapping(mapping: &Mapping) -> Result<Self> {
        serde_yaml::from_value(Value::Mapping(mapping.clone()))
            .context(t!("config.report_config_invalid").to_string())
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::from_mapping(&config.0)
    }

    /// Console output instead of a table insert.
    pub fn is_local(&self) -> bool {
        self.report_project == "LOCAL"
    }

    pub fn is_cpu_only(&self) -> bool {
        self.device.as_deref() == Some("cpu")
    }
}
