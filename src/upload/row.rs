//! Builds the database row for one aggregated result.

use crate::core::config::ReportConfig;
use crate::core::models::{AggregateResult, ExtraResult, Framework};
use crate::infra::sysinfo::GitRepoInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestInfo {
    pub framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_describe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_cnt: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub git_info: BTreeMap<String, GitRepoInfo>,
}

/// One row of the results table.
/// 结果表中的一行。
#[derive(Debug, Clone, Serialize)]
pub struct UploadRow {
    pub result_id: String,
    pub test_id: String,
    pub test_harness: String,
    pub test_environment: String,
    pub result_info: Vec<ExtraResult>,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub test_info: TestInfo,
    pub extras: serde_json::Value,
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "unknown").then(|| value.to_string())
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Builds the upload row for `agg`.
///
/// `result_info` carries the mean throughput as `exp_per_sec` followed by the
/// mean of every extra result type. Samples and spread go into `extras`.
///
/// 为 `agg` 构建上传行。
pub fn build_upload_row(
    agg: &AggregateResult,
    report: &ReportConfig,
    framework: Framework,
) -> UploadRow {
    let mut result_info = vec![ExtraResult::new(
        agg.stats.mean,
        "exp_per_sec",
        "exp_per_sec",
    )];
    result_info.extend(
        agg.extras
            .iter()
            .map(|e| ExtraResult::new(e.stats.mean, &e.result_type, &e.result_units)),
    );

    let system_info = SystemInfo {
        platform: known(&report.platform),
        platform_type: known(&report.platform_type),
        accel_type: known(&report.accel_type),
        cpu_cores: report.cpu_info.as_ref().map(|c| c.core_count).filter(|c| *c > 0),
        cpu_type: report
            .cpu_info
            .as_ref()
            .map(|c| c.model_name.clone())
            .filter(|m| !m.is_empty()),
    };

    let test_info = TestInfo {
        framework: framework.name().to_string(),
        framework_version: report.framework_version.clone(),
        framework_describe: report.framework_describe.clone(),
        batch_size: agg.config.batch_size(),
        model: agg.config.str("model"),
        accel_cnt: Some(agg.gpu).filter(|g| *g > 0),
        cmd: agg.config.str("cmd"),
        git_info: report.git_repo_info.clone(),
    };

    let config = serde_json::to_value(&agg.config).unwrap_or(serde_json::Value::Null);
    let extras = json!({
        "config": config,
        "samples": agg.samples,
        "std": agg.stats.std,
        "min": agg.stats.min,
        "max": agg.stats.max,
        "batches_sampled": agg.batches_sampled,
        "data_type": agg.data_type,
        "gpu_driver": report.gpu_driver,
    });

    UploadRow {
        result_id: Uuid::new_v4().to_string(),
        test_id: agg.test_id.clone(),
        test_harness: report
            .test_harness
            .clone()
            .unwrap_or_else(|| framework.test_harness().to_string()),
        test_environment: report.test_environment.clone(),
        result_info,
        user: current_user(),
        timestamp: Utc::now(),
        system_info,
        test_info,
        extras,
    }
}
