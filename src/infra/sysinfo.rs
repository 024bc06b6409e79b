//! # System Information Module / 系统信息模块
//!
//! Thin probes for GPU, CPU and git metadata attached to uploaded results.
//! Each probe runs one command; the text parsing lives in pure functions.
//!
//! 为上传结果附加 GPU、CPU 和 git 元数据的轻量探测。
//! 每个探测只运行一个命令；文本解析位于纯函数中。

use crate::core::config::ReportConfig;
use crate::infra::command::probe_output;
use crate::infra::t;
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuInfo {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub socket_count: u64,
    /// Cores per socket times sockets. / 每插槽核心数乘以插槽数。
    #[serde(default)]
    pub core_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepoInfo {
    #[serde(default)]
    pub git_dir: Option<String>,
    #[serde(default)]
    pub describe: Option<String>,
    #[serde(default)]
    pub last_commit_id: Option<String>,
}

/// Parses `nvidia-smi --query-gpu=driver_version,gpu_name --format=csv`.
///
/// Returns `(driver_version, gpu_name)` of the first GPU, skipping a leading
/// Quadro (usually the display card of a workstation) when another GPU follows.
///
/// 解析 nvidia-smi 的 CSV 输出，返回第一块 GPU 的驱动版本和名称；
/// 如果第一块是 Quadro 且后面还有其他 GPU，则跳过它。
pub fn parse_nvidia_smi(csv: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = csv.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    let split = |line: &str| -> Option<(String, String)> {
        let (driver, name) = line.split_once(',')?;
        Some((driver.trim().to_string(), name.trim().to_string()))
    };
    let first = split(lines[1])?;
    if first.1.contains("Quadro") && lines.len() > 2 {
        return split(lines[2]).or(Some(first));
    }
    Some(first)
}

fn cpuinfo_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, v)| v.trim())
}

/// Parses the text of `/proc/cpuinfo`.
pub fn parse_cpuinfo(text: &str) -> CpuInfo {
    let mut model_name = String::new();
    let mut cores_per_socket = 0u64;
    let mut physical_ids = BTreeSet::new();

    for line in text.lines() {
        let key = line.split(':').next().unwrap_or_default().trim();
        match key {
            "model name" if model_name.is_empty() => {
                model_name = cpuinfo_value(line).unwrap_or_default().to_string();
            }
            "cpu cores" if cores_per_socket == 0 => {
                cores_per_socket = cpuinfo_value(line)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
            "physical id" => {
                if let Some(id) = cpuinfo_value(line) {
                    physical_ids.insert(id.to_string());
                }
            }
            _ => {}
        }
    }

    let socket_count = (physical_ids.len() as u64).max(1);
    CpuInfo {
        model_name,
        socket_count,
        core_count: cores_per_socket * socket_count,
    }
}

/// `git -C <dir> describe --always`
pub async fn git_describe(git_dir: &Path) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(git_dir).args(["describe", "--always"]);
    probe_output(cmd).await
}

/// `git -C <dir> log --format=%H -n 1`
pub async fn git_last_commit_id(git_dir: &Path) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(git_dir)
        .args(["log", "--format=%H", "-n", "1"]);
    probe_output(cmd).await
}

/// Fills the gaps of `report` from the local machine.
///
/// GPU details are skipped for `device: cpu`. Probes that fail leave the
/// field untouched and print a warning.
///
/// 使用本机信息填补 `report` 中缺失的字段。
pub async fn gather_system_info(report: &mut ReportConfig) {
    if !report.is_cpu_only() && (report.gpu_driver.is_none() || report.accel_type == "unknown") {
        let mut cmd = Command::new("nvidia-smi");
        cmd.args(["--query-gpu=driver_version,gpu_name", "--format=csv"]);
        match probe_output(cmd).await.as_deref().and_then(parse_nvidia_smi) {
            Some((driver, gpu_name)) => {
                if report.gpu_driver.is_none() {
                    report.gpu_driver = Some(driver);
                }
                if report.accel_type == "unknown" {
                    report.accel_type = gpu_name;
                }
            }
            None => println!("{}", t!("sysinfo.nvidia_smi_failed").yellow()),
        }
    }

    if report.cpu_info.is_none() {
        match tokio::fs::read_to_string("/proc/cpuinfo").await {
            Ok(text) => report.cpu_info = Some(parse_cpuinfo(&text)),
            Err(_) => println!("{}", t!("sysinfo.cpuinfo_failed").yellow()),
        }
    }

    for (name, repo) in report.git_repo_info.iter_mut() {
        let Some(git_dir) = repo.git_dir.clone() else {
            continue;
        };
        let git_dir = Path::new(&git_dir);
        if repo.describe.is_none() {
            repo.describe = git_describe(git_dir).await;
        }
        if repo.last_commit_id.is_none() {
            repo.last_commit_id = git_last_commit_id(git_dir).await;
        }
        if repo.describe.is_none() {
            println!("{}", t!("sysinfo.git_failed", name = name).yellow());
        }
    }
}
