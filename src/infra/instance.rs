//! # Execution Instance Module / 执行实例模块
//!
//! An instance is the machine a benchmark runs on. It turns a shell line into
//! a process the harness can stream: `sh -c` locally, `ssh` for a remote host.
//!
//! 实例是运行基准测试的机器。它将 shell 命令行转换为工具可以流式读取的进程：
//! 本地使用 `sh -c`，远程主机使用 `ssh`。

use crate::core::config::RunConfig;
use crate::infra::fs::expand_path;
use crate::infra::t;
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tokio::process::Command;

/// A place to run benchmark commands.
/// 运行基准命令的位置。
pub trait Instance: Send + Sync {
    fn id(&self) -> &str;

    /// Builds the process that executes `shell_cmd` on this instance.
    /// 构建在此实例上执行 `shell_cmd` 的进程。
    fn command(&self, shell_cmd: &str) -> Command;
}

/// Prefixes `cmd` with sourcing the virtualenv activation script, if any.
pub fn with_virtual_env(virtual_env_path: Option<&str>, cmd: &str) -> String {
    match virtual_env_path.filter(|v| !v.trim().is_empty()) {
        Some(venv) => format!(". {venv};{cmd}"),
        None => cmd.to_string(),
    }
}

/// Runs on the local machine through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct LocalInstance {
    pub virtual_env_path: Option<String>,
}

impl Instance for LocalInstance {
    fn id(&self) -> &str {
        "localhost"
    }

    fn command(&self, shell_cmd: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(with_virtual_env(self.virtual_env_path.as_deref(), shell_cmd));
        cmd
    }
}

/// Runs on a remote host through the system `ssh` client.
///
/// Interrupting a run stops the local `ssh` process only.
#[derive(Debug, Clone)]
pub struct SshInstance {
    pub host: String,
    pub username: Option<String>,
    pub ssh_key: Option<String>,
    pub virtual_env_path: Option<String>,
}

impl SshInstance {
    pub fn destination(&self) -> String {
        match &self.username {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// The argument vector passed to `ssh`.
    pub fn ssh_args(&self, shell_cmd: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(key) = &self.ssh_key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args.push(self.destination());
        args.push(with_virtual_env(self.virtual_env_path.as_deref(), shell_cmd));
        args
    }
}

impl Instance for SshInstance {
    fn id(&self) -> &str {
        &self.host
    }

    fn command(&self, shell_cmd: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args(shell_cmd));
        cmd
    }
}

fn default_instance_type() -> String {
    "local".to_string()
}

/// The `instance:` block of a run config.
#[derive(Debug, Clone, Deserialize)]
struct InstanceConfig {
    #[serde(rename = "type", default = "default_instance_type")]
    kind: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    ssh_key: Option<String>,
    #[serde(default)]
    virtual_env_path: Option<String>,
}

fn expand_opt(value: Option<String>) -> Result<Option<String>> {
    value
        .map(|v| expand_path(&v).map(|p| p.to_string_lossy().into_owned()))
        .transpose()
}

/// Creates the instance described by `config`. A missing `instance` block means local.
///
/// 根据 `config` 创建实例。缺少 `instance` 块表示本地实例。
pub fn instance_from_config(config: &RunConfig) -> Result<Box<dyn Instance>> {
    let instance = match config.get("instance") {
        Some(value) => serde_yaml::from_value::<InstanceConfig>(value.clone())
            .context(t!("instance.invalid_config").to_string())?,
        None => InstanceConfig {
            kind: default_instance_type(),
            host: None,
            username: None,
            ssh_key: None,
            virtual_env_path: None,
        },
    };
    let virtual_env_path = expand_opt(
        instance
            .virtual_env_path
            .or_else(|| config.str("virtual_env_path")),
    )?;

    match instance.kind.as_str() {
        "local" => Ok(Box::new(LocalInstance { virtual_env_path })),
        "ssh" => {
            let host = instance
                .host
                .filter(|h| !h.is_empty())
                .ok_or_else(|| anyhow!(t!("instance.ssh_missing_host").to_string()))?;
            Ok(Box::new(SshInstance {
                host,
                username: instance.username,
                ssh_key: expand_opt(instance.ssh_key)?,
                virtual_env_path,
            }))
        }
        "gce" => bail!(t!("instance.gce_unsupported").to_string()),
        other => bail!(t!("instance.unknown_type", kind = other).to_string()),
    }
}
