//! # Benchmark Execution Engine Module / 基准执行引擎模块
//!
//! This module runs test groups one copy at a time: it lays out the result
//! directory, records the effective config, streams the worker output to its
//! logs and classifies how the copy ended. Once a group is done its folder is
//! parsed and aggregated.
//!
//! 此模块逐个副本地运行测试组：创建结果目录，记录生效的配置，
//! 将工作进程输出写入日志并判定副本的结束方式。测试组完成后解析并汇总其目录。

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        command_builder,
        config::{ReportConfig, RunConfig, TestGroup},
        models::{AggregateResult, CopyOutcome, FailureReason, Framework},
        oom,
    },
    infra::{
        command::{self, LogTargets, StreamOptions, Termination},
        fs,
        instance::{self, Instance},
        t,
        tracker::{self, TrackerKey},
    },
    results,
};

/// Settings shared by every copy of a run.
/// 一次运行中所有副本共享的设置。
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workspace: PathBuf,
    pub stop_token: CancellationToken,
    /// 0 quiet, 1 prints expanded ids, 5 dumps configs.
    pub debug_level: u8,
    /// Do not echo worker lines. / 不回显工作进程输出。
    pub quiet: bool,
}

impl RunContext {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            stop_token: CancellationToken::new(),
            debug_level: 0,
            quiet: false,
        }
    }
}

/// Everything the caller needs to know about one finished group.
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub test_id: String,
    pub framework: Framework,
    pub outcomes: Vec<CopyOutcome>,
    pub aggregate: AggregateResult,
    pub report_config: ReportConfig,
    /// The tracker already had this group; nothing ran.
    /// 追踪器中已有此测试组；未运行任何内容。
    pub skipped_by_tracker: bool,
    pub suite_dir: Option<PathBuf>,
}

impl GroupReport {
    /// True when the group should count against the exit status.
    pub fn is_failure(&self) -> bool {
        if self.skipped_by_tracker {
            return false;
        }
        !self.aggregate.has_samples() || self.outcomes.iter().any(CopyOutcome::is_unexpected_failure)
    }
}

fn tracker_key(framework: Framework, report: &ReportConfig) -> TrackerKey {
    TrackerKey {
        framework: framework.name().to_string(),
        channel: report.channel.clone(),
        build_type: report.build_type.clone(),
        version: report.framework_describe.clone(),
    }
}

/// Runs every copy of `group` and aggregates the group folder.
///
/// 运行 `group` 的每个副本并汇总测试组目录。
pub async fn run_group(ctx: &RunContext, group: &TestGroup) -> Result<GroupReport> {
    let first = group.copies.first().cloned().unwrap_or_default();
    let framework = first.framework()?;
    let report_config = ReportConfig::from_config(&first)?;

    let key = tracker_key(framework, &report_config);
    if report_config.track && tracker::check_state(&ctx.workspace, &key, &group.test_id)? {
        println!(
            "{}",
            t!("run.tracker_skip", test_id = &group.test_id).yellow()
        );
        let outcomes = group
            .copies
            .iter()
            .map(|c| CopyOutcome::Skipped {
                test_id: group.test_id.clone(),
                copy: c.copy().unwrap_or(0),
            })
            .collect();
        return Ok(GroupReport {
            test_id: group.test_id.clone(),
            framework,
            outcomes,
            aggregate: AggregateResult::empty(&group.test_id, first),
            report_config,
            skipped_by_tracker: true,
            suite_dir: None,
        });
    }

    if group.copies.is_empty() {
        println!("{}", t!("run.group_empty", test_id = &group.test_id).yellow());
        return Ok(GroupReport {
            test_id: group.test_id.clone(),
            framework,
            outcomes: Vec::new(),
            aggregate: AggregateResult::empty(&group.test_id, first),
            report_config,
            skipped_by_tracker: false,
            suite_dir: None,
        });
    }

    let instance = instance::instance_from_config(&first)?;
    let start_time = fs::dir_timestamp();
    let suite_dir = fs::suite_directory(&ctx.workspace, &start_time, &group.test_id);

    println!(
        "{}",
        t!(
            "run.group_start",
            test_id = &group.test_id,
            copies = group.copies.len(),
            instance = instance.id()
        )
        .blue()
        .bold()
    );

    let mut outcomes = Vec::with_capacity(group.copies.len());
    let mut run_index = 0usize;
    for copy in &group.copies {
        if ctx.stop_token.is_cancelled() {
            outcomes.push(CopyOutcome::Skipped {
                test_id: group.test_id.clone(),
                copy: copy.copy().unwrap_or(0),
            });
            continue;
        }

        let mut config = copy.clone();
        config.insert("test_suite_start_time", start_time.clone());
        config.insert("framework", framework.key());

        if config.flag("oom_test") {
            let probes =
                run_oom_search(ctx, instance.as_ref(), framework, &config, &mut run_index).await?;
            outcomes.extend(probes);
        } else {
            let outcome =
                run_benchmark(ctx, instance.as_ref(), framework, config, run_index).await?;
            run_index += 1;
            outcomes.push(outcome);
        }
    }

    let aggregate = results::process_folder(&suite_dir, Some(framework))?
        .into_iter()
        .find(|agg| agg.test_id == group.test_id)
        .unwrap_or_else(|| AggregateResult::empty(&group.test_id, first.clone()));

    if report_config.track && !ctx.stop_token.is_cancelled() {
        tracker::update_state(&ctx.workspace, &key, &group.test_id)?;
    }

    Ok(GroupReport {
        test_id: group.test_id.clone(),
        framework,
        outcomes,
        aggregate,
        report_config,
        skipped_by_tracker: false,
        suite_dir: Some(suite_dir),
    })
}

/// Executes one copy and reports how it ended.
///
/// Stamps `timestamp`, `workspace` and `cmd` into the config, writes
/// `config.yaml` and streams the worker into its logs. Spawn errors are
/// reported as a failed copy; only filesystem errors abort the run.
///
/// 执行一个副本并报告其结束方式。
pub async fn run_benchmark(
    ctx: &RunContext,
    instance: &dyn Instance,
    framework: Framework,
    mut config: RunConfig,
    run_index: usize,
) -> Result<CopyOutcome> {
    let test_id = config
        .test_id()
        .ok_or_else(|| anyhow!(t!("results.test_id_missing", path = "config").to_string()))?
        .to_string();
    let copy = config.copy().unwrap_or(0);
    let result_dir = fs::results_directory(&ctx.workspace, &config, run_index)?;

    let checkpoint_dir = result_dir.join("checkpoint");
    if framework == Framework::TfModels {
        config.set_arg("model_dir", checkpoint_dir.to_string_lossy().into_owned());
    }

    config.insert("timestamp", Utc::now().timestamp());
    config.insert("workspace", ctx.workspace.to_string_lossy().into_owned());
    let cmd = command_builder::build_command(framework, &config)?;
    config.insert("cmd", cmd.clone());
    fs::write_config_yaml(&result_dir, &config)?;

    if ctx.debug_level >= 5 {
        println!("{}", config.to_yaml()?.dimmed());
    }

    let shell_cmd = command_builder::full_shell_command(&config, &cmd)?;
    println!(
        "{}",
        t!("run.copy_start", copy = copy, test_id = &test_id, command = &shell_cmd).blue()
    );

    let options = StreamOptions {
        stop_marker: command_builder::stop_marker(framework, &config),
        timeout: config.u64("timeout_secs").map(Duration::from_secs),
        quiet: ctx.quiet,
    };
    let logs = LogTargets::worker_logs(&result_dir);

    let streamed = command::stream_to_log(
        instance.command(&shell_cmd),
        &shell_cmd,
        &logs,
        &options,
        &ctx.stop_token,
    )
    .await;

    if framework == Framework::TfModels {
        fs::remove_dir_if_exists(&checkpoint_dir)?;
    }

    let outcome = match streamed {
        Err(e) => {
            println!(
                "{}",
                t!("run.copy_spawn_failed", copy = copy, test_id = &test_id, error = format!("{e:#}")).red()
            );
            CopyOutcome::Failed {
                test_id,
                copy,
                result_dir: Some(result_dir),
                output: format!("{e:#}"),
                reason: FailureReason::Spawn,
                exit_code: None,
                duration: Duration::default(),
            }
        }
        Ok(streamed) => {
            let duration = streamed.duration;
            let secs = format!("{:.2}", duration.as_secs_f64());
            match streamed.termination {
                Some(Termination::StopMarker) => {
                    println!(
                        "{}",
                        t!("run.copy_stopped_at_marker", copy = copy, test_id = &test_id, duration = &secs).green()
                    );
                    CopyOutcome::Completed {
                        test_id,
                        copy,
                        result_dir,
                        duration,
                        stopped_at_marker: true,
                    }
                }
                Some(Termination::Timeout) => {
                    println!(
                        "{}",
                        t!(
                            "run.copy_timeout",
                            copy = copy,
                            test_id = &test_id,
                            timeout = options.timeout.map(|d| d.as_secs()).unwrap_or_default()
                        )
                        .red()
                    );
                    CopyOutcome::Failed {
                        test_id,
                        copy,
                        result_dir: Some(result_dir),
                        output: t!("run.copy_timeout_message").to_string(),
                        reason: FailureReason::Timeout,
                        exit_code: streamed.status.code(),
                        duration,
                    }
                }
                Some(Termination::Cancelled) => CopyOutcome::Failed {
                    test_id,
                    copy,
                    result_dir: Some(result_dir),
                    output: t!("run.copy_cancelled_message").to_string(),
                    reason: FailureReason::Cancelled,
                    exit_code: streamed.status.code(),
                    duration,
                },
                None if streamed.status.success() => {
                    println!(
                        "{}",
                        t!("run.copy_finished", copy = copy, test_id = &test_id, duration = &secs).green()
                    );
                    CopyOutcome::Completed {
                        test_id,
                        copy,
                        result_dir,
                        duration,
                        stopped_at_marker: false,
                    }
                }
                None => {
                    let code = streamed
                        .status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    println!(
                        "{}",
                        t!("run.copy_failed", copy = copy, test_id = &test_id, code = &code).red()
                    );
                    CopyOutcome::Failed {
                        test_id,
                        copy,
                        output: t!("run.copy_failed_message", code = &code, log = logs.stdout.display()).to_string(),
                        result_dir: Some(result_dir),
                        reason: FailureReason::NonZeroExit,
                        exit_code: streamed.status.code(),
                        duration,
                    }
                }
            }
        }
    };
    Ok(outcome)
}

fn read_worker_log(dir: &Path) -> Result<String> {
    Ok(fs::read_optional(&dir.join(fs::WORKER_STDOUT_LOG))?.unwrap_or_default())
}

/// Probes batch sizes between `oom_low` and `oom_high` until the search converges.
///
/// 在 `oom_low` 和 `oom_high` 之间探测批大小，直到搜索收敛。
async fn run_oom_search(
    ctx: &RunContext,
    instance: &dyn Instance,
    framework: Framework,
    config: &RunConfig,
    run_index: &mut usize,
) -> Result<Vec<CopyOutcome>> {
    let test_id = config.test_id().unwrap_or_default().to_string();
    let mut low = config
        .u64("oom_low")
        .context(t!("run.oom_bounds_missing", test_id = &test_id).to_string())?;
    let mut high = config
        .u64("oom_high")
        .context(t!("run.oom_bounds_missing", test_id = &test_id).to_string())?;
    let mut lowest_oom = high;
    let mut next = Some(high);
    let mut outcomes = Vec::new();

    while let Some(batch_size) = next {
        if ctx.stop_token.is_cancelled() {
            break;
        }
        println!(
            "{}",
            t!("run.oom_probe", low = low, high = high, batch_size = batch_size).cyan()
        );

        let mut probe = config.clone();
        probe.insert("batch_size", batch_size);
        let outcome = run_benchmark(ctx, instance, framework, probe, *run_index).await?;
        *run_index += 1;

        let is_oom = match outcome.result_dir() {
            Some(dir) => oom::check_oom(&read_worker_log(dir)?),
            None => false,
        };
        if is_oom && batch_size < lowest_oom {
            lowest_oom = batch_size;
        }
        let outcome = match outcome {
            CopyOutcome::Failed {
                test_id,
                copy,
                result_dir,
                output,
                exit_code,
                duration,
                reason: FailureReason::NonZeroExit,
            } if is_oom => CopyOutcome::Failed {
                test_id,
                copy,
                result_dir,
                output,
                exit_code,
                duration,
                reason: FailureReason::OutOfMemory,
            },
            other => other,
        };
        outcomes.push(outcome);

        let step = oom::oom_batch_size_search(low, high, batch_size, is_oom);
        low = step.low;
        high = step.high;
        next = step.next;
    }

    println!(
        "{}",
        t!("run.oom_result", test_id = &test_id, lowest_oom = lowest_oom, largest_ok = low).green()
    );
    Ok(outcomes)
}
