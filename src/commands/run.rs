// src/commands/run.rs

use anyhow::{Result, bail};
use colored::*;
use serde_yaml::Value;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, TestGroup},
        execution::{GroupReport, RunContext, run_group},
        planner,
    },
    infra::{fs, sysinfo, t},
    reporting::{
        generate_html_report, print_copy_failures, print_group_result, print_summary,
        write_json_report,
    },
    upload,
};

/// Options of the `run` subcommand.
/// `run` 子命令的选项。
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub configs: Vec<PathBuf>,
    pub workspace: String,
    pub bench_home: Option<String>,
    /// Raw `key=value` overrides. / 原始的 `key=value` 覆盖项。
    pub overrides: Vec<String>,
    /// `--test` selectors. / `--test` 选择器。
    pub tests: Vec<String>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub upload: bool,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub debug_level: u8,
    pub quiet: bool,
}

pub async fn execute(args: RunArgs, locale: &str) -> Result<()> {
    if args.configs.is_empty() {
        bail!(t!("run.no_config", locale = locale).to_string());
    }

    let workspace = fs::expand_path(&args.workspace)?;
    println!(
        "{}",
        t!("run.workspace", locale = locale, path = workspace.display())
    );

    let groups = load_groups(&args, locale)?;

    if args.debug_level >= 1 {
        for group in &groups {
            println!(
                "{}",
                t!("run.expanded_group", locale = locale, test_id = &group.test_id, copies = group.copies.len())
                    .dimmed()
            );
        }
    }

    let plan = planner::plan_execution(groups, &args.tests, args.total_runners, args.runner_index)?;

    if plan.filtered_count > 0 {
        println!(
            "{}",
            t!(
                "run.filtered_groups",
                locale = locale,
                filtered = plan.filtered_count,
                total = plan.groups.len()
            )
            .cyan()
        );
    }

    if let (Some(total), Some(index)) = (args.total_runners, args.runner_index) {
        println!(
            "{}",
            t!(
                "run.split_runner",
                locale = locale,
                index = index + 1,
                total = total,
                count = plan.groups.len()
            )
            .bold()
        );
    }

    if plan.groups.is_empty() {
        println!("{}", t!("run.no_groups", locale = locale).green());
        return Ok(());
    }

    println!(
        "{}",
        t!(
            "run.plan",
            locale = locale,
            groups = plan.groups.len(),
            copies = plan.total_copies
        )
        .bold()
    );

    let mut ctx = RunContext::new(workspace.clone());
    ctx.stop_token = setup_signal_handler(locale);
    ctx.debug_level = args.debug_level;
    ctx.quiet = args.quiet;

    let mut reports = Vec::with_capacity(plan.groups.len());
    for group in &plan.groups {
        let report = run_group(&ctx, group).await?;
        if !report.skipped_by_tracker {
            print_group_result(&report.aggregate, locale);
        }
        reports.push(report);
    }

    finish(&reports, &args, &workspace, locale).await
}

/// Loads the suites, applies `--bench-home` and `--set` and flattens the groups.
fn load_groups(args: &RunArgs, locale: &str) -> Result<Vec<TestGroup>> {
    let mut overrides = Vec::with_capacity(args.overrides.len() + 1);
    if let Some(bench_home) = &args.bench_home {
        overrides.push(("bench_home".to_string(), Value::String(bench_home.clone())));
    }
    for raw in &args.overrides {
        overrides.push(config::parse_override(raw)?);
    }

    let mut groups = Vec::new();
    for mut suite in config::load_suites(&args.configs)? {
        println!(
            "{}",
            t!(
                "run.suite_loaded",
                locale = locale,
                path = suite.source.display(),
                groups = suite.groups.len()
            )
        );
        config::apply_overrides(&mut suite.groups, &overrides);
        groups.extend(suite.groups);
    }
    Ok(groups)
}

fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}

/// Prints, writes and uploads the results, then decides the exit status.
async fn finish(
    reports: &[GroupReport],
    args: &RunArgs,
    workspace: &std::path::Path,
    locale: &str,
) -> Result<()> {
    let aggregates: Vec<_> = reports
        .iter()
        .filter(|r| !r.skipped_by_tracker)
        .map(|r| r.aggregate.clone())
        .collect();
    let outcomes: Vec<_> = reports.iter().flat_map(|r| r.outcomes.iter().cloned()).collect();

    print_summary(&aggregates, locale);

    let failed_copies: Vec<_> = outcomes.iter().filter(|o| o.is_unexpected_failure()).collect();
    print_copy_failures(&failed_copies, locale);

    if let Some(path) = &args.html {
        println!("\n{}", t!("run.html_generating", locale = locale, path = path.display()));
        if let Err(e) = generate_html_report(&aggregates, &outcomes, path, locale) {
            eprintln!("{} {:#}", t!("run.html_failed", locale = locale).red(), e);
        }
    }

    if let Some(path) = &args.json {
        println!("{}", t!("run.json_generating", locale = locale, path = path.display()));
        if let Err(e) = write_json_report(&aggregates, path) {
            eprintln!("{} {:#}", t!("run.json_failed", locale = locale).red(), e);
        }
    }

    if args.upload {
        let mut uploaded = 0;
        for report in reports.iter().filter(|r| !r.skipped_by_tracker) {
            let mut report_config = report.report_config.clone();
            sysinfo::gather_system_info(&mut report_config).await;
            let mut sink = upload::sink_for(&report_config, workspace);
            uploaded += upload::upload_results(
                std::slice::from_ref(&report.aggregate),
                &report_config,
                report.framework,
                sink.as_mut(),
            )?;
        }
        println!("{}", t!("run.uploaded", locale = locale, count = uploaded).green());
    }

    let failed_groups = reports.iter().filter(|r| r.is_failure()).count();
    if failed_groups > 0 {
        bail!(t!("run.benchmarks_failed", locale = locale, count = failed_groups).to_string());
    }

    println!("\n{}", t!("run.all_passed", locale = locale).green().bold());
    Ok(())
}
