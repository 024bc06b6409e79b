//! # Report Command / 报告命令
//!
//! Re-processes a results folder left by earlier runs: aggregates it again,
//! prints the summary and optionally writes reports or uploads the rows.
//!
//! 重新处理以往运行留下的结果目录：重新汇总、打印摘要，并可选择写出报告或上传结果行。

use anyhow::{Result, bail};
use colored::*;
use std::path::PathBuf;

use crate::{
    core::{
        config::{self, ReportConfig},
        models::Framework,
    },
    infra::{fs, sysinfo, t},
    reporting::{generate_html_report, print_summary, write_json_report},
    results, upload,
};

/// Options of the `report` subcommand.
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    pub dir: PathBuf,
    /// Parse every log as this framework instead of the recorded one.
    /// 将所有日志按此框架解析，而不是使用记录的框架。
    pub framework: Option<Framework>,
    /// Suite file whose root fields supply the report metadata.
    /// 提供报告元数据的套件文件。
    pub config: Option<PathBuf>,
    pub upload: bool,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub workspace: String,
}

pub async fn execute(args: ReportArgs, locale: &str) -> Result<()> {
    if !fs::is_directory(&args.dir) {
        bail!(t!("report.dir_not_found", locale = locale, path = args.dir.display()).to_string());
    }

    println!(
        "{}",
        t!("report.processing", locale = locale, path = args.dir.display()).blue()
    );
    let aggregates = results::process_folder(&args.dir, args.framework)?;

    if aggregates.is_empty() {
        println!("{}", t!("report.no_results", locale = locale).yellow());
        return Ok(());
    }

    print_summary(&aggregates, locale);

    if let Some(path) = &args.html {
        println!("\n{}", t!("run.html_generating", locale = locale, path = path.display()));
        generate_html_report(&aggregates, &[], path, locale)?;
    }

    if let Some(path) = &args.json {
        println!("{}", t!("run.json_generating", locale = locale, path = path.display()));
        write_json_report(&aggregates, path)?;
    }

    if args.upload {
        let mut report_config = match &args.config {
            Some(path) => ReportConfig::from_mapping(&config::load_suite_file(path)?)?,
            None => ReportConfig::default(),
        };
        sysinfo::gather_system_info(&mut report_config).await;

        let workspace = fs::expand_path(&args.workspace)?;
        let mut sink = upload::sink_for(&report_config, &workspace);
        let mut uploaded = 0;
        for agg in &aggregates {
            let framework = match args.framework {
                Some(framework) => framework,
                None => agg.config.framework()?,
            };
            uploaded += upload::upload_results(
                std::slice::from_ref(agg),
                &report_config,
                framework,
                sink.as_mut(),
            )?;
        }
        println!(
            "{}",
            t!("run.uploaded", locale = locale, count = uploaded).green()
        );
    }

    Ok(())
}
