//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the benchmark summary table and the details of failed copies.
//!
//! 打印基准汇总表和失败副本的详细信息。

use crate::core::models::{AggregateResult, CopyOutcome};
use crate::infra::t;
use colored::*;

/// Prints one row per aggregate and one indented row per extra result type.
///
/// 每个汇总结果打印一行，每种附加结果类型打印一行缩进行。
///
/// # Output Format / 输出格式
/// ```text
/// --- Benchmark Summary ---
///   - Test ID                                  | Samples |       Mean |        Std |        Min |        Max
///   - resnet50.gpu_1.32                        |       3 |     221.40 |       1.20 |     220.10 |     223.00
///       top_1 (accuracy)                       |       3 |       0.76 |       0.00 |       0.76 |       0.76
/// ```
pub fn print_summary(aggregates: &[AggregateResult], locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());
    println!(
        "  - {:<40} | {:>7} | {:>10} | {:>10} | {:>10} | {:>10}",
        t!("report.header_test_id", locale = locale),
        t!("report.header_samples", locale = locale),
        t!("report.header_mean", locale = locale),
        t!("report.header_std", locale = locale),
        t!("report.header_min", locale = locale),
        t!("report.header_max", locale = locale),
    );

    for agg in aggregates {
        let line = format!(
            "  - {:<40} | {:>7} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2}",
            agg.test_id, agg.samples, agg.stats.mean, agg.stats.std, agg.stats.min, agg.stats.max
        );
        if agg.has_samples() {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }

        for extra in &agg.extras {
            let label = format!("{} ({})", extra.result_type, extra.result_units);
            println!(
                "      {:<38} | {:>7} | {:>10.4} | {:>10.4} | {:>10.4} | {:>10.4}",
                label, extra.samples, extra.stats.mean, extra.stats.std, extra.stats.min, extra.stats.max
            );
        }
    }
}

/// Prints a single aggregate as soon as its group finishes.
pub fn print_group_result(agg: &AggregateResult, locale: &str) {
    let message = t!(
        "report.group_result",
        locale = locale,
        test_id = &agg.test_id,
        samples = agg.samples,
        mean = format!("{:.2}", agg.stats.mean),
        std = format!("{:.2}", agg.stats.std)
    );
    if agg.has_samples() {
        println!("{}", message.green().bold());
    } else {
        println!("{}", message.red().bold());
    }
}

/// Prints the copies that failed unexpectedly, with where to find their logs.
///
/// 打印意外失败的副本及其日志位置。
pub fn print_copy_failures(outcomes: &[&CopyOutcome], locale: &str) {
    if outcomes.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, outcome) in outcomes.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}' copy {} ({})",
            i + 1,
            outcomes.len(),
            t!("report.header_failure", locale = locale).red(),
            outcome.test_id().cyan(),
            outcome.copy(),
            outcome.get_status_str(locale)
        );
        if let CopyOutcome::Failed { output, .. } = outcome {
            println!("    {output}");
        }
        if let Some(dir) = outcome.result_dir() {
            println!("    {}", t!("report.result_dir", locale = locale, path = dir.display()).dimmed());
        }
    }
    println!("{}", "-".repeat(80));
}
