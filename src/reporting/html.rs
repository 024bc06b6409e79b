//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders the aggregated results into a standalone HTML page with `maud`.
//!
//! 使用 `maud` 将汇总结果渲染为独立的 HTML 页面。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::{AggregateResult, CopyOutcome};
use crate::infra::t;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2em; color: #222; }
h1 { font-weight: 600; }
.summary-container { display: flex; gap: 2em; margin-bottom: 1.5em; }
.summary-item { display: flex; flex-direction: column; align-items: center; }
.count { font-size: 2em; font-weight: 700; }
.label { color: #666; }
.ok-text { color: #2e7d32; }
.failed-text { color: #c62828; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #ddd; padding: 6px 10px; text-align: left; }
td.num, th.num { text-align: right; font-variant-numeric: tabular-nums; }
tr.extra td { color: #555; font-size: 0.9em; }
tr.empty td:first-child { color: #c62828; }
"#;

fn stat_cells(samples: usize, mean: f64, std: f64, min: f64, max: f64, precision: usize) -> Markup {
    html! {
        td.num { (samples) }
        td.num { (format!("{mean:.precision$}")) }
        td.num { (format!("{std:.precision$}")) }
        td.num { (format!("{min:.precision$}")) }
        td.num { (format!("{max:.precision$}")) }
    }
}

/// Builds the report page.
///
/// 构建报告页面。
pub fn render_html_report(
    aggregates: &[AggregateResult],
    outcomes: &[CopyOutcome],
    locale: &str,
) -> String {
    let with_samples = aggregates.iter().filter(|a| a.has_samples()).count();
    let without_samples = aggregates.len() - with_samples;
    let failed_copies = outcomes.iter().filter(|o| o.is_unexpected_failure()).count();

    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div.summary-container {
                    div.summary-item {
                        span.count { (aggregates.len()) }
                        span.label { (t!("html_report.summary.tests", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.ok-text { (with_samples) }
                        span.label { (t!("html_report.summary.with_samples", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.failed-text { (without_samples) }
                        span.label { (t!("html_report.summary.without_samples", locale = locale)) }
                    }
                    div.summary-item {
                        span.count { (outcomes.len()) }
                        span.label { (t!("html_report.summary.copies", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.failed-text { (failed_copies) }
                        span.label { (t!("html_report.summary.failed_copies", locale = locale)) }
                    }
                }
                table {
                    thead {
                        tr {
                            th { (t!("report.header_test_id", locale = locale)) }
                            th.num { (t!("report.header_samples", locale = locale)) }
                            th.num { (t!("report.header_mean", locale = locale)) }
                            th.num { (t!("report.header_std", locale = locale)) }
                            th.num { (t!("report.header_min", locale = locale)) }
                            th.num { (t!("report.header_max", locale = locale)) }
                            th { (t!("html_report.table.data_type", locale = locale)) }
                            th.num { (t!("html_report.table.gpus", locale = locale)) }
                        }
                    }
                    tbody {
                        @for agg in aggregates {
                            tr class=(if agg.has_samples() { "" } else { "empty" }) {
                                td { (agg.test_id) }
                                (stat_cells(agg.samples, agg.stats.mean, agg.stats.std, agg.stats.min, agg.stats.max, 2))
                                td { (agg.data_type.to_string()) }
                                td.num { (agg.gpu) }
                            }
                            @for extra in &agg.extras {
                                tr.extra {
                                    td { "\u{a0}\u{a0}" (extra.result_type) " (" (extra.result_units) ")" }
                                    (stat_cells(extra.samples, extra.stats.mean, extra.stats.std, extra.stats.min, extra.stats.max, 4))
                                    td {}
                                    td {}
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    markup.into_string()
}

/// Writes the HTML report to `output_path`.
pub fn generate_html_report(
    aggregates: &[AggregateResult],
    outcomes: &[CopyOutcome],
    output_path: &Path,
    locale: &str,
) -> Result<()> {
    let html = render_html_report(aggregates, outcomes, locale);
    fs::write(output_path, html)
        .with_context(|| t!("fs.write_failed", path = output_path.display()).to_string())
}
