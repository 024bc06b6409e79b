//! # Upload Module / 上传模块
//!
//! Packs aggregated results and system metadata into table rows and hands
//! them to a sink.
//!
//! 将汇总结果和系统元数据打包为表行并交给输出目标。

pub mod row;
pub mod sink;

use crate::core::config::ReportConfig;
use crate::core::models::{AggregateResult, Framework};
use crate::infra::t;
use anyhow::Result;
use colored::*;

pub use row::{UploadRow, build_upload_row};
pub use sink::{ConsoleSink, JsonLinesSink, ResultSink, sink_for};

/// Builds one row per aggregate and inserts it. Aggregates without samples
/// are skipped with a warning. Returns the number of rows inserted.
///
/// 为每个汇总结果构建一行并插入。没有样本的汇总结果会被跳过并给出警告。
/// 返回插入的行数。
pub fn upload_results(
    aggregates: &[AggregateResult],
    report: &ReportConfig,
    framework: Framework,
    sink: &mut dyn ResultSink,
) -> Result<usize> {
    let mut inserted = 0;
    for agg in aggregates {
        if !agg.has_samples() {
            println!(
                "{}",
                t!("run.upload_skipped_empty", test_id = agg.test_id.as_str()).yellow()
            );
            continue;
        }
        let row = build_upload_row(agg, report, framework);
        sink.insert(&row)?;
        inserted += 1;
    }
    Ok(inserted)
}
