//! # Results Module / 结果模块
//!
//! Turns result folders into aggregated numbers: `collect` walks the folders,
//! `parse` reads each framework's log format and `aggregate` computes the
//! statistics per test id.
//!
//! 将结果目录转换为汇总数据：`collect` 遍历目录，`parse` 读取各框架的日志格式，
//! `aggregate` 按 test id 计算统计量。

pub mod aggregate;
pub mod collect;
pub mod parse;

use crate::core::models::{AggregateResult, Framework};
use anyhow::Result;
use std::path::Path;

pub use aggregate::{aggregate, aggregate_by_test_id};
pub use collect::collect_results;

/// Collects and aggregates every result below `folder`.
/// A folder without results yields an empty list.
///
/// 收集并汇总 `folder` 下的所有结果。没有结果的目录返回空列表。
pub fn process_folder(folder: &Path, framework: Option<Framework>) -> Result<Vec<AggregateResult>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }
    let results = collect_results(folder, framework)?;
    Ok(aggregate_by_test_id(&results))
}
