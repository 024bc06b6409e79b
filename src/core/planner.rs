//! # Execution Planner Module / 执行计划模块
//!
//! This module selects which test groups run: filtering by `--test`
//! selectors and, for distributed runs, sharding the groups across runners.
//!
//! 此模块选择要运行的测试组：按 `--test` 选择器过滤，
//! 在分布式运行时将测试组分片到多个运行器。

use crate::core::config::TestGroup;
use crate::infra::t;
use anyhow::{Result, bail};

/// Represents a complete execution plan for a set of suites.
/// 表示一组套件的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// Groups to run, in suite order. / 按套件顺序排列的待运行测试组。
    pub groups: Vec<TestGroup>,
    /// Groups dropped by the selectors. / 被选择器过滤掉的测试组数量。
    pub filtered_count: usize,
    /// Total number of copies across `groups`. / `groups` 中副本的总数。
    pub total_copies: usize,
    /// Whether groups are sharded across several runners (CI).
    /// 测试组是否分布在多个运行器上（CI）。
    pub is_distributed: bool,
}

/// Matches a test id against a selector. A leading or trailing `*` matches
/// any suffix or prefix; `*` alone matches everything.
pub fn matches_selector(test_id: &str, selector: &str) -> bool {
    if selector == "*" {
        return true;
    }
    match (selector.strip_prefix('*'), selector.strip_suffix('*')) {
        (Some(rest), Some(_)) if rest.len() > 1 => {
            test_id.contains(&rest[..rest.len() - 1])
        }
        (Some(suffix), None) => test_id.ends_with(suffix),
        (None, Some(prefix)) => test_id.starts_with(prefix),
        _ => test_id == selector,
    }
}

/// Creates an execution plan.
///
/// 创建执行计划。
///
/// # Arguments
/// * `groups` - All expanded groups, in suite order
/// * `selectors` - `--test` values; empty selects everything
/// * `total_runners` - Optional total number of runners for distributed execution
/// * `runner_index` - Optional index of this runner (0-based)
pub fn plan_execution(
    groups: Vec<TestGroup>,
    selectors: &[String],
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan> {
    let (selected, filtered): (Vec<_>, Vec<_>) = groups.into_iter().partition(|group| {
        selectors.is_empty() || selectors.iter().any(|s| matches_selector(&group.test_id, s))
    });

    let (groups, is_distributed) = match (total_runners, runner_index) {
        (Some(total), Some(index)) => {
            if total == 0 || index >= total {
                bail!(t!("plan.runner_index_out_of_range").to_string());
            }
            let sharded: Vec<_> = selected
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, group)| group)
                .collect();
            (sharded, true)
        }
        (None, None) => (selected, false),
        _ => bail!(t!("plan.runner_flags_incomplete").to_string()),
    };

    let total_copies = groups.iter().map(|g| g.copies.len()).sum();

    Ok(ExecutionPlan {
        groups,
        filtered_count: filtered.len(),
        total_copies,
        is_distributed,
    })
}
