//! # OOM Search Module / 内存溢出搜索模块
//!
//! Binary search over batch sizes for the largest one that fits in memory.
//!
//! 在批大小上进行二分搜索，寻找能放入内存的最大批大小。

use once_cell::sync::Lazy;
use regex::Regex;

static OOM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"OOM when allocating tensor|CUDA out of memory").expect("valid OOM pattern")
});

/// Whether a worker log shows an out-of-memory failure.
/// 工作日志是否显示内存溢出失败。
pub fn check_oom(log: &str) -> bool {
    OOM_PATTERN.is_match(log)
}

/// The search window after one probe and the next batch size to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OomStep {
    pub low: u64,
    pub high: u64,
    /// `None` once the search has converged.
    pub next: Option<u64>,
}

/// Narrows `[low, high]` after probing `current`.
///
/// An OOM at `current` makes it the new upper bound and the next probe moves
/// down by half the window; a successful run makes it the new lower bound and
/// the next probe moves up by half the window. The search stops when the next
/// probe equals the current one.
///
/// 探测 `current` 后缩小 `[low, high]` 区间。
pub fn oom_batch_size_search(low: u64, high: u64, current: u64, current_oom: bool) -> OomStep {
    let (low, high, next) = if current_oom {
        let high = current;
        (low, high, high - high.saturating_sub(low) / 2)
    } else {
        let low = current;
        (low, high, low + high.saturating_sub(low) / 2)
    };

    OomStep {
        low,
        high,
        next: (next != current).then_some(next),
    }
}
