//! # Aggregation Module / 汇总模块
//!
//! Folds the copies of each test id into mean, population std, min and max.
//!
//! 将每个 test id 的副本汇总为均值、总体标准差、最小值和最大值。

use crate::core::models::{AggregateResult, ExtraAggregate, RunResult, Stats};
use std::collections::BTreeMap;

impl Stats {
    /// Summarizes `samples`. An empty slice gives all zeros.
    /// 汇总 `samples`。空切片返回全零。
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Stats::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Stats {
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Aggregates extra results by `result_type`, in first-seen order.
pub fn aggregate_extras(results: &[RunResult]) -> Vec<ExtraAggregate> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for extra in results.iter().flat_map(|r| r.extra_results.iter()) {
        if !values.contains_key(&extra.result_type) {
            order.push((extra.result_type.clone(), extra.result_units.clone()));
        }
        values
            .entry(extra.result_type.clone())
            .or_default()
            .push(extra.result);
    }

    order
        .into_iter()
        .map(|(result_type, result_units)| {
            let samples = values.remove(&result_type).unwrap_or_default();
            ExtraAggregate {
                stats: Stats::from_samples(&samples),
                samples: samples.len(),
                result_type,
                result_units,
            }
        })
        .collect()
}

/// Aggregates the records of one test id. Descriptive fields come from the
/// first record; records without throughput add no sample.
///
/// 汇总一个 test id 的记录。描述性字段取自第一条记录；没有吞吐量的记录不计入样本。
pub fn aggregate(test_id: &str, results: &[RunResult]) -> AggregateResult {
    let Some(first) = results.first() else {
        return AggregateResult::empty(test_id, Default::default());
    };

    let samples: Vec<f64> = results.iter().filter_map(|r| r.imgs_sec).collect();
    AggregateResult {
        test_id: test_id.to_string(),
        samples: samples.len(),
        stats: Stats::from_samples(&samples),
        gpu: first.gpu,
        data_type: first.data_type,
        batches_sampled: first.batches_sampled,
        config: first.config.clone(),
        extras: aggregate_extras(results),
    }
}

/// Groups records by test id (sorted) and aggregates each group.
pub fn aggregate_by_test_id(results: &[RunResult]) -> Vec<AggregateResult> {
    let mut groups: BTreeMap<&str, Vec<RunResult>> = BTreeMap::new();
    for result in results {
        groups
            .entry(result.test_id.as_str())
            .or_default()
            .push(result.clone());
    }
    groups
        .into_iter()
        .map(|(test_id, group)| aggregate(test_id, &group))
        .collect()
}
