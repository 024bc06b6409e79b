//! # Results Unit Tests / 结果单元测试
//!
//! This module covers the per-framework log scanners, the folder walk and the
//! statistics computed per test id.
//!
//! 此模块覆盖各框架的日志扫描器、目录遍历以及按 test id 计算的统计量。

mod common;

use bench_harness::models::{DataType, ExtraResult, Framework, RunResult, Stats};
use bench_harness::results::parse::{
    data_type, parse_keras_log, parse_mxnet_log, parse_pytorch_log, parse_tf_cnn_eval_log,
    parse_tf_cnn_log, parse_tf_models_log, parse_worker_log,
};
use bench_harness::results::{aggregate, aggregate_by_test_id, collect_results, process_folder};
use common::{run_config, setup_i18n, write_file, write_result_dir};
use std::path::PathBuf;
use tempfile::TempDir;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn record(test_id: &str, imgs_sec: Option<f64>, extras: Vec<ExtraResult>) -> RunResult {
    RunResult {
        test_id: test_id.to_string(),
        imgs_sec,
        batches_sampled: 5,
        gpu: 2,
        data_type: DataType::Real,
        result_dir: PathBuf::from("/tmp/none"),
        config: run_config(&format!("test_id: {test_id}\nbatch_size: 32\n")),
        extra_results: extras,
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_tf_cnn_total_line() {
        let log = "python tf_cnn_benchmarks.py --model=resnet50\n\
                   Done warm up\n\
                   10\timages/sec: 220.1 +/- 0.0 (jitter = 0.0)\n\
                   ----------------------------------------------------------------\n\
                   total images/sec: 221.40\n";
        let summary = parse_tf_cnn_log(log);
        assert_eq!(summary.imgs_sec, Some(221.40));
        assert_eq!(summary.batches_sampled, 0);
        assert_eq!(parse_tf_cnn_log("no throughput here\n").imgs_sec, None);
    }

    #[test]
    fn test_tf_cnn_eval_log_accuracy_and_throughput() {
        let log = "Accuracy @ 1 = 0.5000 Accuracy @ 5 = 0.8000 [50000 examples]\n\
                   Accuracy @ 1 = 0.7500 Accuracy @ 5 = 0.9200 [50000 examples]\n\
                   total images/sec: 1000.0\n";
        let eval = parse_tf_cnn_eval_log(log);
        assert_eq!(eval.exp_per_sec, Some(1000.0));
        assert_eq!(
            eval.extras,
            vec![
                ExtraResult::new(0.75, "top_1", "accuracy"),
                ExtraResult::new(0.92, "top_5", "accuracy"),
                ExtraResult::new(1000.0, "eval_exp_per_sec", "exp_per_sec"),
            ]
        );
    }

    #[test]
    fn test_mxnet_skips_warm_up_and_stops_after_batch_100() {
        let log = "INFO:root:Epoch[0] Batch [10]\tSpeed: 999.00 samples/sec\taccuracy=0.0\n\
                   INFO:root:Epoch[0] Batch [20]\tSpeed: 100.00 samples/sec\taccuracy=0.0\n\
                   INFO:root:Epoch[0] Batch [40]\tSpeed: 200.00 samples/sec\taccuracy=0.0\n\
                   INFO:root:Epoch[0] Batch [120]\tSpeed: 300.00 samples/sec\taccuracy=0.0\n\
                   INFO:root:Epoch[0] Batch [140]\tSpeed: 999.00 samples/sec\taccuracy=0.0\n";
        let summary = parse_mxnet_log(log);
        assert_eq!(summary.batches_sampled, 3);
        assert_close(summary.imgs_sec.unwrap(), 200.0);
    }

    #[test]
    fn test_pytorch_throughput_from_step_time() {
        let log = "Epoch: [0][ 10/500]\tTime 9.000 (9.000)\tData 0.1\n\
                   Epoch: [0][ 30/500]\tTime 0.500 (0.600)\tData 0.1\n\
                   Epoch: [0][ 40/500]\tTime 0.250 (0.500)\tData 0.1\n";
        let summary = parse_pytorch_log(log, 96);
        assert_eq!(summary.batches_sampled, 2);
        assert_close(summary.imgs_sec.unwrap(), 256.0);
    }

    #[test]
    fn test_tf_models_counts_batches_above_100() {
        let log = "Batch [100]:  current exp/sec = 50.0, total exp/sec = 50.0\n\
                   Batch [200]:  current exp/sec = 100.0, total exp/sec = 75.0\n\
                   Batch [300]:  current exp/sec = 200.0, total exp/sec = 116.7\n";
        let summary = parse_tf_models_log(log);
        assert_eq!(summary.batches_sampled, 2);
        assert_close(summary.imgs_sec.unwrap(), 150.0);
    }

    #[test]
    fn test_keras_benchmark_metric_lines() {
        let log = "BenchmarkMetric: {'num_batches': 100, 'time_taken': 1.0}\n\
                   BenchmarkMetric: {'num_batches': 200, 'time_taken': 8.0}\n\
                   BenchmarkMetric: {'num_batches': 300, 'time_taken': 12.0}\n";
        let summary = parse_keras_log(log, 2400.0);
        assert_eq!(summary.batches_sampled, 2);
        assert_close(summary.imgs_sec.unwrap(), 250.0);
    }

    #[test]
    fn test_worker_log_uses_gpus_and_batch_size_from_config() {
        let config = run_config("gpus: 2\nbatch_size: 12\n");
        let log = "BenchmarkMetric: {'num_batches': 200, 'time_taken': 8.0}\n";
        let summary = parse_worker_log(Framework::KerasTfModels, log, &config);
        assert_close(summary.imgs_sec.unwrap(), 300.0);
    }

    #[test]
    fn test_worker_log_without_batch_size_gives_no_throughput() {
        setup_i18n();
        let pytorch_log = "Epoch: [0][ 30/500]\tTime 0.500 (0.520)\n";
        let keras_log = "BenchmarkMetric: {'num_batches': 200, 'time_taken': 8.0}\n";

        let no_batch_size = run_config("test_id: t\ngpus: 1\n");
        let summary = parse_worker_log(Framework::Pytorch, pytorch_log, &no_batch_size);
        assert_eq!(summary.imgs_sec, None);
        assert_eq!(summary.batches_sampled, 0);
        let summary = parse_worker_log(Framework::KerasTfModels, keras_log, &no_batch_size);
        assert_eq!(summary.imgs_sec, None);

        let no_gpus = run_config("test_id: t\nbatch_size: 32\n");
        assert_eq!(parse_worker_log(Framework::Pytorch, pytorch_log, &no_gpus).imgs_sec, None);
    }

    #[test]
    fn test_logs_without_samples_give_no_throughput() {
        assert_eq!(parse_mxnet_log("").imgs_sec, None);
        assert_eq!(parse_pytorch_log("garbage", 32).imgs_sec, None);
        assert_eq!(parse_tf_models_log("Batch [5]:  current exp/sec = 1.0").imgs_sec, None);
    }

    #[test]
    fn test_data_type_per_framework() {
        let tf_real = run_config("data_dir: /data/imagenet\n");
        let synthetic = run_config("args:\n  use_synthetic_data: ''\n");
        let mxnet_real = run_config("args:\n  data-train: /data/train.rec\n");
        let empty = run_config("test_id: t\n");

        assert_eq!(data_type(Framework::TfCnnBenchmarks, &tf_real), DataType::Real);
        assert_eq!(data_type(Framework::TfCnnBenchmarks, &empty), DataType::Synth);
        assert_eq!(data_type(Framework::Mxnet, &mxnet_real), DataType::Real);
        assert_eq!(data_type(Framework::Mxnet, &empty), DataType::Synth);
        assert_eq!(data_type(Framework::Pytorch, &empty), DataType::Real);
        assert_eq!(data_type(Framework::TfModels, &synthetic), DataType::Synth);
        assert_eq!(data_type(Framework::KerasTfModels, &empty), DataType::Real);
    }
}

#[cfg(test)]
mod aggregate_tests {
    use super::*;

    #[test]
    fn test_stats_use_population_std() {
        let stats = Stats::from_samples(&[4.0, 1.0, 3.0, 2.0]);
        assert_close(stats.mean, 2.5);
        assert_close(stats.std, 1.25f64.sqrt());
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(Stats::from_samples(&[]), Stats::default());
    }

    #[test]
    fn test_records_without_throughput_add_no_sample() {
        let results = vec![
            record("a", Some(100.0), vec![]),
            record("a", None, vec![]),
            record("a", Some(300.0), vec![]),
        ];
        let agg = aggregate("a", &results);
        assert_eq!(agg.samples, 2);
        assert_close(agg.stats.mean, 200.0);
        assert_eq!(agg.gpu, 2);
        assert_eq!(agg.batches_sampled, 5);
        assert_eq!(agg.config.test_id(), Some("a"));
        assert!(agg.has_samples());
    }

    #[test]
    fn test_extras_grouped_by_type_in_first_seen_order() {
        let results = vec![
            record(
                "a",
                Some(1.0),
                vec![
                    ExtraResult::new(0.7, "top_1", "accuracy"),
                    ExtraResult::new(10.0, "total_time", "s"),
                ],
            ),
            record("a", Some(1.0), vec![ExtraResult::new(0.9, "top_1", "accuracy")]),
        ];
        let agg = aggregate("a", &results);
        let types: Vec<_> = agg.extras.iter().map(|e| e.result_type.as_str()).collect();
        assert_eq!(types, vec!["top_1", "total_time"]);
        assert_eq!(agg.extras[0].samples, 2);
        assert_close(agg.extras[0].stats.mean, 0.8);
        assert_eq!(agg.extras[1].result_units, "s");
    }

    #[test]
    fn test_empty_group_aggregates_to_zero() {
        let agg = aggregate("missing", &[]);
        assert_eq!(agg.test_id, "missing");
        assert_eq!(agg.samples, 0);
        assert_eq!(agg.stats, Stats::default());
        assert!(!agg.has_samples());
    }

    #[test]
    fn test_grouping_is_sorted_by_test_id() {
        let results = vec![
            record("zeta", Some(1.0), vec![]),
            record("alpha", Some(2.0), vec![]),
            record("zeta", Some(3.0), vec![]),
        ];
        let aggregates = aggregate_by_test_id(&results);
        let ids: Vec<_> = aggregates.iter().map(|a| a.test_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(aggregates[1].samples, 2);
    }
}

#[cfg(test)]
mod collect_tests {
    use super::*;

    const TF_CNN_CONFIG: &str = "test_id: resnet50.gpu_1.32\nframework: tf_cnn_benchmarks\ngpus: 1\nbatch_size: 32\n";

    #[test]
    fn test_walks_every_copy_directory() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_result_dir(root, "suite/20240101T000000_0", TF_CNN_CONFIG, Some("total images/sec: 100.0\n"));
        write_result_dir(root, "suite/20240101T000010_1", TF_CNN_CONFIG, Some("total images/sec: 200.0\n"));
        let third = write_result_dir(root, "suite/20240101T000020_2", TF_CNN_CONFIG, Some("crashed\n"));
        write_file(
            &third,
            "extra_results.yaml",
            "- result: 12.5\n  result_type: total_time\n  result_units: s\n",
        );

        let results = collect_results(root, None).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].imgs_sec, Some(100.0));
        assert_eq!(results[2].imgs_sec, None);
        assert_eq!(results[2].extra_results, vec![ExtraResult::new(12.5, "total_time", "s")]);
        assert_eq!(results[0].data_type, DataType::Synth);

        let aggregates = process_folder(root, None).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].samples, 2);
        assert_close(aggregates[0].stats.mean, 150.0);
        assert_eq!(aggregates[0].extras.len(), 1);
    }

    #[test]
    fn test_invalid_extra_results_keep_the_throughput() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_result_dir(root, "a", TF_CNN_CONFIG, Some("total images/sec: 100.0\n"));
        let broken = write_result_dir(root, "b", TF_CNN_CONFIG, Some("total images/sec: 300.0\n"));
        write_file(&broken, "extra_results.yaml", "result: [oops");

        let aggregates = process_folder(root, None).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].samples, 2);
        assert_close(aggregates[0].stats.mean, 200.0);
        assert!(aggregates[0].extras.is_empty());
    }

    #[test]
    fn test_eval_log_fills_throughput_and_accuracy() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        let dir = write_result_dir(temp_dir.path(), "copy_0", TF_CNN_CONFIG, Some("header only\n"));
        write_file(
            &dir,
            "eval_0_stdout.log",
            "Accuracy @ 1 = 0.7600 Accuracy @ 5 = 0.9300\ntotal images/sec: 512.0\n",
        );

        let results = collect_results(temp_dir.path(), None).unwrap();
        assert_eq!(results[0].imgs_sec, Some(512.0));
        let types: Vec<_> = results[0]
            .extra_results
            .iter()
            .map(|e| e.result_type.as_str())
            .collect();
        assert_eq!(types, vec!["top_1", "top_5", "eval_exp_per_sec"]);
    }

    #[test]
    fn test_missing_worker_log_keeps_the_record() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        write_result_dir(temp_dir.path(), "copy_0", TF_CNN_CONFIG, None);
        let results = collect_results(temp_dir.path(), None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].imgs_sec, None);
    }

    #[test]
    fn test_framework_override_selects_the_parser() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        write_result_dir(
            temp_dir.path(),
            "copy_0",
            "test_id: tfm\nframework: tf_cnn_benchmarks\n",
            Some("Batch [200]:  current exp/sec = 80.0\n"),
        );

        let as_recorded = collect_results(temp_dir.path(), None).unwrap();
        assert_eq!(as_recorded[0].imgs_sec, None);
        let overridden = collect_results(temp_dir.path(), Some(Framework::TfModels)).unwrap();
        assert_eq!(overridden[0].imgs_sec, Some(80.0));
    }

    #[test]
    fn test_missing_folder_yields_no_aggregates() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        let aggregates = process_folder(&temp_dir.path().join("absent"), None).unwrap();
        assert!(aggregates.is_empty());
    }

    #[test]
    fn test_config_without_test_id_is_an_error() {
        setup_i18n();
        let temp_dir = TempDir::new().unwrap();
        write_result_dir(temp_dir.path(), "copy_0", "framework: mxnet\n", Some(""));
        assert!(collect_results(temp_dir.path(), None).is_err());
    }
}
