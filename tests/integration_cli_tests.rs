//! # CLI Integration Tests / CLI 集成测试
//!
//! Drives the `bench-harness` binary end to end with a fake benchmark script.
//!
//! 使用伪造的基准脚本端到端驱动 `bench-harness` 可执行文件。

mod common;

use assert_cmd::Command;
use bench_harness::commands::init::{SuiteTemplate, build_sample_suite};
use bench_harness::config::{build_suite, load_suites};
use bench_harness::models::Framework;
use common::{setup_i18n, write_fake_tf_cnn_script, write_result_dir, write_tf_cnn_suite};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn harness() -> Command {
    let mut cmd = Command::cargo_bin("bench-harness").unwrap();
    cmd.env("NO_COLOR", "1").arg("--lang").arg("en");
    cmd
}

#[cfg(test)]
mod run_tests {
    use super::*;

    #[test]
    fn test_run_aggregates_every_copy() {
        let temp_dir = TempDir::new().unwrap();
        let bench_home = temp_dir.path();
        write_fake_tf_cnn_script(bench_home, "123.40");
        let suite = write_tf_cnn_suite(bench_home, "resnet50.fake", 2);
        let workspace = bench_home.join("ws");
        let json_path = bench_home.join("results.json");

        harness()
            .arg("run")
            .arg("-c")
            .arg(&suite)
            .arg("--bench-home")
            .arg(bench_home)
            .arg("--workspace")
            .arg(&workspace)
            .arg("--json")
            .arg(&json_path)
            .arg("--quiet")
            .assert()
            .success()
            .stdout(predicate::str::contains("resnet50.fake: 2 samples, mean 123.40"))
            .stdout(predicate::str::contains("All benchmark groups produced results."));

        let json = fs::read_to_string(&json_path).unwrap();
        assert!(json.contains("\"test_id\": \"resnet50.fake\""));

        let copies: Vec<_> = fs::read_dir(workspace.join("results"))
            .unwrap()
            .flat_map(|group| fs::read_dir(group.unwrap().path()).unwrap())
            .map(|copy| copy.unwrap().path())
            .collect();
        assert_eq!(copies.len(), 2);
        for copy in &copies {
            let config = fs::read_to_string(copy.join("config.yaml")).unwrap();
            assert!(config.contains("cmd:"));
            assert!(copy.join("worker_0_stdout.log").is_file());
        }
    }

    #[test]
    fn test_failing_worker_fails_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let bench_home = temp_dir.path();
        let suite = write_tf_cnn_suite(bench_home, "resnet50.broken", 1);

        harness()
            .arg("run")
            .arg("-c")
            .arg(&suite)
            .arg("--bench-home")
            .arg(bench_home)
            .arg("--workspace")
            .arg(bench_home.join("ws"))
            .arg("--set")
            .arg("script=sh missing_script.sh")
            .arg("--quiet")
            .assert()
            .failure()
            .stdout(predicate::str::contains("resnet50.broken: 0 samples"))
            .stderr(predicate::str::contains("1 benchmark groups failed"));
    }

    #[test]
    fn test_unmatched_selector_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let suite = write_tf_cnn_suite(temp_dir.path(), "resnet50.fake", 1);

        harness()
            .arg("run")
            .arg("-c")
            .arg(&suite)
            .arg("--workspace")
            .arg(temp_dir.path().join("ws"))
            .arg("--test")
            .arg("vgg16*")
            .assert()
            .success()
            .stdout(predicate::str::contains("No groups to run."));
        assert!(!temp_dir.path().join("ws/results").exists());
    }

    #[test]
    fn test_missing_suite_file_is_reported() {
        harness()
            .arg("run")
            .arg("-c")
            .arg("no/such/suite.yaml")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no/such/suite.yaml"));
    }

    #[test]
    fn test_runner_flags_go_together() {
        let temp_dir = TempDir::new().unwrap();
        let suite = write_tf_cnn_suite(temp_dir.path(), "resnet50.fake", 1);

        harness()
            .arg("run")
            .arg("-c")
            .arg(&suite)
            .arg("--total-runners")
            .arg("2")
            .assert()
            .failure();
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn test_report_reprocesses_a_results_folder() {
        let temp_dir = TempDir::new().unwrap();
        let config = "test_id: mxnet.resnet50\nframework: mxnet\ngpus: 1\n";
        write_result_dir(
            temp_dir.path(),
            "copy_0",
            config,
            Some("Epoch[0] Batch [20]\tSpeed: 100.00 samples/sec\n"),
        );
        write_result_dir(
            temp_dir.path(),
            "copy_1",
            config,
            Some("Epoch[0] Batch [20]\tSpeed: 300.00 samples/sec\n"),
        );
        let html_path = temp_dir.path().join("report.html");

        harness()
            .arg("report")
            .arg(temp_dir.path())
            .arg("--html")
            .arg(&html_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("--- Benchmark Summary ---"))
            .stdout(predicate::str::contains("mxnet.resnet50"))
            .stdout(predicate::str::contains("200.00"));

        let html = fs::read_to_string(&html_path).unwrap();
        assert!(html.contains("mxnet.resnet50"));
    }

    #[test]
    fn test_report_on_a_missing_folder_fails() {
        harness()
            .arg("report")
            .arg("definitely/not/here")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Results folder not found"));
    }

    #[test]
    fn test_report_on_an_empty_folder_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        harness()
            .arg("report")
            .arg(temp_dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No results found."));
    }

    #[test]
    fn test_report_rejects_unknown_frameworks() {
        let temp_dir = TempDir::new().unwrap();
        harness()
            .arg("report")
            .arg(temp_dir.path())
            .arg("--framework")
            .arg("caffe")
            .assert()
            .failure();
    }
}

#[cfg(test)]
mod init_tests {
    use super::*;

    #[test]
    fn test_non_interactive_init_writes_a_loadable_suite() {
        let temp_dir = TempDir::new().unwrap();

        harness()
            .current_dir(temp_dir.path())
            .arg("init")
            .arg("--non-interactive")
            .assert()
            .success()
            .stdout(predicate::str::contains("bench_suite.yaml"));

        setup_i18n();
        let suites = load_suites(&[temp_dir.path().join("bench_suite.yaml")]).unwrap();
        let ids: Vec<_> = suites[0].groups.iter().map(|g| g.test_id.as_str()).collect();
        assert_eq!(ids, vec!["resnet50.gpu_1.32", "resnet50.gpu_1.32.fp16"]);
        assert_eq!(suites[0].groups[0].copies.len(), 3);
    }

    #[test]
    fn test_sample_suite_for_an_args_map_framework() {
        setup_i18n();
        let template = SuiteTemplate {
            framework: Framework::Mxnet,
            test_id: "mxnet.resnet50".to_string(),
            ..SuiteTemplate::default()
        };
        let groups = build_suite(&build_sample_suite(&template)).unwrap();

        assert_eq!(groups.len(), 2);
        let base = &groups[0].copies[0];
        assert_eq!(base.framework().unwrap(), Framework::Mxnet);
        assert!(base.contains("pycmd"));
        assert_eq!(base.total_batches(), Some(300));
        assert_eq!(groups[1].test_id, "mxnet.resnet50.repeat_1");
        assert_eq!(groups[1].copies.len(), 1);
    }
}
