// Shared test helpers for integration tests
#![allow(dead_code)]

use bench_harness::config::RunConfig;
use serde_yaml::Mapping;
use std::fs;
use std::path::{Path, PathBuf};

/// Forces English messages so assertions on console text are stable.
pub fn setup_i18n() {
    bench_harness::init_locale(Some("en"));
}

/// Parses a YAML snippet into a `RunConfig`.
pub fn run_config(yaml: &str) -> RunConfig {
    RunConfig(serde_yaml::from_str::<Mapping>(yaml).expect("valid yaml mapping"))
}

/// Parses a YAML snippet into a mapping.
pub fn mapping(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).expect("valid yaml mapping")
}

/// Writes `content` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Creates one copy directory the way the runner lays it out:
/// `config.yaml` plus, when given, the worker log.
pub fn write_result_dir(root: &Path, name: &str, config_yaml: &str, worker_log: Option<&str>) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("Failed to create result directory");
    fs::write(dir.join("config.yaml"), config_yaml).expect("Failed to write config.yaml");
    if let Some(log) = worker_log {
        fs::write(dir.join("worker_0_stdout.log"), log).expect("Failed to write worker log");
    }
    dir
}

/// A fake tf_cnn_benchmarks script printing a fixed throughput line.
pub fn write_fake_tf_cnn_script(dir: &Path, imgs_sec: &str) -> PathBuf {
    write_file(
        dir,
        "fake_tf_cnn.sh",
        &format!(
            "echo \"Running warm up\"\necho \"Done warm up\"\necho \"total images/sec: {imgs_sec}\"\n"
        ),
    )
}

/// A single-group tf_cnn suite whose script is a shell snippet in `bench_home`.
pub fn write_tf_cnn_suite(dir: &Path, test_id: &str, repeat: u64) -> PathBuf {
    write_file(
        dir,
        "suite.yaml",
        &format!(
            r#"framework: tf_cnn_benchmarks
report_project: LOCAL
test_environment: unit-test
run_configs:
  - test_id: {test_id}
    model: resnet50
    batch_size: 32
    gpus: 1
    repeat: {repeat}
    script: sh fake_tf_cnn.sh
"#
        ),
    )
}
