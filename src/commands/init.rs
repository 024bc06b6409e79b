//! # Suite Initialization Module / 套件初始化模块
//!
//! This module writes a starter `bench_suite.yaml` through an interactive
//! command-line wizard, or with defaults when `--non-interactive` is given.
//!
//! 此模块通过交互式命令行向导生成初始的 `bench_suite.yaml`，
//! 或在指定 `--non-interactive` 时使用默认值。
//!
//! ## Features / 功能特性
//!
//! - **Framework Selection**: A template per supported framework
//! - **Overwrite Protection**: Confirmation prompt before replacing an existing suite
//!
//! - **框架选择**: 每个支持的框架对应一个模板
//! - **覆盖保护**: 替换现有套件前的确认提示

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

use crate::core::models::Framework;
use crate::infra::t;

pub const SUITE_FILE: &str = "bench_suite.yaml";

/// The answers the wizard collects.
/// 向导收集的答案。
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteTemplate {
    pub framework: Framework,
    pub test_id: String,
    pub model: String,
    pub batch_size: u64,
    pub gpus: u64,
    pub repeat: u64,
}

impl Default for SuiteTemplate {
    fn default() -> Self {
        Self {
            framework: Framework::TfCnnBenchmarks,
            test_id: "resnet50.gpu_1.32".to_string(),
            model: "resnet50".to_string(),
            batch_size: 32,
            gpus: 1,
            repeat: 3,
        }
    }
}

fn entry(pairs: &[(&str, Value)]) -> Mapping {
    pairs
        .iter()
        .map(|(key, value)| (Value::from(*key), value.clone()))
        .collect()
}

/// Script path and argument map for the args-driven frameworks.
fn args_template(template: &SuiteTemplate) -> (&'static str, Mapping) {
    let batch_size = Value::from(template.batch_size);
    let model = Value::from(template.model.as_str());
    match template.framework {
        Framework::Mxnet => (
            "train_imagenet.py",
            entry(&[
                ("network", model),
                ("batch-size", batch_size),
                ("benchmark", Value::from(1u64)),
            ]),
        ),
        Framework::Pytorch => (
            "main.py",
            entry(&[("arch", model), ("batch-size", batch_size)]),
        ),
        Framework::KerasTfModels => (
            "official/resnet/keras/keras_imagenet_main.py",
            entry(&[
                ("batch_size", batch_size),
                ("use_synthetic_data", Value::from("")),
            ]),
        ),
        Framework::TfModels | Framework::TfCnnBenchmarks => (
            "official/resnet/imagenet_main.py",
            entry(&[
                ("batch_size", batch_size),
                ("use_synthetic_data", Value::from("")),
            ]),
        ),
    }
}

/// Builds the starter suite: a base entry plus a variant that only changes the id.
///
/// 构建初始套件：一个基础条目加一个只修改 id 的变体。
pub fn build_sample_suite(template: &SuiteTemplate) -> Mapping {
    let mut base = entry(&[
        ("test_id", Value::from(template.test_id.as_str())),
        ("model", Value::from(template.model.as_str())),
        ("batch_size", Value::from(template.batch_size)),
        ("gpus", Value::from(template.gpus)),
        ("repeat", Value::from(template.repeat)),
    ]);

    let variant = if template.framework == Framework::TfCnnBenchmarks {
        base.insert(Value::from("num_batches"), Value::from(100u64));
        entry(&[
            ("test_id", Value::from(format!("{}.fp16", template.test_id))),
            ("use_fp16", Value::from(true)),
        ])
    } else {
        let (pycmd, args) = args_template(template);
        base.insert(Value::from("pycmd"), Value::from(pycmd));
        base.insert(Value::from("total_batches"), Value::from(300u64));
        base.insert(Value::from("args"), Value::Mapping(args));
        entry(&[
            ("test_id", Value::from(format!("{}.repeat_1", template.test_id))),
            ("repeat", Value::from(1u64)),
        ])
    };

    let mut suite = entry(&[
        ("framework", Value::from(template.framework.key())),
        ("report_project", Value::from("LOCAL")),
        ("test_environment", Value::from("local")),
        ("bench_home", Value::from("~/benchmarks")),
    ]);
    suite.insert(
        Value::from("run_configs"),
        Value::Sequence(vec![Value::Mapping(base), Value::Mapping(variant)]),
    );
    suite
}

/// Runs the interactive wizard to generate `bench_suite.yaml`.
///
/// 运行交互式向导以生成 `bench_suite.yaml`。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(SUITE_FILE);
    let theme = ColorfulTheme::default();

    if non_interactive {
        return write_suite(config_path, &SuiteTemplate::default(), language);
    }

    println!("\n{}", t!("init.wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init.wizard_description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = SUITE_FILE))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let defaults = SuiteTemplate::default();
    let frameworks = Framework::all();
    let keys: Vec<&str> = frameworks.iter().map(Framework::key).collect();
    let selection = Select::with_theme(&theme)
        .with_prompt(t!("init.framework_prompt", locale = language))
        .items(&keys)
        .default(0)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let model: String = Input::with_theme(&theme)
        .with_prompt(t!("init.model_prompt", locale = language))
        .default(defaults.model.clone())
        .interact_text()?;
    let batch_size: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.batch_size_prompt", locale = language))
        .default(defaults.batch_size)
        .interact_text()?;
    let gpus: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.gpus_prompt", locale = language))
        .default(defaults.gpus)
        .interact_text()?;
    let test_id: String = Input::with_theme(&theme)
        .with_prompt(t!("init.test_id_prompt", locale = language))
        .default(format!("{model}.gpu_{gpus}.{batch_size}"))
        .interact_text()?;
    let repeat: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.repeat_prompt", locale = language))
        .default(defaults.repeat)
        .interact_text()?;

    let template = SuiteTemplate {
        framework: frameworks[selection],
        test_id,
        model,
        batch_size,
        gpus,
        repeat,
    };
    write_suite(config_path, &template, language)
}

fn write_suite(path: &Path, template: &SuiteTemplate, language: &str) -> Result<()> {
    let yaml = serde_yaml::to_string(&build_sample_suite(template))
        .context(t!("init.serialize_failed", locale = language).to_string())?;

    fs::write(path, yaml)
        .with_context(|| t!("init.write_failed", locale = language, path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language, path = path.display()));

    Ok(())
}
