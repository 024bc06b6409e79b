//! # Bench Harness Library / 基准测试工具库
//!
//! This library provides the core functionality for the `bench-harness` tool,
//! a configuration-driven runner for machine-learning framework benchmarks.
//! It expands YAML suites into runs, executes them one by one, parses the
//! framework logs and aggregates throughput numbers.
//!
//! 此库为 `bench-harness` 工具提供核心功能，
//! 这是一个配置驱动的机器学习框架基准测试运行器。
//! 它将 YAML 套件展开为多次运行，逐个执行，解析框架日志并汇总吞吐量。
//!
//! ## Modules / 模块
//!
//! - `core` - Suite configuration, command building and the sequential execution engine
//! - `infra` - Process streaming, execution instances, file layout, tracker and system probes
//! - `results` - Log parsing and statistical aggregation
//! - `upload` - Result rows and sinks
//! - `reporting` - Console, HTML and JSON reports
//! - `cli` / `commands` - Command-line interface and commands
//!
//! - `core` - 套件配置、命令构建和顺序执行引擎
//! - `infra` - 进程流、执行实例、文件布局、追踪器和系统探测
//! - `results` - 日志解析和统计汇总
//! - `upload` - 结果行和输出目标
//! - `reporting` - 控制台、HTML 和 JSON 报告
//! - `cli` / `commands` - 命令行接口和命令

pub mod cli;
pub mod commands;
pub mod core;
pub mod infra;
pub mod reporting;
pub mod results;
pub mod upload;

pub use crate::core::config;
pub use crate::core::models;

/// Resolves the locale to use for the user interface and activates it.
///
/// An explicitly requested locale wins, otherwise the system locale is used.
/// The full tag (e.g. "zh-CN") is tried first, then the language part
/// (e.g. "en" from "en-US"), and finally "en".
///
/// 解析并激活界面语言。优先使用显式请求的语言，否则使用系统语言。
pub fn init_locale(requested: Option<&str>) -> String {
    let locale = requested
        .map(str::to_string)
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        locale.clone()
    } else {
        locale
            .split(['-', '_'])
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
            .to_string()
    };

    rust_i18n::set_locale(&lang);
    lang
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
