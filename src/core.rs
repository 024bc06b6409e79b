//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the harness:
//! suite configuration, command building, planning and the sequential
//! benchmark execution engine.
//!
//! 此模块包含基准测试工具的核心功能：
//! 套件配置、命令构建、执行计划和顺序基准执行引擎。

pub mod command_builder;
pub mod config;
pub mod execution;
pub mod models;
pub mod oom;
pub mod planner;

// Re-exports
pub use config::{RunConfig, TestGroup};
pub use execution::{run_benchmark, run_group};
pub use models::{AggregateResult, CopyOutcome, Framework, RunResult};
