//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the harness,
//! including process streaming, execution instances, the results layout
//! on disk, the test tracker and system probes.
//!
//! 此模块为工具提供基础设施服务，
//! 包括进程流处理、执行实例、磁盘上的结果布局、测试追踪器和系统探测。

pub mod command;
pub mod fs;
pub mod instance;
pub mod sysinfo;
pub mod tracker;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
