//! # Reporting Module / 报告模块
//!
//! This module presents aggregated benchmark results: a coloured summary on
//! the console, a standalone HTML page and a JSON dump.
//!
//! 此模块展示汇总的基准结果：控制台彩色摘要、独立的 HTML 页面和 JSON 导出。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_copy_failures, print_group_result, print_summary};
pub use html::generate_html_report;
pub use json::write_json_report;
