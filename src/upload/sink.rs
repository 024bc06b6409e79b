//! Destinations for upload rows.

use crate::core::config::ReportConfig;
use crate::infra::t;
use crate::upload::row::UploadRow;
use anyhow::{Context, Result};
use colored::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Receives finished rows. / 接收构建好的结果行。
pub trait ResultSink {
    fn insert(&mut self, row: &UploadRow) -> Result<()>;
}

/// Prints rows to the console (`report_project: LOCAL`).
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn insert(&mut self, row: &UploadRow) -> Result<()> {
        let rendered =
            serde_json::to_string_pretty(row).context(t!("upload.serialize_failed").to_string())?;
        println!("{}", t!("upload.local_row", test_id = &row.test_id).cyan());
        println!("{rendered}");
        Ok(())
    }
}

/// Appends one JSON document per line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    pub path: PathBuf,
}

impl JsonLinesSink {
    /// `<workspace>/uploads/<dataset>.<table>.jsonl`
    pub fn for_table(workspace: &Path, dataset: &str, table: &str) -> Self {
        Self {
            path: workspace
                .join("uploads")
                .join(format!("{dataset}.{table}.jsonl")),
        }
    }
}

impl ResultSink for JsonLinesSink {
    fn insert(&mut self, row: &UploadRow) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| t!("fs.create_dir_failed", path = parent.display()).to_string())?;
        }
        let line = serde_json::to_string(row).context(t!("upload.serialize_failed").to_string())?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| t!("fs.write_failed", path = self.path.display()).to_string())?;
        writeln!(file, "{line}")
            .with_context(|| t!("fs.write_failed", path = self.path.display()).to_string())?;
        println!(
            "{}",
            t!("upload.row_written", test_id = &row.test_id, path = self.path.display()).green()
        );
        Ok(())
    }
}

/// The sink matching the report's project.
pub fn sink_for(report: &ReportConfig, workspace: &Path) -> Box<dyn ResultSink> {
    if report.is_local() {
        Box::new(ConsoleSink)
    } else {
        Box::new(JsonLinesSink::for_table(
            workspace,
            &report.report_dataset,
            &report.report_table,
        ))
    }
}
