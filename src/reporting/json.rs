//! Machine-readable dump of the aggregated results.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::models::AggregateResult;
use crate::infra::t;

/// Writes `aggregates` as a pretty-printed JSON array.
pub fn write_json_report(aggregates: &[AggregateResult], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(aggregates)
        .context(t!("upload.serialize_failed").to_string())?;
    fs::write(output_path, json)
        .with_context(|| t!("fs.write_failed", path = output_path.display()).to_string())
}
