//! Position input from the command line and from files.

use anyhow::Context;
use std::path::PathBuf;
use xgid_core::{AnalysisParams, PositionRequest, Xgid};

/// Parses one XGID per line, skipping blank lines and `#` comments.
pub fn parse_xgid_lines(content: &str, source: &str) -> anyhow::Result<Vec<Xgid>> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            Xgid::parse(line).with_context(|| format!("{}:{}: invalid XGID '{}'", source, number, line))
        })
        .collect()
}

/// Builds requests from `--xgid` values followed by the contents of `files`.
pub fn collect_requests(
    xgids: &[String],
    files: &[PathBuf],
    params: AnalysisParams,
) -> anyhow::Result<Vec<PositionRequest>> {
    let mut positions = Vec::new();
    for raw in xgids {
        positions.push(Xgid::parse(raw).with_context(|| format!("invalid XGID '{}'", raw))?);
    }
    for file in files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        positions.extend(parse_xgid_lines(&content, &file.display().to_string())?);
    }

    positions
        .into_iter()
        .map(|xgid| PositionRequest::with_params(xgid, params).map_err(anyhow::Error::from))
        .collect()
}
