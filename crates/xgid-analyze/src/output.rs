//! JSON report for a finished batch.
//!
//! The report lists every submitted position in order with either its
//! analysis or its failure:
//!
//! ```json
//! {
//!   "run_id": "4b0f...",
//!   "total": 2,
//!   "succeeded": 1,
//!   "failed": 1,
//!   "positions": [
//!     { "index": 0, "xgid": "XGID=...", "params": {...}, "result": {...} },
//!     { "index": 1, "xgid": "XGID=...", "params": {...},
//!       "error": { "kind": "engine_timeout", "message": "..." } }
//!   ],
//!   "created_at": "2024-01-15T12:00:00+00:00"
//! }
//! ```

use chrono::Utc;
use gnubg_analysis::{AnalysisResult, BatchReport, FailureKind};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use xgid_core::AnalysisParams;

#[derive(Serialize)]
struct ReportJson<'a> {
    run_id: String,
    total: usize,
    succeeded: usize,
    failed: usize,
    positions: Vec<PositionJson<'a>>,
    created_at: String,
}

#[derive(Serialize)]
struct PositionJson<'a> {
    index: usize,
    xgid: &'a str,
    params: &'a AnalysisParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

#[derive(Serialize)]
struct ErrorJson {
    kind: FailureKind,
    message: String,
}

/// Renders `report` as pretty-printed JSON.
pub fn render(report: &BatchReport) -> serde_json::Result<String> {
    let positions = report
        .outcomes()
        .iter()
        .enumerate()
        .map(|(index, outcome)| {
            let (result, error) = match &outcome.result {
                Ok(result) => (Some(result), None),
                Err(e) => (
                    None,
                    Some(ErrorJson {
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                ),
            };
            PositionJson {
                index,
                xgid: outcome.request.xgid().as_str(),
                params: outcome.request.params(),
                result,
                error,
            }
        })
        .collect();

    let json = ReportJson {
        run_id: report.run_id().to_string(),
        total: report.len(),
        succeeded: report.succeeded(),
        failed: report.failed(),
        positions,
        created_at: Utc::now().to_rfc3339(),
    };
    serde_json::to_string_pretty(&json)
}

/// Writes the report to `path`, or to stdout when no path is given.
pub fn write_report(path: Option<&Path>, report: &BatchReport) -> std::io::Result<()> {
    let mut json = render(report)?;
    json.push('\n');
    match path {
        Some(path) => std::fs::write(path, json),
        None => std::io::stdout().lock().write_all(json.as_bytes()),
    }
}
