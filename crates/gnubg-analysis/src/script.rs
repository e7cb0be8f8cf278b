//! Command script fed to the engine on stdin.
//!
//! The script is plain gnubg command language. Python runs through gnubg's
//! one-line `>` command: two lines bind the request list and the name of the
//! result variable, a third executes the embedded analysis program, and
//! `quit` ends the session. The request list travels as a JSON document
//! inside a string literal and is decoded by `json.loads`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xgid_core::PositionRequest;

use crate::channel::RESULT_PATH_ENV;

/// Python program executed inside the engine.
const ANALYSIS_PROGRAM: &str = include_str!("../scripts/xgid_analysis.py");

/// Line prefix binding the request list.
pub const REQUESTS_LINE: &str = "> import json; REQUESTS = json.loads(";

const REQUESTS_LINE_END: &str = ")";

/// Line prefix binding the result variable name.
pub const RESULT_ENV_LINE: &str = "> RESULT_PATH_ENV = ";

/// One request as the embedded program sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedRequest {
    pub xgid: String,
    pub plies: u8,
    pub cube_plies: u8,
    pub cubeful: bool,
}

impl From<&PositionRequest> for ScriptedRequest {
    fn from(request: &PositionRequest) -> Self {
        let params = request.params();
        Self {
            xgid: request.xgid().to_string(),
            plies: params.plies,
            cube_plies: params.cube_plies,
            cubeful: params.cubeful,
        }
    }
}

/// A complete engine session for a batch of positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineScript {
    text: String,
}

impl EngineScript {
    /// Builds the session script for `requests`, analysed in order.
    pub fn build(requests: &[PositionRequest]) -> Self {
        let scripted: Vec<Value> = requests
            .iter()
            .map(ScriptedRequest::from)
            .map(|r| {
                serde_json::json!({
                    "xgid": r.xgid,
                    "plies": r.plies,
                    "cube_plies": r.cube_plies,
                    "cubeful": r.cubeful,
                })
            })
            .collect();

        // JSON string escapes are valid Python string escapes.
        let requests_literal = Value::String(Value::Array(scripted).to_string()).to_string();
        let env_literal = Value::String(RESULT_PATH_ENV.to_string()).to_string();
        let program_literal = Value::String(ANALYSIS_PROGRAM.to_string()).to_string();

        let lines = [
            "set confirm new off".to_string(),
            format!("{}{}{}", REQUESTS_LINE, requests_literal, REQUESTS_LINE_END),
            format!("{}{}", RESULT_ENV_LINE, env_literal),
            format!(
                "> exec(compile({}, \"xgid_analysis.py\", \"exec\"))",
                program_literal
            ),
            "quit".to_string(),
        ];

        let mut text = lines.join("\n");
        text.push('\n');
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Recovers the request list and result variable from a session script.
///
/// Returns `None` if either binding is missing or malformed.
pub fn parse_bindings(script: &str) -> Option<(Vec<ScriptedRequest>, String)> {
    let mut requests = None;
    let mut env_name = None;

    for line in script.lines() {
        if let Some(literal) = line
            .strip_prefix(REQUESTS_LINE)
            .and_then(|rest| rest.strip_suffix(REQUESTS_LINE_END))
        {
            requests = serde_json::from_str::<String>(literal)
                .ok()
                .and_then(|json| serde_json::from_str(&json).ok());
        } else if let Some(json) = line.strip_prefix(RESULT_ENV_LINE) {
            env_name = serde_json::from_str(json).ok();
        }
    }

    Some((requests?, env_name?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xgid_core::{AnalysisParams, Xgid};

    fn request(xgid: &str, params: AnalysisParams) -> PositionRequest {
        PositionRequest::with_params(Xgid::parse(xgid).unwrap(), params).unwrap()
    }

    #[test]
    fn test_script_layout() {
        let script = EngineScript::build(&[request(
            "XGID=-b----E-C---eE---c-e----B-:0:0:1:61:0:0:0:0:10",
            AnalysisParams::default(),
        )]);
        let lines: Vec<&str> = script.as_str().lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "set confirm new off");
        assert!(lines[1].starts_with(REQUESTS_LINE));
        assert!(lines[1].ends_with("\")"));
        assert_eq!(
            lines[2],
            format!("{}\"{}\"", RESULT_ENV_LINE, RESULT_PATH_ENV)
        );
        assert!(lines[3].starts_with("> exec(compile(\""));
        assert_eq!(lines[4], "quit");
        assert!(script.as_str().ends_with("quit\n"));
    }

    #[test]
    fn test_program_is_a_single_line_literal() {
        let script = EngineScript::build(&[]);
        let exec_line = script.as_str().lines().nth(3).unwrap();

        let literal = exec_line
            .strip_prefix("> exec(compile(")
            .and_then(|rest| rest.strip_suffix(", \"xgid_analysis.py\", \"exec\"))"))
            .unwrap();
        let program: String = serde_json::from_str(literal).unwrap();
        assert_eq!(program, ANALYSIS_PROGRAM);
        assert!(program.contains("RESULT_PATH_ENV"));
    }

    #[test]
    fn test_bindings_roundtrip() {
        let cubeless = AnalysisParams {
            plies: 2,
            cube_plies: 1,
            cubeful: false,
        };
        let requests = [
            request(
                "XGID=-b----E-C---eE---c-e----B-:0:0:1:61:0:0:0:0:10",
                AnalysisParams::default(),
            ),
            request("-a-BBBB-----cD--b-cbbcb-A-:1:1:1:00:0:0:0:0:10", cubeless),
        ];
        let script = EngineScript::build(&requests);

        let (parsed, env_name) = parse_bindings(script.as_str()).unwrap();
        assert_eq!(env_name, RESULT_PATH_ENV);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].xgid, requests[0].xgid().as_str());
        assert!(parsed[0].cubeful);
        assert_eq!(parsed[1].xgid, "XGID=-a-BBBB-----cD--b-cbbcb-A-:1:1:1:00:0:0:0:0:10");
        assert_eq!(parsed[1].plies, 2);
        assert_eq!(parsed[1].cube_plies, 1);
        assert!(!parsed[1].cubeful);
    }

    #[test]
    fn test_cubeful_flag_stays_inside_the_string_literal() {
        let script = EngineScript::build(&[request(
            "XGID=-b----E-C---eE---c-e----B-:0:0:1:61:0:0:0:0:10",
            AnalysisParams::default(),
        )]);
        let line = script.as_str().lines().nth(1).unwrap();
        let literal = line
            .strip_prefix(REQUESTS_LINE)
            .and_then(|rest| rest.strip_suffix(")"))
            .unwrap();

        // A bare JSON `true` would be a NameError in Python.
        assert!(literal.starts_with('"') && literal.ends_with('"'));
        let json: String = serde_json::from_str(literal).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded[0]["cubeful"], true);
        assert_eq!(decoded[0]["plies"], 3);
    }

    #[test]
    fn test_parse_bindings_missing() {
        assert!(parse_bindings("set confirm new off\nquit\n").is_none());
        assert!(parse_bindings("> import json; REQUESTS = json.loads(\"[\")\nquit\n").is_none());
    }
}
