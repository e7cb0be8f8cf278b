//! Analysis results returned to callers.

use serde::{Deserialize, Serialize};
use xgid_core::Xgid;

use crate::hint;

/// Game outcome probabilities from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub win: f64,
    pub win_gammon: f64,
    pub win_backgammon: f64,
    pub lose: f64,
    pub lose_gammon: f64,
    pub lose_backgammon: f64,
}

/// One ranked chequer play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMove {
    /// 1-based rank, 1 being the engine's choice.
    pub rank: u32,
    /// Move in gnubg notation (e.g. `"24/18 13/10"`).
    pub play: String,
    /// Evaluator label (e.g. `"Cubeful 2-ply"`).
    pub evaluator: String,
    pub equity: f64,
    /// Equity relative to the best move (zero or negative).
    pub equity_loss: f64,
    pub probabilities: Option<Probabilities>,
}

/// One cube action with its cubeful equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeOption {
    /// Action label (e.g. `"No double"`, `"Double, take"`).
    pub label: String,
    pub equity: f64,
    /// Equity relative to the best action, when the engine prints it.
    pub equity_loss: Option<f64>,
}

/// Cube decision for a position where the dice have not been rolled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeDecision {
    pub cubeless_equity: Option<f64>,
    pub options: Vec<CubeOption>,
    pub proper_action: Option<String>,
}

/// Raw engine output for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub hint: String,
    pub eval: String,
}

/// The analysis of one position.
///
/// Structured fields are parsed from the engine transcript on a best-effort
/// basis; output the parser does not recognise leaves them empty while the
/// transcript is always kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub xgid: Xgid,
    pub moves: Vec<CandidateMove>,
    pub cube: Option<CubeDecision>,
    pub transcript: Transcript,
}

impl AnalysisResult {
    /// Builds a result from the engine transcript of `xgid`.
    pub fn from_transcript(xgid: Xgid, hint: String, eval: String) -> Self {
        let moves = hint::parse_moves(&hint);
        let cube = hint::parse_cube(&hint);
        Self {
            xgid,
            moves,
            cube,
            transcript: Transcript { hint, eval },
        }
    }

    /// Returns the engine's preferred play, if any was parsed.
    pub fn best_move(&self) -> Option<&CandidateMove> {
        self.moves.first()
    }
}

/// One entry of the document the engine writes to the result channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPositionReport {
    pub xgid: String,
    pub hint: String,
    pub eval: String,
}
