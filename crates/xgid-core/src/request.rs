//! Analysis requests submitted for a single position.

use crate::Xgid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest lookahead the analysis engine accepts.
pub const MAX_PLIES: u8 = 7;

/// Errors raised when analysis parameters are out of range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("chequer-play plies must be at most {max}, got {0}", max = MAX_PLIES)]
    Plies(u8),

    #[error("cube-decision plies must be at most {max}, got {0}", max = MAX_PLIES)]
    CubePlies(u8),
}

/// Engine settings used for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Lookahead for chequer-play evaluation. Defaults to 3.
    #[serde(default = "default_plies")]
    pub plies: u8,
    /// Lookahead for cube-decision evaluation. Defaults to 3.
    #[serde(default = "default_plies")]
    pub cube_plies: u8,
    /// Evaluate chequer play cubefully. Defaults to true.
    #[serde(default = "default_cubeful")]
    pub cubeful: bool,
}

fn default_plies() -> u8 {
    3
}

fn default_cubeful() -> bool {
    true
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            plies: default_plies(),
            cube_plies: default_plies(),
            cubeful: default_cubeful(),
        }
    }
}

impl AnalysisParams {
    /// Checks that both lookahead depths are within the engine's range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.plies > MAX_PLIES {
            return Err(ParamsError::Plies(self.plies));
        }
        if self.cube_plies > MAX_PLIES {
            return Err(ParamsError::CubePlies(self.cube_plies));
        }
        Ok(())
    }
}

/// A position to analyse together with the settings to analyse it with.
///
/// Requests are immutable once built; the coordinator hands them back
/// unchanged next to their outcome. Deserialization applies the same range
/// checks as [`PositionRequest::with_params`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPositionRequest")]
pub struct PositionRequest {
    xgid: Xgid,
    params: AnalysisParams,
}

#[derive(Deserialize)]
struct RawPositionRequest {
    xgid: Xgid,
    #[serde(default)]
    params: AnalysisParams,
}

impl TryFrom<RawPositionRequest> for PositionRequest {
    type Error = ParamsError;

    fn try_from(raw: RawPositionRequest) -> Result<Self, Self::Error> {
        Self::with_params(raw.xgid, raw.params)
    }
}

impl PositionRequest {
    /// Creates a request with default analysis parameters.
    pub fn new(xgid: Xgid) -> Self {
        Self {
            xgid,
            params: AnalysisParams::default(),
        }
    }

    /// Creates a request with explicit parameters.
    pub fn with_params(xgid: Xgid, params: AnalysisParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { xgid, params })
    }

    pub fn xgid(&self) -> &Xgid {
        &self.xgid
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }
}
