//! Core types for backgammon position analysis.
//!
//! This crate provides the types shared by the analysis orchestrator and its
//! callers:
//! - [`Xgid`] for validated position identifiers
//! - [`AnalysisParams`] for engine lookahead settings
//! - [`PositionRequest`] pairing a position with its settings

mod request;
mod xgid;

pub use request::{AnalysisParams, ParamsError, PositionRequest, MAX_PLIES};
pub use xgid::{Xgid, XgidError};
