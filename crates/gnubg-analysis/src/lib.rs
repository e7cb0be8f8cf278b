//! Backgammon position analysis with GNU Backgammon.
//!
//! This crate runs the external `gnubg` engine as a subprocess per position
//! (or per batch of positions) and returns structured results, safely and
//! in order, when many positions are analysed concurrently.
//!
//! # Overview
//!
//! - [`EngineLocator`] - Finds the console build of the engine
//! - [`ResultChannel`] - Per-invocation temporary file the engine writes its result to
//! - [`AnalysisEngine`] - One bounded engine invocation per call
//! - [`Coordinator`] - Runs a batch across a pool of worker slots
//! - [`AnalysisConfig`] - `analysis.toml` settings
//!
//! # Example
//!
//! ```ignore
//! use gnubg_analysis::{AnalysisConfig, EngineLocator};
//!
//! let config = AnalysisConfig::load()?;
//! let coordinator = config.coordinator(&config.locator())?;
//! let report = coordinator.analyze_all(requests).await?;
//! println!("{} of {} positions analysed", report.succeeded(), report.len());
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod hint;
pub mod locator;
pub mod result;
pub mod script;

pub use channel::{ResultChannel, RESULT_PATH_ENV};
pub use config::{AnalysisConfig, ConfigError};
pub use coordinator::{BatchReport, Coordinator, PositionOutcome};
pub use engine::AnalysisEngine;
pub use error::{AnalysisError, FailureKind};
pub use locator::{EngineLocator, Platform};
pub use result::{AnalysisResult, CandidateMove, CubeDecision, CubeOption, Probabilities, Transcript};
