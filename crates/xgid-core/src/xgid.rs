//! XGID (eXtreme Gammon ID) identifiers.
//!
//! An XGID encodes a backgammon board plus game state as ten `:`-separated
//! fields. This module does not decode the board; it checks the identifier
//! is well formed and safe to hand to an analysis engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when validating XGID strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum XgidError {
    #[error("empty XGID")]
    Empty,

    #[error("invalid XGID: expected 10 fields, got {0}")]
    InvalidFieldCount(usize),

    #[error("invalid XGID character '{0}'")]
    InvalidCharacter(char),

    #[error("invalid board field: {0}")]
    InvalidBoard(String),

    #[error("invalid XGID field {index}: '{value}'")]
    InvalidField { index: usize, value: String },
}

/// A validated XGID in canonical form (always `XGID=`-prefixed).
///
/// The identifier is otherwise opaque: two requests for the same position
/// compare equal only if their canonical strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Xgid(String);

impl Xgid {
    /// The prefix every canonical XGID carries.
    pub const PREFIX: &'static str = "XGID=";

    /// Number of `:`-separated fields in an XGID body.
    pub const FIELD_COUNT: usize = 10;

    /// Length of the board field (24 points plus two bars).
    pub const BOARD_LEN: usize = 26;

    /// Index of the dice field.
    const DICE_FIELD: usize = 4;

    /// Validates an XGID string, accepting it with or without the `XGID=` prefix.
    pub fn parse(input: &str) -> Result<Self, XgidError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix(Self::PREFIX).unwrap_or(trimmed);

        if body.is_empty() {
            return Err(XgidError::Empty);
        }

        // The identifier ends up inside an engine script, so anything that
        // could terminate a string literal or a command line is rejected here.
        if let Some(c) = body
            .chars()
            .find(|c| !c.is_ascii_graphic() || matches!(c, '"' | '\'' | '\\' | '`'))
        {
            return Err(XgidError::InvalidCharacter(c));
        }

        let fields: Vec<&str> = body.split(':').collect();
        if fields.len() != Self::FIELD_COUNT {
            return Err(XgidError::InvalidFieldCount(fields.len()));
        }

        Self::validate_board(fields[0])?;

        for (index, field) in fields.iter().enumerate().skip(1) {
            let valid = !field.is_empty()
                && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(XgidError::InvalidField {
                    index,
                    value: field.to_string(),
                });
            }
        }

        Ok(Self(format!("{}{}", Self::PREFIX, body)))
    }

    fn validate_board(board: &str) -> Result<(), XgidError> {
        if board.len() != Self::BOARD_LEN {
            return Err(XgidError::InvalidBoard(format!(
                "expected {} characters, got {}",
                Self::BOARD_LEN,
                board.len()
            )));
        }
        if let Some(c) = board
            .chars()
            .find(|c| !matches!(c, '-' | 'a'..='o' | 'A'..='O'))
        {
            return Err(XgidError::InvalidBoard(format!("invalid checker code '{}'", c)));
        }
        Ok(())
    }

    /// Returns the canonical string, including the `XGID=` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier without the `XGID=` prefix.
    pub fn body(&self) -> &str {
        &self.0[Self::PREFIX.len()..]
    }

    /// Returns the raw dice field (`"00"` when the dice are not rolled yet).
    pub fn dice(&self) -> &str {
        self.body()
            .split(':')
            .nth(Self::DICE_FIELD)
            .unwrap_or_default()
    }

    /// Returns true when the position is a chequer-play decision.
    ///
    /// Unrolled dice or a pending double (`D`, `B`, `R`) make it a cube decision.
    pub fn dice_rolled(&self) -> bool {
        let dice = self.dice();
        dice.len() == 2 && dice != "00" && dice.chars().all(|c| ('1'..='6').contains(&c))
    }
}

impl fmt::Display for Xgid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Xgid {
    type Err = XgidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Xgid {
    type Error = XgidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Xgid> for String {
    fn from(xgid: Xgid) -> Self {
        xgid.0
    }
}

impl AsRef<str> for Xgid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
