//! Parser for gnubg `hint` output.
//!
//! gnubg prints chequer-play hints as ranked entries:
//!
//! ```text
//!     1. Cubeful 2-ply    24/18 13/10                  Eq.:  +0.123
//!        0.530 0.150 0.008 - 0.470 0.127 0.005
//!     2. Cubeful 2-ply    13/10 13/7                   Eq.:  +0.100 ( -0.023)
//! ```
//!
//! and cube hints as a "Cube analysis" block:
//!
//! ```text
//! Cube analysis
//! 2-ply cubeless equity  +0.082
//!   0.533 0.143 0.006 - 0.467 0.120 0.004
//! Cubeful equities:
//! 1. No double            +0.153
//! 2. Double, pass         +1.000  ( +0.847)
//! 3. Double, take         -0.070  ( -0.223)
//! Proper cube action: No double, take (22.8%)
//! ```
//!
//! Parsing is lenient: lines that do not fit either shape are skipped.

use crate::result::{CandidateMove, CubeDecision, CubeOption, Probabilities};

const EQUITY_MARKER: &str = "Eq.:";
const CUBE_HEADER: &str = "Cube analysis";
const CUBEFUL_HEADER: &str = "Cubeful equities:";
const PROPER_ACTION: &str = "Proper cube action:";

/// Extracts the ranked chequer plays from hint output.
pub fn parse_moves(text: &str) -> Vec<CandidateMove> {
    let mut moves: Vec<CandidateMove> = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(mut candidate) = parse_move_line(line) else {
            continue;
        };

        if let Some(next) = lines.peek() {
            if let Some(probs) = parse_probabilities(next) {
                candidate.probabilities = Some(probs);
                lines.next();
            }
        }
        moves.push(candidate);
    }

    // Fill in losses gnubg left implicit (the top entry, or older formats).
    if let Some(best) = moves.first().map(|m| m.equity) {
        for m in moves.iter_mut() {
            if m.equity_loss.is_nan() {
                m.equity_loss = m.equity - best;
            }
        }
    }

    moves
}

/// Extracts the cube decision from hint output, if there is one.
pub fn parse_cube(text: &str) -> Option<CubeDecision> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| *l != CUBE_HEADER);
    lines.next()?;

    let mut decision = CubeDecision {
        cubeless_equity: None,
        options: Vec::new(),
        proper_action: None,
    };
    let mut in_options = false;

    for line in lines {
        if line == CUBEFUL_HEADER {
            in_options = true;
        } else if let Some(action) = line.strip_prefix(PROPER_ACTION) {
            decision.proper_action = Some(action.trim().to_string());
            break;
        } else if in_options {
            if let Some(option) = parse_cube_option(line) {
                decision.options.push(option);
            }
        } else if decision.cubeless_equity.is_none() && line.contains("cubeless equity") {
            decision.cubeless_equity = line
                .split_whitespace()
                .skip_while(|t| *t != "equity")
                .nth(1)
                .and_then(parse_signed);
        }
    }

    Some(decision)
}

fn parse_move_line(line: &str) -> Option<CandidateMove> {
    let (head, tail) = line.split_once(EQUITY_MARKER)?;
    let (rank, rest) = split_rank(head)?;

    let mut fields = split_columns(rest);
    if fields.len() < 2 {
        return None;
    }
    let evaluator = fields.remove(0).to_string();
    let play = fields.join(" ");

    let (equity, loss) = parse_equity_pair(tail)?;

    Some(CandidateMove {
        rank,
        play,
        evaluator,
        equity,
        equity_loss: loss.unwrap_or(f64::NAN),
        probabilities: None,
    })
}

fn parse_cube_option(line: &str) -> Option<CubeOption> {
    let (_, rest) = split_rank(line)?;
    let fields = split_columns(rest);
    let (label, numbers) = fields.split_first()?;
    let (equity, loss) = parse_equity_pair(&numbers.join(" "))?;

    Some(CubeOption {
        label: label.to_string(),
        equity,
        equity_loss: loss,
    })
}

/// Parses `"0.530 0.150 0.008 - 0.470 0.127 0.005"`.
fn parse_probabilities(line: &str) -> Option<Probabilities> {
    let values: Vec<f64> = line
        .split_whitespace()
        .filter(|t| *t != "-")
        .map(|t| t.parse::<f64>().ok())
        .collect::<Option<_>>()?;

    match values.as_slice() {
        &[win, win_gammon, win_backgammon, lose, lose_gammon, lose_backgammon] => {
            Some(Probabilities {
                win,
                win_gammon,
                win_backgammon,
                lose,
                lose_gammon,
                lose_backgammon,
            })
        }
        _ => None,
    }
}

/// Splits `"  3. rest"` into `(3, "rest")`.
fn split_rank(line: &str) -> Option<(u32, &str)> {
    let (rank, rest) = line.trim_start().split_once(". ")?;
    let rank = rank.parse().ok()?;
    Some((rank, rest))
}

/// Splits on runs of two or more spaces, the column separator in gnubg tables.
fn split_columns(s: &str) -> Vec<&str> {
    s.split("  ")
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

/// Parses `"+0.100 ( -0.023)"` into the equity and optional difference.
fn parse_equity_pair(s: &str) -> Option<(f64, Option<f64>)> {
    let mut tokens = s.split_whitespace();
    let equity = parse_signed(tokens.next()?)?;

    let rest: String = tokens.collect::<Vec<_>>().join(" ");
    let loss = rest
        .strip_prefix('(')
        .and_then(|r| r.split(')').next())
        .and_then(|r| parse_signed(r.trim()));

    Some((equity, loss))
}

fn parse_signed(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
