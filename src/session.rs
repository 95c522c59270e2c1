//! One read-eval-print cycle per input line.
//!
//! A [`Session`] owns the arena and the global environment for its whole
//! lifetime. Every datum on a line is read, evaluated and printed in turn:
//!
//! ```
//! use cellscheme::session::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! let outcomes = session.process_line("(define x 5) x (set! y 1)");
//! let lines: Vec<String> = outcomes.iter().map(ToString::to_string).collect();
//! assert_eq!(lines, ["5", "5", "eval failed: Undefined symbol: y"]);
//! ```
//!
//! A datum that fails to evaluate does not stop the line; one that fails to
//! read does, since there is no way to tell where the next datum starts.

use std::fmt;

use tracing::debug;

use crate::Error;
use crate::arena::{Arena, ValueRef};
use crate::evaluator::{BindingMode, eval_with_mode};
use crate::printer::print;
use crate::reader::{ParseConfig, read_at};
use crate::symbols::Environment;

/// Arena size used when none is configured
pub const DEFAULT_ARENA_CELLS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Total arena cells, the reserved cell included
    pub arena_cells: usize,
    pub parse: ParseConfig,
    pub binding_mode: BindingMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            arena_cells: DEFAULT_ARENA_CELLS,
            parse: ParseConfig::default(),
            binding_mode: BindingMode::default(),
        }
    }
}

/// Result of one datum on an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The printed result
    Value(String),
    /// Reading stopped; `rest` is the unread text from the failure onward
    ReadFailed { rest: String, error: Error },
    EvalFailed(Error),
}

impl fmt::Display for LineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LineOutcome::Value(text) => write!(f, "{text}"),
            LineOutcome::ReadFailed { rest, .. } => write!(f, "failed reading at: {rest}"),
            LineOutcome::EvalFailed(error) => write!(f, "eval failed: {error}"),
        }
    }
}

pub struct Session {
    arena: Arena,
    env: Environment,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, Error> {
        Ok(Session {
            arena: Arena::new(config.arena_cells)?,
            env: Environment::new(),
            config,
        })
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Read, evaluate and print every datum on `line`
    pub fn process_line(&mut self, line: &str) -> Vec<LineOutcome> {
        let mut outcomes = Vec::new();
        let mut pos = 0;
        loop {
            match read_at(line, pos, &mut self.arena, self.config.parse) {
                Ok(None) => break,
                Ok(Some((expr, end))) => {
                    pos = end;
                    outcomes.push(self.eval_and_print(expr));
                }
                Err(error) => {
                    let rest = match &error {
                        Error::ParseError(e) => e.found.clone().unwrap_or_default(),
                        _ => line.get(pos..).unwrap_or("").trim_start().to_owned(),
                    };
                    debug!(%error, offset = line.len() - rest.len(), "read failed");
                    outcomes.push(LineOutcome::ReadFailed { rest, error });
                    break;
                }
            }
        }
        debug!(
            outcomes = outcomes.len(),
            cells_used = self.arena.used(),
            "processed line"
        );
        outcomes
    }

    fn eval_and_print(&mut self, expr: ValueRef) -> LineOutcome {
        let printed = eval_with_mode(expr, &self.arena, &mut self.env, self.config.binding_mode)
            .and_then(|value| print(&self.arena, value));
        match printed {
            Ok(text) => LineOutcome::Value(text),
            Err(error) => {
                debug!(%error, "eval failed");
                LineOutcome::EvalFailed(error)
            }
        }
    }

    /// The interactive prompt: the index of the next free cell
    pub fn prompt(&self) -> String {
        format!("{} cells> ", self.arena.cursor())
    }

    pub fn cells_used(&self) -> usize {
        self.arena.used()
    }

    /// Every binding with its value printed, sorted by name
    pub fn bindings(&self) -> Vec<(String, String)> {
        self.env
            .get_all_bindings()
            .into_iter()
            .map(|(name, value)| {
                let printed = print(&self.arena, value).unwrap_or_else(|e| format!("<{e}>"));
                (name, printed)
            })
            .collect()
    }
}
