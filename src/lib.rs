//! cellscheme - a minimal symbolic-expression engine over a packed cell arena
//!
//! Every value lives in an append-only [`arena::Arena`] of 64-bit cells. A value
//! is a tag in the low bits of its root cell plus a payload that may spill into
//! the following cells:
//!
//! ```text
//! 42          ; integer, one cell
//! "hi"        ; string, one header cell + one payload cell
//! foo         ; symbol, same layout as a string
//! ()          ; empty list, one cell
//! (a b)       ; pairs, two cells each: (a . (b . ()))
//! (a . b)     ; dotted pair
//! ```
//!
//! The reader turns text into arena values, the printer renders them back, and
//! the evaluator understands exactly three special forms:
//!
//! ```scheme
//! (define x 5)     ; bind x
//! (set! x "five")  ; rebind an existing name
//! (quote (1 2))    ; return the operand unevaluated
//! ```
//!
//! The arena never reclaims cells. A failed line leaves whatever it allocated
//! behind, unreferenced.
//!
//! ## Modules
//!
//! - `codec`: bit layout of cells and the decoded [`codec::Value`] view
//! - `arena`: bump allocation and per-kind constructors/accessors
//! - `reader`: text to arena values
//! - `printer`: arena values to text
//! - `symbols`: the name to value binding table
//! - `forms`: the special form registry
//! - `evaluator`: kind dispatch and special form evaluation
//! - `session`: one read-eval-print cycle per input line

use std::fmt;

/// Maximum nesting of explicit parentheses accepted by the reader
pub const MAX_PARSE_DEPTH: usize = 256;

/// Maximum evaluation depth. Only reachable through nested special forms
/// when right-hand sides are evaluated before binding.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// No token recognized at the current position, or a missing `)` after a dotted tail
    InvalidSyntax,
    /// Input ended before the expression was complete (unterminated string, unclosed parens)
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
    /// Implementation-imposed limit exceeded (integer width)
    ImplementationLimit,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Byte offset into the input at which reading stopped
    pub offset: usize,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The unparsed remainder of the input, starting at `offset`
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with context and the unparsed remainder extracted
    /// from `input` at `offset`
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }

        // Show some context before the error, without splitting a character
        let mut context_start = offset.saturating_sub(20);
        while !input.is_char_boundary(context_start) {
            context_start -= 1;
        }

        let context_str: String = input[context_start..].chars().take(MAX_CONTEXT).collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        // Replace newlines with visible markers for better error display
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        ParseError {
            kind,
            message: message.into(),
            offset,
            context: Some(display_context),
            found: Some(input[offset..].to_owned()),
        }
    }
}

/// Error types for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input text
    ParseError(ParseError),
    /// The arena cannot fit the requested number of cells
    ArenaExhausted { requested: usize, available: usize },
    /// An arena was configured outside the addressable range
    InvalidCapacity { requested: usize, limit: usize },
    /// A string or symbol exceeds the header's length fields
    TextTooLong(usize),
    /// A reference that does not point at the root cell of a value
    InvalidReference(u32),
    /// Symbol lookup failed
    UndefinedSymbol(String),
    /// Arity or shape violation in `define`, `set!` or `quote`
    MalformedSpecialForm { form: String, reason: String },
    /// An evaluated pair whose car is not a symbol or whose cdr is not a pair
    StructuralTypeError(String),
    /// A pair headed by a symbol that names no special form
    UnsupportedForm(String),
    /// Evaluation limits (depth)
    EvalError(String),
}

impl Error {
    pub(crate) fn malformed(form: &str, reason: impl Into<String>) -> Self {
        Error::MalformedSpecialForm {
            form: form.to_owned(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::ArenaExhausted {
                requested,
                available,
            } => write!(
                f,
                "ArenaExhausted: out of cells (requested {requested}, {available} available)"
            ),
            Error::InvalidCapacity { requested, limit } => write!(
                f,
                "InvalidCapacity: arena of {requested} cells is outside 2..={limit}"
            ),
            Error::TextTooLong(len) => write!(f, "TextTooLong: {len} bytes do not fit a text header"),
            Error::InvalidReference(index) => write!(f, "InvalidReference: no value at cell {index}"),
            Error::UndefinedSymbol(name) => write!(f, "Undefined symbol: {name}"),
            Error::MalformedSpecialForm { form, reason } => {
                write!(f, "Malformed {form}: {reason}")
            }
            Error::StructuralTypeError(msg) => write!(f, "Type error: {msg}"),
            Error::UnsupportedForm(name) => write!(f, "Unsupported form: {name}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

pub mod arena;
pub mod codec;
pub mod evaluator;
pub mod forms;
pub mod printer;
pub mod reader;
pub mod session;
pub mod symbols;
