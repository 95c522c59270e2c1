//! Reader: text to arena values.
//!
//! Lexemes (integers, strings, symbols, the dotted-pair marker) are nom
//! parsers. List structure is hand-written: `read_datum` reads one complete
//! value and `read_list` reads everything after an opening parenthesis.
//! Only explicit parentheses count towards [`MAX_PARSE_DEPTH`]; the elements
//! of one list are read in a loop.
//!
//! A parenthesized single value is not a list: `(a)` reads as `a`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{opt, peek, recognize, value},
    sequence::{delimited, pair, terminated},
};
use tracing::trace;

use crate::arena::{Arena, ValueRef};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseConfig {
    /// Accept `#t` and `#f` as Boolean literals
    pub boolean_literals: bool,
}

/// Whitespace as C's `isspace` defines it
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Characters that may start an identifier
fn is_initial(c: char) -> bool {
    c.is_ascii_lowercase() || "!$%&*/:<=>?^_~".contains(c)
}

/// Characters that may continue an identifier
fn is_subsequent(c: char) -> bool {
    is_initial(c) || c.is_ascii_digit() || "+-.@".contains(c)
}

fn skip_space(input: &str) -> &str {
    input.trim_start_matches(is_space)
}

/// Optional sign followed by decimal digits; the longest such prefix
fn parse_integer(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), digit1)).parse(input)
}

fn parse_boolean(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag("#t")), value(false, tag("#f")))).parse(input)
}

/// Raw bytes between double quotes; no escape processing
fn parse_string(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c: char| c == '"'), char('"')).parse(input)
}

/// `+`/`-` alone or followed by subsequent characters, the ellipsis, or a
/// regular identifier
fn parse_symbol(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(one_of("+-"), take_while(is_subsequent))),
        tag("..."),
        recognize(pair(satisfy(is_initial), take_while(is_subsequent))),
    ))
    .parse(input)
}

/// A `.` immediately followed by whitespace
fn parse_dot_marker(input: &str) -> IResult<&str, char> {
    terminated(char('.'), peek(satisfy(is_space))).parse(input)
}

struct Reader<'a, 'r> {
    source: &'a str,
    arena: &'r mut Arena,
    config: ParseConfig,
}

impl<'a> Reader<'a, '_> {
    fn error(&self, kind: ParseErrorKind, message: impl Into<String>, at: &str) -> Error {
        let offset = self.source.len() - at.len();
        Error::ParseError(ParseError::with_context(kind, message, self.source, offset))
    }

    /// Error for a position where no datum starts
    fn no_datum(&self, input: &'a str) -> Error {
        match input.chars().next() {
            None => self.error(ParseErrorKind::Incomplete, "Unexpected end of input", input),
            Some(')') => self.error(ParseErrorKind::InvalidSyntax, "Unexpected ')'", input),
            Some(_) => {
                let near: String = input.chars().take(10).collect();
                self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("Invalid syntax near '{near}'"),
                    input,
                )
            }
        }
    }

    /// Read one complete value
    fn read_datum(&mut self, input: &'a str, depth: usize) -> Result<(&'a str, ValueRef), Error> {
        let input = skip_space(input);
        if let Some(rest) = input.strip_prefix('(') {
            if depth >= MAX_PARSE_DEPTH {
                return Err(self.error(
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    input,
                ));
            }
            return self.read_list(rest, depth + 1);
        }
        self.read_atom(input)
    }

    /// Read the elements of a list whose `(` has already been consumed,
    /// through the closing `)`.
    ///
    /// Elements are allocated as they are read. The spine is linked
    /// afterwards from the last pair back to the first, so `(a b c)` becomes
    /// `(a . (b . (c . ())))` and a long list costs no stack.
    fn read_list(&mut self, input: &'a str, depth: usize) -> Result<(&'a str, ValueRef), Error> {
        let mut elements: Vec<ValueRef> = Vec::new();
        let mut input = input;
        let (input, tail) = loop {
            input = skip_space(input);
            if let Some(rest) = input.strip_prefix(')') {
                // a parenthesized single value is the value itself
                if let [only] = elements[..] {
                    return Ok((rest, only));
                }
                break (rest, self.arena.alloc_empty()?);
            }
            if input.is_empty() {
                return Err(self.error(
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input: unclosed list",
                    input,
                ));
            }

            if !elements.is_empty() && input == "." {
                return Err(self.error(
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input: unclosed dotted pair",
                    input,
                ));
            }
            if !elements.is_empty()
                && let Ok((rest, _)) = parse_dot_marker(input)
            {
                let (rest, tail) = self.read_datum(rest, depth)?;
                let rest = skip_space(rest);
                match rest.strip_prefix(')') {
                    Some(rest) => break (rest, tail),
                    None if rest.is_empty() => {
                        return Err(self.error(
                            ParseErrorKind::Incomplete,
                            "Unexpected end of input: unclosed dotted pair",
                            rest,
                        ));
                    }
                    None => {
                        return Err(self.error(
                            ParseErrorKind::InvalidSyntax,
                            "Expected ')' after the tail of a dotted pair",
                            rest,
                        ));
                    }
                }
            }

            let (rest, element) = self.read_datum(input, depth)?;
            elements.push(element);
            input = rest;
        };

        let mut list = tail;
        for element in elements.into_iter().rev() {
            list = self.arena.alloc_pair(element, list)?;
        }
        Ok((input, list))
    }

    fn read_atom(&mut self, input: &'a str) -> Result<(&'a str, ValueRef), Error> {
        if let Ok((rest, digits)) = parse_integer(input) {
            let n = digits.parse::<i32>().map_err(|_| {
                self.error(
                    ParseErrorKind::ImplementationLimit,
                    format!("Integer literal {digits} does not fit in 32 bits"),
                    input,
                )
            })?;
            return Ok((rest, self.arena.alloc_integer(n)?));
        }

        if self.config.boolean_literals
            && let Ok((rest, b)) = parse_boolean(input)
        {
            return Ok((rest, self.arena.alloc_boolean(b)?));
        }

        if input.starts_with('"') {
            return match parse_string(input) {
                Ok((rest, text)) => Ok((rest, self.arena.alloc_string(text.as_bytes())?)),
                Err(_) => Err(self.error(
                    ParseErrorKind::Incomplete,
                    "Unterminated string literal",
                    input,
                )),
            };
        }

        if let Ok((rest, name)) = parse_symbol(input) {
            return Ok((rest, self.arena.alloc_symbol(name.as_bytes())?));
        }

        Err(self.no_datum(input))
    }
}

/// Read one value starting at byte offset `pos` of `source`.
///
/// Returns the value and the offset just past it, or `None` when only
/// whitespace remains. Cells allocated before a failure stay allocated.
pub fn read_at(
    source: &str,
    pos: usize,
    arena: &mut Arena,
    config: ParseConfig,
) -> Result<Option<(ValueRef, usize)>, Error> {
    let input = skip_space(source.get(pos..).unwrap_or(""));
    if input.is_empty() {
        return Ok(None);
    }
    trace!(offset = source.len() - input.len(), "reading datum");

    let mut reader = Reader {
        source,
        arena,
        config,
    };
    let (rest, value) = reader.read_datum(input, 0)?;
    Ok(Some((value, source.len() - rest.len())))
}

/// Read one value, returning it with the unread remainder of `input`
pub fn read<'a>(input: &'a str, arena: &mut Arena) -> Result<(ValueRef, &'a str), Error> {
    read_with_config(input, arena, ParseConfig::default())
}

pub fn read_with_config<'a>(
    input: &'a str,
    arena: &mut Arena,
    config: ParseConfig,
) -> Result<(ValueRef, &'a str), Error> {
    match read_at(input, 0, arena, config)? {
        Some((value, end)) => Ok((value, &input[end..])),
        None => Err(Error::ParseError(ParseError::with_context(
            ParseErrorKind::Incomplete,
            "Unexpected end of input",
            input,
            input.len(),
        ))),
    }
}

/// Read exactly one value; anything but whitespace after it is an error
pub fn read_one(input: &str, arena: &mut Arena) -> Result<ValueRef, Error> {
    let (value, rest) = read(input, arena)?;
    let rest = skip_space(rest);
    if rest.is_empty() {
        Ok(value)
    } else {
        Err(Error::ParseError(ParseError::with_context(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{rest}'"),
            input,
            input.len() - rest.len(),
        )))
    }
}

/// Read every value in `input`, in order
pub fn read_all(input: &str, arena: &mut Arena, config: ParseConfig) -> Result<Vec<ValueRef>, Error> {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some((value, end)) = read_at(input, pos, arena, config)? {
        values.push(value);
        pos = end;
    }
    Ok(values)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::arena::Value;
    use crate::printer::print;

    /// Test result variants for data-driven reader tests
    #[derive(Debug)]
    enum ReadTestResult {
        /// Reading succeeds and printing the value gives this text
        Prints(&'static str),
        /// Reading fails with this kind of parse error
        Fails(ParseErrorKind),
    }
    use ReadTestResult::*;

    fn run_read_tests(test_cases: Vec<(&str, ReadTestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Read test #{} ({input:?})", i + 1);
            let mut arena = Arena::new(1024).unwrap();
            let result = read_one(input, &mut arena);

            match (result, expected) {
                (Ok(value), Prints(text)) => {
                    let printed = print(&arena, value).unwrap();
                    assert_eq!(printed, *text, "{test_id}: printed form mismatch");
                }
                (Err(Error::ParseError(err)), Fails(kind)) => {
                    assert_eq!(err.kind, *kind, "{test_id}: error kind mismatch: {err:?}");
                }
                (Ok(value), Fails(kind)) => {
                    let printed = print(&arena, value).unwrap();
                    panic!("{test_id}: expected {kind:?}, read {printed}");
                }
                (Err(err), _) => panic!("{test_id}: unexpected error {err:?}"),
            }
        }
    }

    #[test]
    fn test_reader_comprehensive() {
        let test_cases = vec![
            // ===== INTEGERS =====
            ("42", Prints("42")),
            ("-5", Prints("-5")),
            ("+7", Prints("7")),
            ("0", Prints("0")),
            ("-0", Prints("0")),
            ("007", Prints("7")),
            ("2147483647", Prints("2147483647")),
            ("-2147483648", Prints("-2147483648")),
            ("2147483648", Fails(ParseErrorKind::ImplementationLimit)),
            ("-99999999999", Fails(ParseErrorKind::ImplementationLimit)),
            // ===== STRINGS =====
            ("\"hello world\"", Prints("\"hello world\"")),
            ("\"\"", Prints("\"\"")),
            // no escape processing in either direction
            (r#""back\slash\n""#, Prints(r#""back\slash\n""#)),
            ("\"(not a list)\"", Prints("\"(not a list)\"")),
            ("\"ünïcödé\"", Prints("\"ünïcödé\"")),
            ("\"unterminated", Fails(ParseErrorKind::Incomplete)),
            ("\"", Fails(ParseErrorKind::Incomplete)),
            // ===== SYMBOLS =====
            ("foo", Prints("foo")),
            ("set!", Prints("set!")),
            ("a.b@c+1", Prints("a.b@c+1")),
            ("<=?", Prints("<=?")),
            ("+", Prints("+")),
            ("-", Prints("-")),
            ("-abc", Prints("-abc")),
            ("->x", Prints("->x")),
            ("...", Prints("...")),
            ("Foo", Fails(ParseErrorKind::InvalidSyntax)),
            ("@x", Fails(ParseErrorKind::InvalidSyntax)),
            (".5", Fails(ParseErrorKind::InvalidSyntax)),
            // booleans are off by default
            ("#t", Fails(ParseErrorKind::InvalidSyntax)),
            // ===== EMPTY LIST =====
            ("()", Prints("()")),
            ("(   )", Prints("()")),
            ("(\t\n)", Prints("()")),
            // ===== ONE-ELEMENT SUGAR =====
            ("(a)", Prints("a")),
            ("((a))", Prints("a")),
            ("( 42 )", Prints("42")),
            ("(())", Prints("()")),
            // ===== PROPER LISTS =====
            ("(a b)", Prints("(a b)")),
            ("(a b c)", Prints("(a b c)")),
            ("  ( a\t b \n c )  ", Prints("(a b c)")),
            ("(1 (2 3) \"x\")", Prints("(1 (2 3) \"x\")")),
            ("(() a)", Prints("(() a)")),
            ("(a ())", Prints("(a ())")),
            ("((a b) (c d))", Prints("((a b) (c d))")),
            ("(define x 5)", Prints("(define x 5)")),
            ("(a ... b)", Prints("(a ... b)")),
            // ===== DOTTED PAIRS =====
            ("(a . b)", Prints("(a . b)")),
            ("(a\t.\tb)", Prints("(a . b)")),
            ("(a b . c)", Prints("(a b . c)")),
            ("(1 . (2 3))", Prints("(1 2 3)")),
            // a pair with an empty tail prints as a one-element list
            ("(a . ())", Prints("(a)")),
            // no whitespace after the dot: part of a symbol, not a marker
            ("(a.b)", Prints("a.b")),
            ("(a .b)", Fails(ParseErrorKind::InvalidSyntax)),
            ("(a . b c)", Fails(ParseErrorKind::InvalidSyntax)),
            ("( . a)", Fails(ParseErrorKind::InvalidSyntax)),
            // ===== UNBALANCED / EMPTY INPUT =====
            ("(a", Fails(ParseErrorKind::Incomplete)),
            ("(a b", Fails(ParseErrorKind::Incomplete)),
            ("((a b)", Fails(ParseErrorKind::Incomplete)),
            ("(a . b", Fails(ParseErrorKind::Incomplete)),
            ("(a .", Fails(ParseErrorKind::Incomplete)),
            ("(a b .", Fails(ParseErrorKind::Incomplete)),
            ("(a . ", Fails(ParseErrorKind::Incomplete)),
            ("(", Fails(ParseErrorKind::Incomplete)),
            (")", Fails(ParseErrorKind::InvalidSyntax)),
            ("", Fails(ParseErrorKind::Incomplete)),
            ("   ", Fails(ParseErrorKind::Incomplete)),
            // ===== TRAILING CONTENT =====
            ("1 2", Fails(ParseErrorKind::TrailingContent)),
            ("(a b))", Fails(ParseErrorKind::TrailingContent)),
            ("12abc", Fails(ParseErrorKind::TrailingContent)),
        ];

        run_read_tests(test_cases);
    }

    #[test]
    fn test_list_structure() {
        let mut arena = Arena::new(64).unwrap();
        let list = read_one("(a b)", &mut arena).unwrap();

        let Value::Pair { car, cdr } = arena.get(list).unwrap() else {
            panic!("expected a pair");
        };
        assert_eq!(arena.get(car).unwrap(), Value::Symbol(b"a".to_vec()));
        let Value::Pair { car, cdr } = arena.get(cdr).unwrap() else {
            panic!("expected a pair");
        };
        assert_eq!(arena.get(car).unwrap(), Value::Symbol(b"b".to_vec()));
        assert_eq!(arena.get(cdr).unwrap(), Value::Empty);

        let dotted = read_one("(a . b)", &mut arena).unwrap();
        let Value::Pair { car, cdr } = arena.get(dotted).unwrap() else {
            panic!("expected a pair");
        };
        assert_eq!(arena.get(car).unwrap(), Value::Symbol(b"a".to_vec()));
        assert_eq!(arena.get(cdr).unwrap(), Value::Symbol(b"b".to_vec()));
    }

    #[test]
    fn test_single_element_sugar_returns_the_element() {
        let mut arena = Arena::new(64).unwrap();
        let (bare, _) = read("a", &mut arena).unwrap();
        let (wrapped, _) = read("(a)", &mut arena).unwrap();
        assert_eq!(arena.get(bare).unwrap(), arena.get(wrapped).unwrap());

        // the element is the value itself; no pair was allocated around it
        let before = arena.cursor();
        let (inner, _) = read("(7)", &mut arena).unwrap();
        assert_eq!(inner.index() as usize, before);
        assert_eq!(arena.cursor(), before + 1);
    }

    #[test]
    fn test_longest_integer_prefix() {
        let mut arena = Arena::new(64).unwrap();
        let (n, rest) = read("12abc", &mut arena).unwrap();
        assert_eq!(arena.get(n).unwrap(), Value::Integer(12));
        assert_eq!(rest, "abc");

        let (n, rest) = read("-3)", &mut arena).unwrap();
        assert_eq!(arena.get(n).unwrap(), Value::Integer(-3));
        assert_eq!(rest, ")");

        // a sign without digits is a symbol
        let (s, rest) = read("- 1", &mut arena).unwrap();
        assert_eq!(arena.get(s).unwrap(), Value::Symbol(b"-".to_vec()));
        assert_eq!(rest, " 1");
    }

    #[test]
    fn test_boolean_literals_when_enabled() {
        let config = ParseConfig {
            boolean_literals: true,
        };
        let mut arena = Arena::new(64).unwrap();
        let (t, _) = read_with_config("#t", &mut arena, config).unwrap();
        let (f, _) = read_with_config("#f", &mut arena, config).unwrap();
        assert_eq!(arena.get(t).unwrap(), Value::Boolean(true));
        assert_eq!(arena.get(f).unwrap(), Value::Boolean(false));

        let (list, _) = read_with_config("(#t 1 #f)", &mut arena, config).unwrap();
        assert_eq!(print(&arena, list).unwrap(), "(#t 1 #f)");
    }

    #[test]
    fn test_error_reports_position() {
        let mut arena = Arena::new(64).unwrap();
        let err = read("(a b @c)", &mut arena).unwrap_err();
        let Error::ParseError(err) = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
        assert_eq!(err.offset, 5);
        assert_eq!(err.found.as_deref(), Some("@c)"));
        assert!(err.message.contains("@c)"));
    }

    #[test]
    fn test_read_all_and_read_at() {
        let mut arena = Arena::new(256).unwrap();
        let values = read_all("1 (a b) \"s\"  x ", &mut arena, ParseConfig::default()).unwrap();
        let printed: Vec<_> = values.iter().map(|v| print(&arena, *v).unwrap()).collect();
        assert_eq!(printed, vec!["1", "(a b)", "\"s\"", "x"]);

        let source = "foo bar";
        let (first, end) = read_at(source, 0, &mut arena, ParseConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(print(&arena, first).unwrap(), "foo");
        assert_eq!(end, 3);
        let (second, end) = read_at(source, end, &mut arena, ParseConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(print(&arena, second).unwrap(), "bar");
        assert_eq!(read_at(source, end, &mut arena, ParseConfig::default()).unwrap(), None);
    }

    #[test]
    fn test_parser_depth_limits() {
        let mut arena = Arena::new(4096).unwrap();
        let at_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH),
            ")".repeat(MAX_PARSE_DEPTH)
        );
        let over_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH + 1),
            ")".repeat(MAX_PARSE_DEPTH + 1)
        );

        let value = read_one(&at_limit, &mut arena).unwrap();
        assert_eq!(print(&arena, value).unwrap(), "1");

        match read_one(&over_limit, &mut arena) {
            Err(Error::ParseError(err)) => {
                assert_eq!(err.kind, ParseErrorKind::TooDeeplyNested);
            }
            other => panic!("expected a depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_long_flat_list() {
        // list length is not nesting: only the two explicit parens count
        let elements = 100_000;
        let input = format!("(0{})", " x".repeat(elements - 1));
        let mut arena = Arena::new(elements * 4 + 16).unwrap();
        let list = read_one(&input, &mut arena).unwrap();

        let mut length = 0;
        let mut cursor = list;
        while let Some((_, cdr)) = arena.pair(cursor).unwrap() {
            length += 1;
            cursor = cdr;
        }
        assert_eq!(length, elements);
        assert_eq!(arena.get(cursor).unwrap(), Value::Empty);
    }

    #[test]
    fn test_arena_exhaustion_while_reading() {
        // "(a b)" needs 2 + 2 + 1 + 2 + 2 cells; only 6 are free
        let mut arena = Arena::new(7).unwrap();
        let err = read("(a b)", &mut arena).unwrap_err();
        assert!(matches!(err, Error::ArenaExhausted { requested: 2, .. }));
        assert!(arena.cursor() <= arena.capacity());

        // the cells of the failed read stay allocated
        assert_eq!(arena.cursor(), 6);
        let (n, _) = read("1", &mut arena).unwrap();
        assert_eq!(n.index(), 6);
    }
}
