/*!
Provides the common `Error` and `Result` types used by every public entry point.

Errors follow a fixed taxonomy: input, lexical, syntactic, encoding, format-mismatch and
unsupported-feature errors. Lexical and syntactic errors carry the [`Position`] (1-based
line and column) of the offending character. Warnings are collected separately, see
[`Warning`]; a warning is never fatal on its own.
*/

use std::fmt::{Display, Formatter};
use std::result::Result as StdResult;
use thiserror::Error;

use crate::detect::ContentType;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// A source position; `line` and `col` are 1-based and track physical position in the
/// input buffer, counting a tab as eight columns.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
}

///
/// The error type returned by all public parse and print entry points.
///
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The input buffer could not be used at all.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The tokenizer rejected the input.
    #[error("{pos}: {kind}")]
    Lex {
        /// What the tokenizer tripped over.
        kind: LexErrorKind,
        /// Where it happened.
        pos: Position,
    },

    /// The token stream did not match the XMQ grammar.
    #[error("{pos}: {kind}")]
    Syntax {
        /// What the parser expected and did not find.
        kind: SyntaxErrorKind,
        /// Where it happened.
        pos: Position,
    },

    /// A numeric character reference did not decode to a Unicode scalar value.
    #[error("character reference &{0}; is not a Unicode scalar value")]
    BadCharacterReference(String),

    /// The caller asserted one content type but the detector found another.
    #[error("expected {expected} content but found {found}")]
    FormatMismatch {
        /// What the caller asked for.
        expected: ContentType,
        /// What the detector saw.
        found: ContentType,
    },

    /// A reserved option that this implementation rejects at runtime.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An error reported by the XML reader while ingesting XML or HTML.
    #[cfg(feature = "quick_parser")]
    #[error("xml reader: {0}")]
    XmlReader(String),

    /// An error reported by the JSON reader while ingesting JSON.
    #[cfg(feature = "json_bridge")]
    #[error("json reader: {0}")]
    JsonReader(String),
}

///
/// Failures that prevent the input buffer from being scanned at all.
///
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// A UTF-16 byte order mark was found; only UTF-8 input is supported.
    #[error("a UTF-16 byte order mark was found, only UTF-8 input is supported")]
    Utf16ByteOrderMark,
    /// The buffer is not valid UTF-8.
    #[error("the input is not valid UTF-8")]
    InvalidUtf8,
}

///
/// Failures detected while producing tokens.
///
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A quote was opened but its closing run was never found.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// The closing quote run was longer than the opening run.
    #[error("too many quotes, the closing run is longer than the opening run")]
    TooManyQuotes,
    /// A `/* ... */` comment was never closed.
    #[error("unterminated comment")]
    UnterminatedComment,
    /// A `\` after a closing quote was not followed by a newline.
    #[error("expected a newline after the quote continuation backslash")]
    BadContinuation,
    /// An entity reference was not terminated by `;`.
    #[error("entity reference is missing the terminating semicolon")]
    UnterminatedEntity,
    /// A character that cannot start any token.
    #[error("unexpected character {0:?}")]
    StrayCharacter(char),
}

///
/// Failures detected while matching tokens against the grammar.
///
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A `}` with no `{` open.
    #[error("unexpected closing brace")]
    UnexpectedClosingBrace,
    /// A `)` with no `(` open.
    #[error("unexpected closing parenthesis")]
    UnexpectedClosingParen,
    /// A `{` or `(` that was never closed.
    #[error("missing closing {0:?}")]
    MissingClosing(char),
    /// More than one top-level element without an implicit root.
    #[error("multiple root elements are not allowed unless an implicit root is supplied")]
    MultipleRoots,
    /// A name that does not match the XMQ identifier grammar.
    #[error("{0:?} is not a valid name")]
    InvalidName(String),
    /// A value position held something other than text, quote, entity or compound.
    #[error("expected a value")]
    ExpectedValue,
    /// An attribute list held something other than an attribute key.
    #[error("expected an attribute name")]
    ExpectedAttributeName,
    /// Any other token out of place.
    #[error("unexpected {0}")]
    Unexpected(&'static str),
}

///
/// Conditions that were auto-corrected or judged suspicious during parsing; reported on
/// the [`Document`](crate::Document) but never fatal.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A quote ended flush against following text, which often means the quote count was
    /// wrong in the source.
    AmbiguousQuoting(Position),
}

///
/// The `Result` type used by every fallible function in this crate.
///
pub type Result<T> = StdResult<T, Error>;

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl Position {
    pub(crate) fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::AmbiguousQuoting(pos) => {
                write!(f, "{}: suspicious quote end, maybe quotes are needed here", pos)
            }
        }
    }
}

impl Error {
    pub(crate) fn lex(kind: LexErrorKind, pos: Position) -> Self {
        Error::Lex { kind, pos }
    }

    pub(crate) fn syntax(kind: SyntaxErrorKind, pos: Position) -> Self {
        Error::Syntax { kind, pos }
    }

    /// The source position attached to this error, when there is one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Lex { pos, .. } | Error::Syntax { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::lex(LexErrorKind::UnterminatedQuote, Position::new(3, 14));
        assert_eq!(err.to_string(), "3:14: unterminated quote");
        assert_eq!(err.position(), Some(Position::new(3, 14)));
    }

    #[test]
    fn test_mismatch_display() {
        let err = Error::FormatMismatch {
            expected: ContentType::Json,
            found: ContentType::Xml,
        };
        assert_eq!(err.to_string(), "expected json content but found xml");
    }
}
