//! Error types for SQL parsing and lineage graph walking.
//!
//! [`ParseError`] means no graph could be built for a script: bad syntax, an
//! unknown dialect, or a statement without lineage semantics while silent
//! mode is off. [`GraphError`] means a graph exists but one traversal of it
//! could not finish; callers degrade only the view that needed it.
//!
//! Missing table metadata is never an error here. A [`crate::ColumnResolver`]
//! with nothing to say returns an empty list.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use sqlparser::parser::ParserError;
#[cfg(feature = "tracing")]
use tracing::trace;

use crate::dialect::Dialect;

/// What went wrong, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorKind {
    #[default]
    Syntax,
    /// The tokenizer rejected the input (unterminated string, stray byte).
    Tokenizer,
    /// The script ended in the middle of a statement.
    UnexpectedEof,
    /// Nesting went deeper than the parser allows.
    RecursionLimit,
    UnsupportedDialect,
    /// A statement with no lineage semantics while silent mode is off.
    UnsupportedStatement,
}

/// 1-based location reported by the SQL parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Finds sqlparser's `Line: N, Column: M` suffix in an error message.
    fn find_in(message: &str) -> Option<Self> {
        static LOCATION: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = LOCATION
            .get_or_init(|| Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").ok())
            .as_ref()?;

        let found = pattern.captures(message).and_then(|caps| {
            Some(Self {
                line: caps[1].parse().ok()?,
                column: caps[2].parse().ok()?,
            })
        });

        #[cfg(feature = "tracing")]
        if found.is_none() {
            trace!(message, "no source location in parser message");
        }
        found
    }
}

/// The script could not be turned into a lineage graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
    /// Dialect in effect when the error was raised, once known.
    pub dialect: Option<Dialect>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            dialect: None,
            kind: ParseErrorKind::Syntax,
        }
    }

    pub fn unsupported_dialect(name: &str) -> Self {
        Self::new(format!("unsupported dialect '{name}'"))
            .with_kind(ParseErrorKind::UnsupportedDialect)
    }

    /// `index` is 0-based; the message counts statements from 1.
    pub fn unsupported_statement(index: usize, statement_kind: &str) -> Self {
        Self::new(format!(
            "statement #{} ({statement_kind}) is not supported for lineage analysis; \
             enable silent_mode to skip it",
            index + 1
        ))
        .with_kind(ParseErrorKind::UnsupportedStatement)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (self.dialect, self.position) {
            (Some(dialect), Some(at)) => {
                write!(f, " [{dialect}, line {}, column {}]", at.line, at.column)
            }
            (Some(dialect), None) => write!(f, " [{dialect}]"),
            (None, Some(at)) => write!(f, " [line {}, column {}]", at.line, at.column),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParserError> for ParseError {
    fn from(err: ParserError) -> Self {
        let kind = match &err {
            ParserError::TokenizerError(_) => ParseErrorKind::Tokenizer,
            ParserError::RecursionLimitExceeded => ParseErrorKind::RecursionLimit,
            ParserError::ParserError(text) if text.contains("found: EOF") => {
                ParseErrorKind::UnexpectedEof
            }
            ParserError::ParserError(_) => ParseErrorKind::Syntax,
        };
        let message = err.to_string();
        Self {
            position: Position::find_in(&message),
            message,
            dialect: None,
            kind,
        }
    }
}

/// Failure while walking an already-built lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("column lineage has more than {limit} paths")]
    PathLimit { limit: usize },
    #[error("edge references unknown column #{index}")]
    DanglingEdge { index: usize },
    #[error("encountered an empty lineage path")]
    EmptyPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_read_from_parser_text() {
        let at = Position::find_in("Expected: an expression, found: FROM at Line: 1, Column: 8");
        assert_eq!(at, Some(Position { line: 1, column: 8 }));
        assert_eq!(
            Position::find_in("at Line:12,Column:3"),
            Some(Position {
                line: 12,
                column: 3
            })
        );
        assert_eq!(Position::find_in("at Line: 5"), None);
    }

    #[test]
    fn parser_variants_map_to_kinds() {
        let eof: ParseError =
            ParserError::ParserError("Expected: identifier, found: EOF".to_string()).into();
        assert_eq!(eof.kind, ParseErrorKind::UnexpectedEof);

        let lexer: ParseError =
            ParserError::TokenizerError("Unterminated string literal".to_string()).into();
        assert_eq!(lexer.kind, ParseErrorKind::Tokenizer);

        let deep: ParseError = ParserError::RecursionLimitExceeded.into();
        assert_eq!(deep.kind, ParseErrorKind::RecursionLimit);
    }

    #[test]
    fn display_appends_context() {
        let mut err = ParseError::new("bad syntax").with_dialect(Dialect::Hive);
        assert_eq!(err.to_string(), "bad syntax [hive]");
        err.position = Some(Position { line: 1, column: 5 });
        assert_eq!(err.to_string(), "bad syntax [hive, line 1, column 5]");
        assert_eq!(ParseError::new("plain").to_string(), "plain");
    }

    #[test]
    fn unsupported_constructors() {
        let err = ParseError::unsupported_dialect("cobol");
        assert_eq!(err.kind, ParseErrorKind::UnsupportedDialect);
        assert!(err.to_string().contains("cobol"));

        let err = ParseError::unsupported_statement(0, "DROP");
        assert_eq!(err.kind, ParseErrorKind::UnsupportedStatement);
        assert!(err.message.starts_with("statement #1 (DROP)"));
    }

    #[test]
    fn graph_error_messages() {
        assert_eq!(
            GraphError::PathLimit { limit: 10 }.to_string(),
            "column lineage has more than 10 paths"
        );
        assert_eq!(
            GraphError::DanglingEdge { index: 3 }.to_string(),
            "edge references unknown column #3"
        );
    }
}
