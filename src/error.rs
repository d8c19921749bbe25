use pest::error::LineColLocation;
use thiserror::Error;

use crate::grammar::Rule;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between raw text and a queryable table.
///
/// Parse errors carry the source location; assembly and query errors name
/// the symbol involved. Nothing is retried or recovered internally.
#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error at {line}:{col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("dimension mismatch for '{symbol}': expected {expected}, got {found}")]
    DimensionMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    #[error("'{symbol}': {context}")]
    UndefinedDomain { symbol: String, context: String },

    #[error("undefined symbol '{name}'")]
    UndefinedSymbol { name: String },

    #[error("'{symbol}' has no value for key [{key}]")]
    MissingKey { symbol: String, key: String },

    #[error("conflicting redeclaration of '{symbol}'")]
    Redeclaration { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn from_parse(err: pest::error::Error<Rule>) -> Self {
        let (line, col) = match err.line_col {
            LineColLocation::Pos((line, col)) => (line, col),
            LineColLocation::Span((line, col), _) => (line, col),
        };
        Error::Syntax {
            line,
            col,
            message: err.variant.message().into_owned(),
        }
    }
}
