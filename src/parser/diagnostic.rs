//! Recoverable compile-time diagnostics
//!
//! Lexical, syntactic and semantic problems are collected rather than
//! raised so that a single run reports all of them.

use std::fmt;

use super::lexer::{SourcePos, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Unrecognized character, unterminated string or comment
    Lexical,
    /// Grammar mismatch or premature end of input
    Syntax,
    /// Constant array index outside the declared bounds
    Range,
    /// Undeclared names, misuse of arrays, bad bounds
    Semantic,
}

/// A single problem found while lexing or parsing
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub pos: Option<SourcePos>,
    pub message: String,
}

impl Diagnostic {
    pub fn lexical(pos: SourcePos, message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Lexical,
            severity: Severity::Error,
            pos: Some(pos),
            message: message.into(),
        }
    }

    pub fn unexpected_token(pos: SourcePos, token: &Token) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            pos: Some(pos),
            message: format!("unexpected token '{}'", token),
        }
    }

    pub fn unexpected_eof() -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            pos: None,
            message: "unexpected end of input!".to_string(),
        }
    }

    /// Constant index outside `low..high`
    ///
    /// Reported with warning severity, but still fails the compile.
    pub fn range(pos: SourcePos, value: f64, low: i64, high: i64) -> Self {
        let value = if value.fract() == 0.0 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        };
        Diagnostic {
            kind: DiagnosticKind::Range,
            severity: Severity::Warning,
            pos: Some(pos),
            message: format!(
                "range check error while evaluating constants ({} must be between {} and {})",
                value, low, high
            ),
        }
    }

    /// Statements or expressions nested past the parser's limit
    pub fn nesting_too_deep(pos: SourcePos, limit: usize) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            pos: Some(pos),
            message: format!("nesting deeper than {} levels", limit),
        }
    }

    pub fn semantic(pos: SourcePos, message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Semantic,
            severity: Severity::Error,
            pos: Some(pos),
            message: message.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::Lexical => "Lexical error",
            DiagnosticKind::Syntax => "Syntax error",
            DiagnosticKind::Range => "Warning",
            DiagnosticKind::Semantic => "Error",
        };
        match self.pos {
            Some(pos) => write!(
                f,
                "{} at line {}, column {}: {}",
                label, pos.line, pos.column, self.message
            ),
            None => write!(f, "{}: {}", label, self.message),
        }
    }
}
