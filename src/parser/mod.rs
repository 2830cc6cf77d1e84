//! Pascal front-end
//!
//! Lexer, recursive-descent parser and the AST they produce.

pub mod ast;
pub mod diagnostic;
pub mod grammar;
pub mod lexer;

// Re-exports
pub use ast::Program;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use grammar::{parse, ParseResult, Parser};
pub use lexer::{Lexer, SourcePos, Spanned, Token};
