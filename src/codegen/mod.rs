//! EWVM code generation
//!
//! Lowers a checked AST into a flat list of stack-machine instructions.
//! Expressions come out in postfix order; control flow is expressed with
//! labels and `JUMP`/`JZ`.

pub mod expr;
pub mod instruction;
pub mod labels;
pub mod program;
pub mod stmt;
pub mod symbols;

use thiserror::Error;

// Re-exports
pub use instruction::{render, Instruction, OpCode, Operand};
pub use labels::{Label, LabelGenerator, LabelKind};
pub use program::{translate, Translation, Translator};
pub use symbols::{Symbol, SymbolTable};

/// Fatal translation failure
///
/// The parser rejects programs that would trigger these, so seeing one
/// means an AST reached code generation without going through the checks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("undefined array: {0}")]
    UndefinedArray(String),
    #[error("variable '{0}' is not an array")]
    NotAnArray(String),
    #[error("array '{0}' cannot be used as a value")]
    ArrayAsValue(String),
    #[error("array '{0}' is too large")]
    ArrayTooLarge(String),
}

pub type TranslateResult<T> = Result<T, TranslateError>;
