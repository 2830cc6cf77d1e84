//! pascal-vm - a compiler from a small Pascal subset to EWVM text
//!
//! The input language covers a single `program` block with global `var`
//! declarations (integer, real, string, boolean and one-dimensional
//! arrays), compound statements, `if`/`while`/`for`, assignment and the
//! `write`/`writeln`/`readln` builtins. The output is the textual
//! instruction format of the EWVM stack machine.
//!
//! # Features
//! - Panic-mode error recovery: every diagnostic is reported, not just the first
//! - Constant array index bound checks
//! - Statically typed `write`, so each argument prints with the right opcode
//! - No output at all when the source has problems
//!
//! # Example
//! ```
//! use pascvm::compile;
//!
//! let compilation = compile("program hello; begin writeln('Hello') end.").unwrap();
//! assert_eq!(
//!     compilation.render(),
//!     "START\nPUSHS \"Hello\"\nWRITES\nWRITELN\nSTOP\n"
//! );
//! ```

// Lexer, parser and diagnostics
pub mod parser;

// EWVM code generation
pub mod codegen;

// Compiler front door
pub mod compiler;

// Re-export main types
pub use codegen::{Instruction, TranslateError};
pub use compiler::{compile, Compilation, CompileError, CompileOptions, Compiler};
pub use parser::{parse, Diagnostic, DiagnosticKind, ParseResult, Program, Severity};
