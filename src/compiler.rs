//! Compiler front door
//!
//! The Compiler is the main entry point. It runs the parser, refuses to
//! translate anything that produced diagnostics, and hands back the
//! generated program.

use std::fmt;

use thiserror::Error;

use crate::codegen::{render, Instruction, TranslateError, Translator};
use crate::parser::ast::Program;
use crate::parser::{Diagnostic, Parser};

/// Compile settings
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Check constant array indices against the declared bounds
    pub range_checks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { range_checks: true }
    }
}

/// Error from compilation
#[derive(Debug, Error)]
pub enum CompileError {
    /// Lexical, syntax or semantic problems; nothing was translated
    #[error("{} problem(s) found", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    /// Code generation failed
    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),
}

impl CompileError {
    /// Diagnostics carried by this error, if any
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Diagnostics(diagnostics) => diagnostics,
            CompileError::Translate(_) => &[],
        }
    }
}

/// A successfully compiled program
#[derive(Debug)]
pub struct Compilation {
    /// Parsed program
    pub program: Program,
    /// Generated instructions
    pub code: Vec<Instruction>,
}

impl Compilation {
    /// The program as EWVM text
    pub fn render(&self) -> String {
        render(&self.code)
    }
}

impl fmt::Display for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Pascal-to-EWVM compiler
#[derive(Debug, Default, Clone)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a compiler with the given settings
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile source text
    ///
    /// # Returns
    /// The generated program, or every diagnostic found while parsing
    pub fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        let parsed = Parser::new(source)
            .range_checks(self.options.range_checks)
            .parse();

        if !parsed.is_success() {
            log::info!(
                "not translating: {} diagnostic(s)",
                parsed.diagnostics.len()
            );
            return Err(CompileError::Diagnostics(parsed.diagnostics));
        }

        let translation = Translator::new().translate(&parsed.program)?;
        log::info!(
            "compiled '{}' to {} instruction(s)",
            parsed.program.name,
            translation.code.len()
        );
        Ok(Compilation {
            program: parsed.program,
            code: translation.code,
        })
    }
}

/// Compile with default settings
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    Compiler::default().compile(source)
}
