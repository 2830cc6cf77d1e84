//! Whole-program translation
//!
//! Output layout:
//!
//! ```text
//! <one initializer push per variable>   global slots, in declaration order
//! START
//! <main block>
//! STOP
//! ```

use super::instruction::{Instruction, OpCode};
use super::labels::LabelGenerator;
use super::stmt::StmtTranslator;
use super::symbols::SymbolTable;
use super::{TranslateError, TranslateResult};
use crate::parser::ast::{DataType, Program, Stmt};

/// Result of translating one program
#[derive(Debug)]
pub struct Translation {
    pub code: Vec<Instruction>,
    pub symbols: SymbolTable,
}

/// Translator state for one compilation
#[derive(Debug, Default)]
pub struct Translator {
    code: Vec<Instruction>,
    symbols: SymbolTable,
    labels: LabelGenerator,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate a program to EWVM code
    pub fn translate(mut self, program: &Program) -> TranslateResult<Translation> {
        for decl in &program.declarations {
            for var in &decl.variables {
                self.declare(&var.name, decl.ty)?;
            }
        }

        // Undeclared `for` variables still need a slot reserved before START;
        // a slot allocated later would land on top of the evaluation stack.
        let mut loop_vars = Vec::new();
        collect_loop_variables(&program.body, &mut loop_vars);
        for name in loop_vars {
            self.declare(name, DataType::Integer)?;
        }
        log::debug!("{} global slot(s) for program '{}'", self.symbols.len(), program.name);

        self.code.push(Instruction::op(OpCode::Start));
        StmtTranslator::new(&mut self.symbols, &mut self.labels, &mut self.code)
            .lower(&program.body)?;
        self.code.push(Instruction::op(OpCode::Stop));

        log::debug!(
            "generated {} instruction(s), {} label(s)",
            self.code.len(),
            self.labels.count()
        );
        Ok(Translation {
            code: self.code,
            symbols: self.symbols,
        })
    }

    /// Emit the initial value for a new variable and give it a slot
    ///
    /// Names that already have a slot are skipped so that slot numbers stay
    /// in step with the pushes.
    fn declare(&mut self, name: &str, ty: DataType) -> TranslateResult<()> {
        if self.symbols.contains(name) {
            log::debug!("'{}' already has a slot", name);
            return Ok(());
        }
        match ty {
            DataType::Integer | DataType::Boolean => self.code.push(Instruction::push_int(0)),
            DataType::Real => self.code.push(Instruction::push_real(0.0)),
            DataType::String => self.code.push(Instruction::push_str("")),
            DataType::Array(array) => {
                let size = array
                    .size()
                    .ok_or_else(|| TranslateError::ArrayTooLarge(name.to_string()))?;
                self.code.push(Instruction::push_int(size));
                self.code.push(Instruction::op(OpCode::AllocN));
            }
        }
        self.symbols.allocate(name, ty);
        Ok(())
    }
}

fn collect_loop_variables<'p>(stmt: &'p Stmt, out: &mut Vec<&'p str>) {
    match stmt {
        Stmt::Compound(statements) => {
            for stmt in statements {
                collect_loop_variables(stmt, out);
            }
        }
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            collect_loop_variables(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_loop_variables(else_branch, out);
            }
        }
        Stmt::While { body, .. } => collect_loop_variables(body, out),
        Stmt::For { variable, body, .. } => {
            out.push(variable.as_str());
            collect_loop_variables(body, out);
        }
        Stmt::Assign { .. }
        | Stmt::Write(_)
        | Stmt::Writeln(_)
        | Stmt::Readln { .. }
        | Stmt::ReadlnIndexed { .. } => {}
    }
}

/// Translate a program and return just the instructions
pub fn translate(program: &Program) -> TranslateResult<Vec<Instruction>> {
    Translator::new().translate(program).map(|t| t.code)
}
