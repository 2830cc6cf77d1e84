//! Statement lowering
//!
//! A structural recursion over the statement tree. Label allocation is the
//! only state shared between siblings.

use super::expr::{array_slot, infer_type, scalar_address, ExprTranslator};
use super::instruction::{Instruction, OpCode};
use super::labels::{LabelGenerator, LabelKind};
use super::symbols::SymbolTable;
use super::{TranslateError, TranslateResult};
use crate::parser::ast::{DataType, Expr, ScalarType, Stmt, WriteArg};

pub struct StmtTranslator<'t> {
    symbols: &'t mut SymbolTable,
    labels: &'t mut LabelGenerator,
    code: &'t mut Vec<Instruction>,
}

impl<'t> StmtTranslator<'t> {
    pub fn new(
        symbols: &'t mut SymbolTable,
        labels: &'t mut LabelGenerator,
        code: &'t mut Vec<Instruction>,
    ) -> Self {
        StmtTranslator {
            symbols,
            labels,
            code,
        }
    }

    fn emit(&mut self, instr: Instruction) {
        self.code.push(instr);
    }

    fn lower_expr(&mut self, expr: &Expr) -> TranslateResult<()> {
        ExprTranslator::new(self.symbols, self.code).lower(expr)
    }

    pub fn lower(&mut self, stmt: &Stmt) -> TranslateResult<()> {
        match stmt {
            Stmt::Compound(statements) => {
                for stmt in statements {
                    self.lower(stmt)?;
                }
            }
            Stmt::Assign { target, value } => {
                self.lower_expr(value)?;
                let address = scalar_address(self.symbols, target)?;
                self.emit(Instruction::store_global(address));
            }
            Stmt::Write(args) => self.lower_write(args)?,
            Stmt::Writeln(args) => {
                self.lower_write(args)?;
                self.emit(Instruction::op(OpCode::WriteLn));
            }
            Stmt::Readln { target } => {
                let address = scalar_address(self.symbols, target)?;
                let ty = self
                    .symbols
                    .lookup(target)
                    .and_then(|s| s.ty.as_scalar())
                    .ok_or_else(|| TranslateError::UndefinedVariable(target.clone()))?;
                self.emit(Instruction::op(OpCode::Read));
                self.emit_conversion(ty);
                self.emit(Instruction::store_global(address));
            }
            Stmt::ReadlnIndexed { array, index } => {
                let (address, array_ty) = array_slot(self.symbols, array)?;
                self.emit(Instruction::push_global(address));
                ExprTranslator::new(self.symbols, self.code).lower_index(index, &array_ty)?;
                self.emit(Instruction::op(OpCode::Read));
                self.emit_conversion(array_ty.element);
                self.emit(Instruction::op(OpCode::StoreN));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref())?,
            Stmt::While { condition, body } => {
                let start = self.labels.next(LabelKind::WhileStart);
                let end = self.labels.next(LabelKind::WhileEnd);

                self.emit(Instruction::Label(start));
                self.lower_expr(condition)?;
                self.emit(Instruction::jz(end));
                self.lower(body)?;
                self.emit(Instruction::jump(start));
                self.emit(Instruction::Label(end));
            }
            Stmt::For {
                variable,
                start,
                end,
                body,
            } => self.lower_for(variable, start, end, body)?,
        }
        Ok(())
    }

    /// Each argument is printed with the opcode for its static type
    fn lower_write(&mut self, args: &[WriteArg]) -> TranslateResult<()> {
        for arg in args {
            self.lower_expr(&arg.expr)?;
            let opcode = match infer_type(&arg.expr, self.symbols)? {
                ScalarType::Integer | ScalarType::Boolean => OpCode::WriteI,
                ScalarType::Real => OpCode::WriteF,
                ScalarType::String => OpCode::WriteS,
            };
            self.emit(Instruction::op(opcode));
        }
        Ok(())
    }

    /// `READ` leaves a string; convert it to the target's type
    fn emit_conversion(&mut self, ty: ScalarType) {
        match ty {
            ScalarType::Integer | ScalarType::Boolean => self.emit(Instruction::op(OpCode::Atoi)),
            ScalarType::Real => self.emit(Instruction::op(OpCode::Atof)),
            ScalarType::String => {}
        }
    }

    fn lower_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> TranslateResult<()> {
        let false_label = self.labels.next(LabelKind::IfFalse);

        self.lower_expr(condition)?;
        self.emit(Instruction::jz(false_label));
        self.lower(then_branch)?;

        match else_branch {
            Some(else_branch) => {
                let end_label = self.labels.next(LabelKind::IfEnd);
                self.emit(Instruction::jump(end_label));
                self.emit(Instruction::Label(false_label));
                self.lower(else_branch)?;
                self.emit(Instruction::Label(end_label));
            }
            None => self.emit(Instruction::Label(false_label)),
        }
        Ok(())
    }

    /// The loop variable is left one past `end` on normal exit
    fn lower_for(
        &mut self,
        variable: &str,
        start: &Expr,
        end: &Expr,
        body: &Stmt,
    ) -> TranslateResult<()> {
        let address = self.symbols.allocate(variable, DataType::Integer);

        self.lower_expr(start)?;
        self.emit(Instruction::store_global(address));

        let start_label = self.labels.next(LabelKind::ForStart);
        let end_label = self.labels.next(LabelKind::ForEnd);

        self.emit(Instruction::Label(start_label));
        self.emit(Instruction::push_global(address));
        self.lower_expr(end)?;
        self.emit(Instruction::op(OpCode::InfEq));
        self.emit(Instruction::jz(end_label));

        self.lower(body)?;

        self.emit(Instruction::push_global(address));
        self.emit(Instruction::push_int(1));
        self.emit(Instruction::op(OpCode::Add));
        self.emit(Instruction::store_global(address));
        self.emit(Instruction::jump(start_label));
        self.emit(Instruction::Label(end_label));
        Ok(())
    }
}
