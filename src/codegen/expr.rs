//! Expression lowering
//!
//! Operands are emitted before their operator, so the generated code
//! evaluates on the VM stack exactly like a postfix walk of the tree.

use super::instruction::{Instruction, OpCode};
use super::symbols::SymbolTable;
use super::{TranslateError, TranslateResult};
use crate::parser::ast::{
    ArrayType, BinaryOp, DataType, Expr, Literal, LogicalOp, RelOp, ScalarType, UnaryOp,
};

/// Appends the code for expressions to a shared instruction list
pub struct ExprTranslator<'t> {
    symbols: &'t SymbolTable,
    code: &'t mut Vec<Instruction>,
}

impl<'t> ExprTranslator<'t> {
    pub fn new(symbols: &'t SymbolTable, code: &'t mut Vec<Instruction>) -> Self {
        ExprTranslator { symbols, code }
    }

    fn emit(&mut self, instr: Instruction) {
        self.code.push(instr);
    }

    /// Lower an expression; leaves exactly one value on the stack
    pub fn lower(&mut self, expr: &Expr) -> TranslateResult<()> {
        match expr {
            Expr::Literal(literal) => self.lower_literal(literal),
            Expr::Variable(name) => {
                let address = scalar_address(self.symbols, name)?;
                self.emit(Instruction::push_global(address));
            }
            Expr::ArrayAccess { array, index } => {
                let (address, array_ty) = array_slot(self.symbols, array)?;
                self.emit(Instruction::push_global(address));
                self.lower_index(index, &array_ty)?;
                self.emit(Instruction::op(OpCode::LoadN));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.lower(lhs)?;
                self.lower(rhs)?;
                let opcode = match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Mod => OpCode::Mod,
                };
                self.emit(Instruction::op(opcode));
            }
            Expr::Unary { op, operand } => {
                self.lower(operand)?;
                match op {
                    // No negate opcode: multiply by -1
                    UnaryOp::Neg => {
                        self.emit(Instruction::push_int(-1));
                        self.emit(Instruction::op(OpCode::Mul));
                    }
                    UnaryOp::Plus => {}
                    UnaryOp::Not => self.emit(Instruction::op(OpCode::Not)),
                }
            }
            Expr::Relational { op, lhs, rhs } => {
                self.lower(lhs)?;
                self.lower(rhs)?;
                match op {
                    RelOp::Eq => self.emit(Instruction::op(OpCode::Equal)),
                    RelOp::NotEq => {
                        self.emit(Instruction::op(OpCode::Equal));
                        self.emit(Instruction::op(OpCode::Not));
                    }
                    RelOp::Lt => self.emit(Instruction::op(OpCode::Inf)),
                    RelOp::LtEq => self.emit(Instruction::op(OpCode::InfEq)),
                    RelOp::Gt => self.emit(Instruction::op(OpCode::Sup)),
                    RelOp::GtEq => self.emit(Instruction::op(OpCode::SupEq)),
                }
            }
            // Both sides are always evaluated
            Expr::Logical { op, lhs, rhs } => {
                self.lower(lhs)?;
                self.lower(rhs)?;
                let opcode = match op {
                    LogicalOp::And => OpCode::And,
                    LogicalOp::Or => OpCode::Or,
                };
                self.emit(Instruction::op(opcode));
            }
        }
        Ok(())
    }

    fn lower_literal(&mut self, literal: &Literal) {
        let instr = match literal {
            Literal::Integer(n) => Instruction::push_int(*n),
            Literal::Real(n) => Instruction::push_real(*n),
            Literal::String(s) => Instruction::push_str(s.as_str()),
            Literal::Boolean(b) => Instruction::push_int(i64::from(*b)),
        };
        self.emit(instr);
    }

    /// Push an index rebased so the array's first element is at 0
    pub fn lower_index(&mut self, index: &Expr, array: &ArrayType) -> TranslateResult<()> {
        self.lower(index)?;
        self.emit(Instruction::push_int(array.low));
        self.emit(Instruction::op(OpCode::Sub));
        Ok(())
    }
}

/// Address of a variable used as a whole value
pub(crate) fn scalar_address(symbols: &SymbolTable, name: &str) -> TranslateResult<usize> {
    let symbol = symbols
        .lookup(name)
        .ok_or_else(|| TranslateError::UndefinedVariable(name.to_string()))?;
    if let DataType::Array(_) = symbol.ty {
        return Err(TranslateError::ArrayAsValue(name.to_string()));
    }
    Ok(symbol.address)
}

/// Address and shape of an array variable
pub(crate) fn array_slot(symbols: &SymbolTable, name: &str) -> TranslateResult<(usize, ArrayType)> {
    let symbol = symbols
        .lookup(name)
        .ok_or_else(|| TranslateError::UndefinedArray(name.to_string()))?;
    match symbol.ty {
        DataType::Array(array) => Ok((symbol.address, array)),
        _ => Err(TranslateError::NotAnArray(name.to_string())),
    }
}

/// Static type of an expression, used to pick the print opcode
///
/// Arithmetic is real if either side is real and integer otherwise;
/// comparisons, `and`, `or` and `not` are boolean.
pub fn infer_type(expr: &Expr, symbols: &SymbolTable) -> TranslateResult<ScalarType> {
    let ty = match expr {
        Expr::Literal(Literal::Integer(_)) => ScalarType::Integer,
        Expr::Literal(Literal::Real(_)) => ScalarType::Real,
        Expr::Literal(Literal::String(_)) => ScalarType::String,
        Expr::Literal(Literal::Boolean(_)) => ScalarType::Boolean,
        Expr::Variable(name) => {
            let symbol = symbols
                .lookup(name)
                .ok_or_else(|| TranslateError::UndefinedVariable(name.clone()))?;
            symbol
                .ty
                .as_scalar()
                .ok_or_else(|| TranslateError::ArrayAsValue(name.clone()))?
        }
        Expr::ArrayAccess { array, .. } => array_slot(symbols, array)?.1.element,
        Expr::Binary { lhs, rhs, .. } => {
            let lhs = infer_type(lhs, symbols)?;
            let rhs = infer_type(rhs, symbols)?;
            if lhs == ScalarType::Real || rhs == ScalarType::Real {
                ScalarType::Real
            } else {
                ScalarType::Integer
            }
        }
        Expr::Unary {
            op: UnaryOp::Not, ..
        } => ScalarType::Boolean,
        Expr::Unary { operand, .. } => infer_type(operand, symbols)?,
        Expr::Relational { .. } | Expr::Logical { .. } => ScalarType::Boolean,
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::render;

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Integer(n))
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn symbols() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.allocate("n", DataType::Integer);
        table.allocate("r", DataType::Real);
        table.allocate(
            "a",
            DataType::Array(ArrayType { low: 1, high: 5, element: ScalarType::Real }),
        );
        table.allocate("s", DataType::String);
        table
    }

    fn lower(expr: &Expr) -> TranslateResult<String> {
        let table = symbols();
        let mut code = Vec::new();
        ExprTranslator::new(&table, &mut code).lower(expr)?;
        let stack: i32 = code.iter().map(Instruction::stack_effect).sum();
        assert_eq!(stack, 1, "expression must leave one value");
        Ok(render(&code))
    }

    #[test]
    fn test_precedence_lowering() {
        let expr = binary(BinaryOp::Add, int(2), binary(BinaryOp::Mul, int(3), int(4)));
        assert_eq!(lower(&expr).unwrap(), "PUSHI 2\nPUSHI 3\nPUSHI 4\nMUL\nADD\n");
    }

    #[test]
    fn test_literals() {
        assert_eq!(lower(&Expr::Literal(Literal::Real(1.5))).unwrap(), "PUSHF 1.5\n");
        assert_eq!(lower(&Expr::Literal(Literal::Boolean(true))).unwrap(), "PUSHI 1\n");
        assert_eq!(lower(&Expr::Literal(Literal::Boolean(false))).unwrap(), "PUSHI 0\n");
        assert_eq!(
            lower(&Expr::Literal(Literal::String("n".to_string()))).unwrap(),
            "PUSHS \"n\"\n"
        );
    }

    #[test]
    fn test_variable_and_array_access() {
        assert_eq!(lower(&var("r")).unwrap(), "PUSHG 1\n");

        let access = Expr::ArrayAccess {
            array: "a".to_string(),
            index: Box::new(var("n")),
        };
        assert_eq!(
            lower(&access).unwrap(),
            "PUSHG 2\nPUSHG 0\nPUSHI 1\nSUB\nLOADN\n"
        );
    }

    #[test]
    fn test_index_rebased_by_lower_bound() {
        let mut table = SymbolTable::new();
        table.allocate(
            "zero",
            DataType::Array(ArrayType { low: 0, high: 4, element: ScalarType::Integer }),
        );
        table.allocate(
            "centered",
            DataType::Array(ArrayType { low: -2, high: 2, element: ScalarType::Integer }),
        );

        let access = |array: &str| {
            let mut code = Vec::new();
            let expr = Expr::ArrayAccess { array: array.to_string(), index: Box::new(int(1)) };
            ExprTranslator::new(&table, &mut code).lower(&expr).unwrap();
            render(&code)
        };
        assert_eq!(access("zero"), "PUSHG 0\nPUSHI 1\nPUSHI 0\nSUB\nLOADN\n");
        assert_eq!(access("centered"), "PUSHG 1\nPUSHI 1\nPUSHI -2\nSUB\nLOADN\n");
    }

    #[test]
    fn test_unary() {
        let neg = Expr::Unary { op: UnaryOp::Neg, operand: Box::new(var("n")) };
        assert_eq!(lower(&neg).unwrap(), "PUSHG 0\nPUSHI -1\nMUL\n");

        let not = Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expr::Literal(Literal::Boolean(true))),
        };
        assert_eq!(lower(&not).unwrap(), "PUSHI 1\nNOT\n");
    }

    #[test]
    fn test_not_equal_is_equal_not() {
        let expr = Expr::Relational {
            op: RelOp::NotEq,
            lhs: Box::new(var("n")),
            rhs: Box::new(int(0)),
        };
        assert_eq!(lower(&expr).unwrap(), "PUSHG 0\nPUSHI 0\nEQUAL\nNOT\n");
    }

    #[test]
    fn test_logical_evaluates_both_sides() {
        let expr = Expr::Logical {
            op: LogicalOp::Or,
            lhs: Box::new(Expr::Relational {
                op: RelOp::Gt,
                lhs: Box::new(var("n")),
                rhs: Box::new(int(1)),
            }),
            rhs: Box::new(Expr::Literal(Literal::Boolean(false))),
        };
        assert_eq!(lower(&expr).unwrap(), "PUSHG 0\nPUSHI 1\nSUP\nPUSHI 0\nOR\n");
    }

    #[test]
    fn test_undefined_names() {
        assert_eq!(lower(&var("zz")), Err(TranslateError::UndefinedVariable("zz".to_string())));

        let access = Expr::ArrayAccess { array: "q".to_string(), index: Box::new(int(1)) };
        assert_eq!(lower(&access), Err(TranslateError::UndefinedArray("q".to_string())));

        let access = Expr::ArrayAccess { array: "n".to_string(), index: Box::new(int(1)) };
        assert_eq!(lower(&access), Err(TranslateError::NotAnArray("n".to_string())));
    }

    #[test]
    fn test_infer_type() {
        let table = symbols();
        let ty = |e: &Expr| infer_type(e, &table).unwrap();

        assert_eq!(ty(&binary(BinaryOp::Add, var("n"), int(1))), ScalarType::Integer);
        assert_eq!(ty(&binary(BinaryOp::Mul, var("n"), var("r"))), ScalarType::Real);
        assert_eq!(
            ty(&Expr::ArrayAccess { array: "a".to_string(), index: Box::new(int(1)) }),
            ScalarType::Real
        );
        assert_eq!(ty(&var("s")), ScalarType::String);
        assert_eq!(
            ty(&Expr::Unary { op: UnaryOp::Neg, operand: Box::new(var("r")) }),
            ScalarType::Real
        );
        assert_eq!(
            ty(&Expr::Relational { op: RelOp::Eq, lhs: Box::new(int(1)), rhs: Box::new(int(2)) }),
            ScalarType::Boolean
        );
        assert_eq!(
            infer_type(&var("a"), &table),
            Err(TranslateError::ArrayAsValue("a".to_string()))
        );
    }
}
