//! Abstract syntax tree
//!
//! Built bottom-up by the parser and never mutated afterwards. Literals are
//! tagged by kind, so a string literal can never be mistaken for a variable
//! name later on.

use super::lexer::SourcePos;

/// A whole program: header name, `var` section and main block
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub declarations: Vec<Declaration>,
    pub body: Stmt,
}

/// `a, b, c : type;`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub variables: Vec<VariableDecl>,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub pos: SourcePos,
}

/// Types a scalar variable or an array element can have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Integer,
    Real,
    String,
    Boolean,
}

/// Type descriptor attached to a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Real,
    String,
    Boolean,
    Array(ArrayType),
}

/// `array[low..high] of element`, both bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayType {
    pub low: i64,
    pub high: i64,
    pub element: ScalarType,
}

impl ArrayType {
    /// Number of elements, or `None` if the count does not fit in an `i64`
    pub fn size(&self) -> Option<i64> {
        self.high.checked_sub(self.low)?.checked_add(1)
    }

    /// Whether a constant index falls inside the declared bounds
    pub fn contains(&self, index: f64) -> bool {
        index >= self.low as f64 && index <= self.high as f64
    }
}

impl DataType {
    /// The scalar type, or `None` for arrays
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            DataType::Integer => Some(ScalarType::Integer),
            DataType::Real => Some(ScalarType::Real),
            DataType::String => Some(ScalarType::String),
            DataType::Boolean => Some(ScalarType::Boolean),
            DataType::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            DataType::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl From<ScalarType> for DataType {
    fn from(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Integer => DataType::Integer,
            ScalarType::Real => DataType::Real,
            ScalarType::String => DataType::String,
            ScalarType::Boolean => DataType::Boolean,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `begin ... end`
    Compound(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// `for variable := start to end do body`
    For {
        variable: String,
        start: Expr,
        end: Expr,
        body: Box<Stmt>,
    },
    Assign {
        target: String,
        value: Expr,
    },
    Write(Vec<WriteArg>),
    Writeln(Vec<WriteArg>),
    Readln {
        target: String,
    },
    ReadlnIndexed {
        array: String,
        index: Expr,
    },
}

/// One argument of `write`/`writeln`, with optional `:width:precision`
#[derive(Debug, Clone, PartialEq)]
pub struct WriteArg {
    pub expr: Expr,
    pub width: Option<i64>,
    pub precision: Option<i64>,
}

impl WriteArg {
    pub fn plain(expr: Expr) -> Self {
        WriteArg {
            expr,
            width: None,
            precision: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    ArrayAccess {
        array: String,
        index: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Relational {
        op: RelOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Numeric value of an index expression that is a (possibly signed)
    /// literal number
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Expr::Literal(Literal::Integer(n)) => Some(*n as f64),
            Expr::Literal(Literal::Real(n)) => Some(*n),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.constant_value().map(|n| -n),
            Expr::Unary {
                op: UnaryOp::Plus,
                operand,
            } => operand.constant_value(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
