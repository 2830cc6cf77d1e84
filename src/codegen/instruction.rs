//! EWVM instruction definitions
//!
//! The target machine is stack-based and reads a textual program, one
//! instruction per line. Each opcode has:
//! - A mnemonic
//! - Number of values popped from stack (n_pop)
//! - Number of values pushed to stack (n_push)
//! - An operand format

use std::fmt;

use super::labels::Label;

/// Opcode operand formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFormat {
    /// No operand
    None,
    /// Integer constant
    Int,
    /// Floating-point constant
    Real,
    /// String constant
    Str,
    /// Global slot address
    Address,
    /// Jump target
    Label,
}

/// EWVM opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Push values
    /// Push integer constant
    PushI,
    /// Push float constant
    PushF,
    /// Push string constant
    PushS,
    /// Push global slot value
    PushG,

    // Storage
    /// Pop into global slot
    StoreG,
    /// Indexed load: ref index -> val
    LoadN,
    /// Indexed store: ref index val ->
    StoreN,
    /// Allocate a heap block: size -> ref
    AllocN,

    // Binary arithmetic
    /// Add: a + b
    Add,
    /// Subtract: a - b
    Sub,
    /// Multiply: a * b
    Mul,
    /// Divide: a / b
    Div,
    /// Modulo: a % b
    Mod,

    // Comparison
    /// Equal: a = b
    Equal,
    /// Less than: a < b
    Inf,
    /// Less than or equal: a <= b
    InfEq,
    /// Greater than: a > b
    Sup,
    /// Greater than or equal: a >= b
    SupEq,

    // Logic
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Logical NOT
    Not,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Jump if zero
    Jz,

    // I/O
    /// Print integer
    WriteI,
    /// Print float
    WriteF,
    /// Print string
    WriteS,
    /// Print newline
    WriteLn,
    /// Read a line as a string
    Read,
    /// String to integer
    Atoi,
    /// String to float
    Atof,

    // Program framing
    /// Start of the main block
    Start,
    /// End of program
    Stop,
}

/// Opcode information
#[derive(Debug, Clone, Copy)]
pub struct OpCodeInfo {
    /// Mnemonic as written in the program text
    pub name: &'static str,
    /// Number of values popped
    pub n_pop: u8,
    /// Number of values pushed
    pub n_push: u8,
    /// Operand format
    pub format: OpFormat,
}

impl OpCodeInfo {
    const fn new(name: &'static str, n_pop: u8, n_push: u8, format: OpFormat) -> Self {
        OpCodeInfo {
            name,
            n_pop,
            n_push,
            format,
        }
    }
}

impl OpCode {
    /// Total number of opcodes
    pub const COUNT: usize = OpCode::Stop as usize + 1;

    /// Get opcode info
    pub fn info(self) -> &'static OpCodeInfo {
        &OPCODE_INFO[self as usize]
    }

    /// Mnemonic as written in the program text
    pub fn name(self) -> &'static str {
        self.info().name
    }
}

/// Opcode info table, indexed by opcode
pub static OPCODE_INFO: [OpCodeInfo; OpCode::COUNT] = [
    OpCodeInfo::new("PUSHI", 0, 1, OpFormat::Int),
    OpCodeInfo::new("PUSHF", 0, 1, OpFormat::Real),
    OpCodeInfo::new("PUSHS", 0, 1, OpFormat::Str),
    OpCodeInfo::new("PUSHG", 0, 1, OpFormat::Address),
    OpCodeInfo::new("STOREG", 1, 0, OpFormat::Address),
    OpCodeInfo::new("LOADN", 2, 1, OpFormat::None),
    OpCodeInfo::new("STOREN", 3, 0, OpFormat::None),
    OpCodeInfo::new("ALLOCN", 1, 1, OpFormat::None),
    OpCodeInfo::new("ADD", 2, 1, OpFormat::None),
    OpCodeInfo::new("SUB", 2, 1, OpFormat::None),
    OpCodeInfo::new("MUL", 2, 1, OpFormat::None),
    OpCodeInfo::new("DIV", 2, 1, OpFormat::None),
    OpCodeInfo::new("MOD", 2, 1, OpFormat::None),
    OpCodeInfo::new("EQUAL", 2, 1, OpFormat::None),
    OpCodeInfo::new("INF", 2, 1, OpFormat::None),
    OpCodeInfo::new("INFEQ", 2, 1, OpFormat::None),
    OpCodeInfo::new("SUP", 2, 1, OpFormat::None),
    OpCodeInfo::new("SUPEQ", 2, 1, OpFormat::None),
    OpCodeInfo::new("AND", 2, 1, OpFormat::None),
    OpCodeInfo::new("OR", 2, 1, OpFormat::None),
    OpCodeInfo::new("NOT", 1, 1, OpFormat::None),
    OpCodeInfo::new("JUMP", 0, 0, OpFormat::Label),
    OpCodeInfo::new("JZ", 1, 0, OpFormat::Label),
    OpCodeInfo::new("WRITEI", 1, 0, OpFormat::None),
    OpCodeInfo::new("WRITEF", 1, 0, OpFormat::None),
    OpCodeInfo::new("WRITES", 1, 0, OpFormat::None),
    OpCodeInfo::new("WRITELN", 0, 0, OpFormat::None),
    OpCodeInfo::new("READ", 0, 1, OpFormat::None),
    OpCodeInfo::new("ATOI", 1, 1, OpFormat::None),
    OpCodeInfo::new("ATOF", 1, 1, OpFormat::None),
    OpCodeInfo::new("START", 0, 0, OpFormat::None),
    OpCodeInfo::new("STOP", 0, 0, OpFormat::None),
];

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Real(f64),
    Str(String),
    Address(usize),
    Label(Label),
}

impl Operand {
    fn format(&self) -> OpFormat {
        match self {
            Operand::Int(_) => OpFormat::Int,
            Operand::Real(_) => OpFormat::Real,
            Operand::Str(_) => OpFormat::Str,
            Operand::Address(_) => OpFormat::Address,
            Operand::Label(_) => OpFormat::Label,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{}", n),
            // Debug formatting keeps the fractional part: 0.0, not 0
            Operand::Real(n) => write!(f, "{:?}", n),
            Operand::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Operand::Address(addr) => write!(f, "{}", addr),
            Operand::Label(label) => write!(f, "{}", label),
        }
    }
}

/// One line of the output program
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Op {
        opcode: OpCode,
        operand: Option<Operand>,
    },
    /// Label definition (`name:`)
    Label(Label),
}

impl Instruction {
    /// Instruction without operand
    pub fn op(opcode: OpCode) -> Self {
        debug_assert_eq!(opcode.info().format, OpFormat::None, "{} takes an operand", opcode.name());
        Instruction::Op {
            opcode,
            operand: None,
        }
    }

    /// Instruction with an operand
    pub fn with(opcode: OpCode, operand: Operand) -> Self {
        debug_assert_eq!(opcode.info().format, operand.format(), "bad operand for {}", opcode.name());
        Instruction::Op {
            opcode,
            operand: Some(operand),
        }
    }

    pub fn push_int(n: i64) -> Self {
        Self::with(OpCode::PushI, Operand::Int(n))
    }

    pub fn push_real(n: f64) -> Self {
        Self::with(OpCode::PushF, Operand::Real(n))
    }

    pub fn push_str(s: impl Into<String>) -> Self {
        Self::with(OpCode::PushS, Operand::Str(s.into()))
    }

    pub fn push_global(address: usize) -> Self {
        Self::with(OpCode::PushG, Operand::Address(address))
    }

    pub fn store_global(address: usize) -> Self {
        Self::with(OpCode::StoreG, Operand::Address(address))
    }

    pub fn jump(label: Label) -> Self {
        Self::with(OpCode::Jump, Operand::Label(label))
    }

    pub fn jz(label: Label) -> Self {
        Self::with(OpCode::Jz, Operand::Label(label))
    }

    /// The opcode, or `None` for a label definition
    pub fn opcode(&self) -> Option<OpCode> {
        match self {
            Instruction::Op { opcode, .. } => Some(*opcode),
            Instruction::Label(_) => None,
        }
    }

    /// Net change in evaluation stack depth
    pub fn stack_effect(&self) -> i32 {
        match self {
            Instruction::Op { opcode, .. } => {
                let info = opcode.info();
                info.n_push as i32 - info.n_pop as i32
            }
            Instruction::Label(_) => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op {
                opcode,
                operand: None,
            } => f.write_str(opcode.name()),
            Instruction::Op {
                opcode,
                operand: Some(operand),
            } => write!(f, "{} {}", opcode.name(), operand),
            Instruction::Label(label) => write!(f, "{}:", label),
        }
    }
}

/// Render a program as text, one instruction per line
pub fn render(code: &[Instruction]) -> String {
    let mut out = String::new();
    for instr in code {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}
