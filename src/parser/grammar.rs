//! Recursive-descent parser
//!
//! Builds the AST in a single pass and collects every diagnostic on the way.
//! Nothing here returns early to the caller: a syntax error is recorded, the
//! parser skips to the next statement boundary and carries on, so one run
//! reports as many problems as it can find.

use std::collections::HashMap;

use super::ast::{
    ArrayType, BinaryOp, DataType, Declaration, Expr, Literal, LogicalOp, Program, RelOp,
    ScalarType, Stmt, UnaryOp, VariableDecl, WriteArg,
};
use super::diagnostic::Diagnostic;
use super::lexer::{Lexer, SourcePos, Spanned, Token};

/// Marker for a failed production. The diagnostic has already been
/// recorded when this is returned.
#[derive(Debug)]
struct Abort;

type PResult<T> = Result<T, Abort>;

/// Deepest nesting of statements and expressions accepted
const MAX_NESTING: usize = 128;

/// Dangling-else category of a parsed statement
///
/// A matched statement has every nested `if` closed by an `else`; an
/// unmatched one may end in an open `if` that a following `else` would
/// belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Matched,
    Unmatched,
}

/// Names declared so far in the current parse, with their types
///
/// Used for early checks (undeclared names, constant index bounds). It is
/// owned by one `Parser` and dropped with it.
#[derive(Debug, Default)]
struct DeclarationContext {
    types: HashMap<String, DataType>,
}

impl DeclarationContext {
    /// Returns false if the name was already declared
    fn declare(&mut self, name: &str, ty: DataType) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        self.types.insert(name.to_string(), ty);
        true
    }

    fn get(&self, name: &str) -> Option<&DataType> {
        self.types.get(name)
    }
}

/// Output of one parse: a best-effort AST plus everything that went wrong
#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// True iff no diagnostic (error or warning) was produced
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parser state
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Spanned,
    consumed: usize,
    diagnostics: Vec<Diagnostic>,
    context: DeclarationContext,
    range_checks: bool,
    eof_reported: bool,
    depth: usize,
    nesting_reported: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source
    pub fn new(source: &'a str) -> Self {
        let mut parser = Parser {
            lexer: Lexer::new(source),
            current: Spanned {
                token: Token::Eof,
                pos: SourcePos::default(),
            },
            consumed: 0,
            diagnostics: Vec::new(),
            context: DeclarationContext::default(),
            range_checks: true,
            eof_reported: false,
            depth: 0,
            nesting_reported: false,
        };
        parser.current = parser.next_significant();
        parser
    }

    /// Enable or disable constant array index bound checks
    pub fn range_checks(mut self, enabled: bool) -> Self {
        self.range_checks = enabled;
        self
    }

    /// Parse a whole program
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        log::debug!(
            "parsed program '{}': {} declaration(s), {} diagnostic(s)",
            program.name,
            program.declarations.len(),
            self.diagnostics.len()
        );
        ParseResult {
            program,
            diagnostics: self.diagnostics,
        }
    }

    // ---- token plumbing ----

    /// Pull the next token, turning lexer error tokens into diagnostics
    fn next_significant(&mut self) -> Spanned {
        loop {
            let spanned = self.lexer.next_token();
            match spanned.token {
                Token::Error(message) => {
                    self.diagnostics.push(Diagnostic::lexical(spanned.pos, message));
                }
                _ => return spanned,
            }
        }
    }

    /// Advance to the next token
    fn advance(&mut self) -> Spanned {
        let next = self.next_significant();
        self.consumed += 1;
        std::mem::replace(&mut self.current, next)
    }

    /// Check if current token matches expected
    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(&self.current.token) == std::mem::discriminant(expected)
    }

    /// Consume the current token if it matches
    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, advance if matched
    fn expect(&mut self, expected: Token) -> PResult<SourcePos> {
        if self.check(&expected) {
            Ok(self.advance().pos)
        } else {
            Err(self.error_here())
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, SourcePos)> {
        if let Token::Ident(name) = &self.current.token {
            let name = name.clone();
            let pos = self.advance().pos;
            Ok((name, pos))
        } else {
            Err(self.error_here())
        }
    }

    fn expect_int(&mut self) -> PResult<i64> {
        if let Token::IntLiteral(n) = self.current.token {
            self.advance();
            Ok(n)
        } else {
            Err(self.error_here())
        }
    }

    /// Record a syntax error at the current token
    fn error_here(&mut self) -> Abort {
        if self.current.token == Token::Eof {
            if !self.eof_reported {
                self.eof_reported = true;
                self.diagnostics.push(Diagnostic::unexpected_eof());
            }
        } else {
            self.diagnostics
                .push(Diagnostic::unexpected_token(self.current.pos, &self.current.token));
        }
        Abort
    }

    /// Run a production one nesting level deeper
    ///
    /// Past `MAX_NESTING` the production is not attempted; the first time
    /// this happens a diagnostic is recorded.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            if !self.nesting_reported {
                self.nesting_reported = true;
                self.diagnostics
                    .push(Diagnostic::nesting_too_deep(self.current.pos, MAX_NESTING));
            }
            return Err(Abort);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip to the next statement boundary after an error
    ///
    /// Always consumes at least one token when the failed production
    /// consumed none, so the caller cannot spin on the same token.
    fn synchronize(&mut self, started_at: usize) {
        if self.consumed == started_at && self.current.token != Token::Eof {
            self.advance();
        }
        loop {
            match self.current.token {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::End | Token::Eof => return,
                ref token if token.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// `opt-semi := ';' | empty`
    fn optional_semicolon(&mut self) {
        self.eat(&Token::Semicolon);
    }

    // ---- program structure ----

    fn parse_program(&mut self) -> Program {
        let started_at = self.consumed;
        let name = match self.parse_header() {
            Ok(name) => name,
            Err(Abort) => {
                self.synchronize(started_at);
                String::new()
            }
        };

        let declarations = self.parse_declarations();

        let body = if self.check(&Token::Begin) {
            self.parse_compound_or_recover()
        } else {
            self.error_here();
            // Salvage whatever statements follow so their errors are reported too
            Stmt::Compound(self.parse_statement_list())
        };

        if self.expect(Token::Dot).is_ok() && self.current.token != Token::Eof {
            self.error_here();
        }

        Program {
            name,
            declarations,
            body,
        }
    }

    fn parse_header(&mut self) -> PResult<String> {
        self.expect(Token::Program)?;
        let (name, _) = self.expect_ident()?;
        self.expect(Token::Semicolon)?;
        Ok(name)
    }

    fn parse_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while self.eat(&Token::Var) {
            while matches!(self.current.token, Token::Ident(_)) {
                let started_at = self.consumed;
                match self.parse_declaration() {
                    Ok(decl) => declarations.push(decl),
                    Err(Abort) => self.synchronize(started_at),
                }
            }
        }
        declarations
    }

    /// `ident { ',' ident } ':' type ';'`
    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let mut variables = Vec::new();
        loop {
            let (name, pos) = self.expect_ident()?;
            variables.push(VariableDecl { name, pos });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Colon)?;
        let ty = self.parse_type()?;
        self.expect(Token::Semicolon)?;

        for var in &variables {
            if !self.context.declare(&var.name, ty) {
                self.diagnostics.push(Diagnostic::semantic(
                    var.pos,
                    format!("variable '{}' is already declared", var.name),
                ));
            }
        }

        Ok(Declaration { variables, ty })
    }

    fn parse_type(&mut self) -> PResult<DataType> {
        if !self.check(&Token::Array) {
            return self.parse_scalar_type().map(DataType::from);
        }

        let pos = self.advance().pos;
        self.expect(Token::LBracket)?;
        let low = self.parse_bound()?;
        self.expect(Token::DotDot)?;
        let high = self.parse_bound()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Of)?;
        let element = self.parse_scalar_type()?;

        let array = ArrayType { low, high, element };
        if high < low {
            self.diagnostics.push(Diagnostic::semantic(
                pos,
                format!("array upper bound {} is below lower bound {}", high, low),
            ));
        } else if array.size().is_none() {
            self.diagnostics.push(Diagnostic::semantic(
                pos,
                format!("array range {}..{} is too large", low, high),
            ));
        }
        Ok(DataType::Array(array))
    }

    fn parse_scalar_type(&mut self) -> PResult<ScalarType> {
        let ty = match self.current.token {
            Token::Integer => ScalarType::Integer,
            Token::Real => ScalarType::Real,
            Token::String => ScalarType::String,
            Token::Boolean => ScalarType::Boolean,
            _ => return Err(self.error_here()),
        };
        self.advance();
        Ok(ty)
    }

    /// Array bound: an integer literal, optionally negated
    fn parse_bound(&mut self) -> PResult<i64> {
        let negative = self.eat(&Token::Minus);
        let n = self.expect_int()?;
        Ok(if negative { -n } else { n })
    }

    // ---- statements ----

    fn parse_compound_or_recover(&mut self) -> Stmt {
        let started_at = self.consumed;
        match self.parse_compound() {
            Ok(stmt) => stmt,
            Err(Abort) => {
                self.synchronize(started_at);
                Stmt::Compound(Vec::new())
            }
        }
    }

    /// `begin { statement } end opt-semi`
    fn parse_compound(&mut self) -> PResult<Stmt> {
        self.expect(Token::Begin)?;
        let statements = self.parse_statement_list();
        self.expect(Token::End)?;
        self.optional_semicolon();
        Ok(Stmt::Compound(statements))
    }

    /// Statements up to (not including) `end` or end of input
    fn parse_statement_list(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !matches!(self.current.token, Token::End | Token::Eof) {
            let started_at = self.consumed;
            match self.parse_statement() {
                Ok((stmt, _)) => statements.push(stmt),
                Err(Abort) => self.synchronize(started_at),
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> PResult<(Stmt, Shape)> {
        self.nested(|parser| match parser.current.token {
            Token::If => parser.parse_if(),
            Token::While => parser.parse_while(),
            Token::For => parser.parse_for(),
            Token::Begin => Ok((parser.parse_compound()?, Shape::Matched)),
            _ => Ok((parser.parse_simple()?, Shape::Matched)),
        })
    }

    /// `if` statement, resolving the dangling else
    ///
    /// matched   := IF expr THEN matched ELSE matched
    /// unmatched := IF expr THEN statement
    ///            | IF expr THEN matched ELSE unmatched
    ///
    /// The then-branch is parsed first; an unmatched then-branch has already
    /// had the chance to claim any `else`, so an `else` seen here belongs to
    /// this `if` and the then-branch is necessarily matched.
    fn parse_if(&mut self) -> PResult<(Stmt, Shape)> {
        self.expect(Token::If)?;
        let condition = self.parse_expr()?;
        self.expect(Token::Then)?;
        let (then_branch, then_shape) = self.parse_statement()?;

        if !self.eat(&Token::Else) {
            let stmt = Stmt::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: None,
            };
            return Ok((stmt, Shape::Unmatched));
        }

        debug_assert_eq!(then_shape, Shape::Matched);
        let (else_branch, else_shape) = self.parse_statement()?;
        let stmt = Stmt::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        };
        Ok((stmt, else_shape))
    }

    /// Loops take the shape of their body: a body ending in an open `if`
    /// leaves the loop open too.
    fn parse_while(&mut self) -> PResult<(Stmt, Shape)> {
        self.expect(Token::While)?;
        let condition = self.parse_expr()?;
        self.expect(Token::Do)?;
        let (body, shape) = self.parse_statement()?;
        let stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };
        Ok((stmt, shape))
    }

    fn parse_for(&mut self) -> PResult<(Stmt, Shape)> {
        self.expect(Token::For)?;
        let (variable, pos) = self.expect_ident()?;
        self.expect(Token::Assign)?;
        let start = self.parse_expr()?;
        self.expect(Token::To)?;
        let end = self.parse_expr()?;
        self.expect(Token::Do)?;

        // Undeclared loop variables are implicitly integer
        let declared = self.context.get(&variable).copied();
        match declared {
            None => {
                self.context.declare(&variable, DataType::Integer);
            }
            Some(DataType::Integer) => {}
            Some(_) => self.diagnostics.push(Diagnostic::semantic(
                pos,
                format!("for loop variable '{}' must be an integer", variable),
            )),
        }

        let (body, shape) = self.parse_statement()?;
        let stmt = Stmt::For {
            variable,
            start,
            end,
            body: Box::new(body),
        };
        Ok((stmt, shape))
    }

    /// Assignment, write, writeln and readln
    fn parse_simple(&mut self) -> PResult<Stmt> {
        let stmt = match self.current.token {
            Token::Ident(_) => {
                let (target, pos) = self.expect_ident()?;
                self.expect(Token::Assign)?;
                let value = self.parse_expr()?;
                self.check_scalar_target(&target, pos);
                Stmt::Assign { target, value }
            }
            Token::Write => {
                self.advance();
                self.expect(Token::LParen)?;
                let args = self.parse_write_args()?;
                self.expect(Token::RParen)?;
                Stmt::Write(args)
            }
            Token::Writeln => {
                self.advance();
                let mut args = Vec::new();
                if self.eat(&Token::LParen) {
                    if !self.check(&Token::RParen) {
                        args = self.parse_write_args()?;
                    }
                    self.expect(Token::RParen)?;
                }
                Stmt::Writeln(args)
            }
            Token::Readln => {
                self.advance();
                self.expect(Token::LParen)?;
                let (name, pos) = self.expect_ident()?;
                let stmt = if self.eat(&Token::LBracket) {
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    self.check_indexed(&name, &index, pos);
                    Stmt::ReadlnIndexed { array: name, index }
                } else {
                    self.check_scalar_target(&name, pos);
                    Stmt::Readln { target: name }
                };
                self.expect(Token::RParen)?;
                stmt
            }
            _ => return Err(self.error_here()),
        };
        self.optional_semicolon();
        Ok(stmt)
    }

    /// `arg { ',' arg }` where `arg := expr [ ':' int [ ':' int ] ]`
    fn parse_write_args(&mut self) -> PResult<Vec<WriteArg>> {
        let mut args = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let mut arg = WriteArg::plain(expr);
            if self.eat(&Token::Colon) {
                arg.width = Some(self.expect_int()?);
                if self.eat(&Token::Colon) {
                    arg.precision = Some(self.expect_int()?);
                }
            }
            args.push(arg);
            if !self.eat(&Token::Comma) {
                return Ok(args);
            }
        }
    }

    // ---- semantic checks ----

    /// A plain variable used as a whole: must be declared and not an array
    fn check_scalar_target(&mut self, name: &str, pos: SourcePos) {
        match self.context.get(name) {
            None => self.diagnostics.push(Diagnostic::semantic(
                pos,
                format!("variable '{}' is not declared", name),
            )),
            Some(DataType::Array(_)) => self.diagnostics.push(Diagnostic::semantic(
                pos,
                format!("array '{}' used without an index", name),
            )),
            Some(_) => {}
        }
    }

    /// `name[index]`: must be a declared array; constant indices are
    /// checked against its bounds
    fn check_indexed(&mut self, name: &str, index: &Expr, pos: SourcePos) {
        let array = match self.context.get(name) {
            Some(DataType::Array(array)) => *array,
            Some(_) => {
                self.diagnostics.push(Diagnostic::semantic(
                    pos,
                    format!("variable '{}' is not an array", name),
                ));
                return;
            }
            None => {
                self.diagnostics.push(Diagnostic::semantic(
                    pos,
                    format!("array '{}' is not declared", name),
                ));
                return;
            }
        };

        if !self.range_checks {
            return;
        }
        if let Some(value) = index.constant_value() {
            if !array.contains(value) {
                log::warn!(
                    "range check error while evaluating constants ({} must be between {} and {})",
                    value,
                    array.low,
                    array.high
                );
                self.diagnostics
                    .push(Diagnostic::range(pos, value, array.low, array.high));
            }
        }
    }

    // ---- expressions ----

    /// Parse an expression
    ///
    /// Precedence, low to high: or, and, relational (non-associative),
    /// additive, multiplicative, unary.
    fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_relational()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn current_relop(&self) -> Option<RelOp> {
        match self.current.token {
            Token::Eq => Some(RelOp::Eq),
            Token::NotEq => Some(RelOp::NotEq),
            Token::Lt => Some(RelOp::Lt),
            Token::LtEq => Some(RelOp::LtEq),
            Token::Gt => Some(RelOp::Gt),
            Token::GtEq => Some(RelOp::GtEq),
            _ => None,
        }
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let lhs = self.parse_additive()?;
        let Some(op) = self.current_relop() else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_additive()?;
        if self.current_relop().is_some() {
            return Err(self.error_here());
        }
        Ok(Expr::Relational {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current.token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current.token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.current.token {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Not => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let literal = match &self.current.token {
            Token::IntLiteral(n) => Literal::Integer(*n),
            Token::RealLiteral(n) => Literal::Real(*n),
            Token::StringLiteral(s) => Literal::String(s.clone()),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            Token::Ident(_) => return self.parse_variable(),
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                return Ok(expr);
            }
            _ => return Err(self.error_here()),
        };
        self.advance();
        Ok(Expr::Literal(literal))
    }

    /// `ident` or `ident '[' expr ']'`
    fn parse_variable(&mut self) -> PResult<Expr> {
        let (name, pos) = self.expect_ident()?;
        if !self.eat(&Token::LBracket) {
            self.check_scalar_target(&name, pos);
            return Ok(Expr::Variable(name));
        }
        let index = self.parse_expr()?;
        self.expect(Token::RBracket)?;
        self.check_indexed(&name, &index, pos);
        Ok(Expr::ArrayAccess {
            array: name,
            index: Box::new(index),
        })
    }
}

/// Parse a program with default settings
pub fn parse(source: &str) -> ParseResult {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::diagnostic::DiagnosticKind;

    fn wrap(decls: &str, body: &str) -> String {
        format!("program t;\n{}\nbegin\n{}\nend.", decls, body)
    }

    fn body_of(result: &ParseResult) -> &[Stmt] {
        match &result.program.body {
            Stmt::Compound(stmts) => stmts,
            other => panic!("body is not compound: {:?}", other),
        }
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Integer(n))
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    #[test]
    fn test_minimal_program() {
        let result = parse("program empty; begin end.");
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert_eq!(result.program.name, "empty");
        assert!(result.program.declarations.is_empty());
        assert_eq!(result.program.body, Stmt::Compound(vec![]));
    }

    #[test]
    fn test_declarations() {
        let result = parse(&wrap(
            "var a, b: integer; s: string;\n    v: array[1..5] of real;",
            "",
        ));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let decls = &result.program.declarations;
        assert_eq!(decls.len(), 3);
        let names: Vec<_> = decls[0].variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(decls[0].ty, DataType::Integer);
        assert_eq!(decls[1].ty, DataType::String);
        let array = decls[2].ty.as_array().copied().unwrap();
        assert_eq!(array, ArrayType { low: 1, high: 5, element: ScalarType::Real });
        assert_eq!(array.size(), Some(5));
    }

    #[test]
    fn test_precedence() {
        let result = parse(&wrap("var x: integer;", "x := 2 + 3 * 4"));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let expected = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(int(2)),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(int(3)),
                rhs: Box::new(int(4)),
            }),
        };
        assert_eq!(
            body_of(&result)[0],
            Stmt::Assign { target: "x".to_string(), value: expected }
        );
    }

    #[test]
    fn test_logical_binds_looser_than_relational() {
        let result = parse(&wrap("var a, b: integer; c: boolean;", "c := a < 1 or b > 2 and a = b"));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let Stmt::Assign { value, .. } = &body_of(&result)[0] else {
            panic!("expected assignment");
        };
        let Expr::Logical { op: LogicalOp::Or, lhs, rhs } = value else {
            panic!("expected or at the root: {:?}", value);
        };
        assert!(matches!(**lhs, Expr::Relational { op: RelOp::Lt, .. }));
        assert!(matches!(**rhs, Expr::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn test_unary_minus_and_not() {
        let result = parse(&wrap("var x: integer; b: boolean;", "x := -x * 2; b := not b"));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let Stmt::Assign { value, .. } = &body_of(&result)[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            *value,
            Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(var("x")) }),
                rhs: Box::new(int(2)),
            }
        );
    }

    #[test]
    fn test_relational_is_non_associative() {
        let result = parse(&wrap("var a, b, c: integer; d: boolean;", "d := a < b < c"));
        assert!(!result.is_success());
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Syntax);
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let result = parse(&wrap(
            "var a, b: boolean; x: integer;",
            "if a then if b then x := 1 else x := 2",
        ));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let Stmt::If { then_branch, else_branch, .. } = &body_of(&result)[0] else {
            panic!("expected if");
        };
        assert!(else_branch.is_none(), "outer if must not own the else");
        let Stmt::If { condition, else_branch: inner_else, .. } = then_branch.as_ref() else {
            panic!("expected nested if");
        };
        assert_eq!(*condition, var("b"));
        assert!(inner_else.is_some());
    }

    #[test]
    fn test_else_chain() {
        let result = parse(&wrap(
            "var x: integer;",
            "if x = 1 then x := 10 else if x = 2 then x := 20 else x := 30;",
        ));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let Stmt::If { else_branch: Some(else_branch), .. } = &body_of(&result)[0] else {
            panic!("expected if/else");
        };
        assert!(matches!(
            else_branch.as_ref(),
            Stmt::If { else_branch: Some(_), .. }
        ));
    }

    #[test]
    fn test_semicolons_are_optional() {
        let result = parse(&wrap(
            "var x: integer;",
            "x := 1\nx := 2;\nwriteln\nwriteln('a', x);\nbegin x := 3 end;",
        ));
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert_eq!(body_of(&result).len(), 5);
    }

    #[test]
    fn test_for_declares_loop_variable() {
        let result = parse(&wrap("", "for i := 1 to 3 do writeln(i);"));
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert!(matches!(&body_of(&result)[0], Stmt::For { variable, .. } if variable == "i"));
    }

    #[test]
    fn test_write_formats() {
        let result = parse(&wrap("var r: real;", "write(r:8:2, 'x':3)"));
        assert!(result.is_success(), "{:?}", result.diagnostics);

        let Stmt::Write(args) = &body_of(&result)[0] else {
            panic!("expected write");
        };
        assert_eq!((args[0].width, args[0].precision), (Some(8), Some(2)));
        assert_eq!((args[1].width, args[1].precision), (Some(3), None));
    }

    #[test]
    fn test_readln_forms() {
        let result = parse(&wrap(
            "var n: integer; a: array[1..3] of integer;",
            "readln(n); readln(a[n]);",
        ));
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert_eq!(body_of(&result)[0], Stmt::Readln { target: "n".to_string() });
        assert_eq!(
            body_of(&result)[1],
            Stmt::ReadlnIndexed { array: "a".to_string(), index: var("n") }
        );
    }

    #[test]
    fn test_constant_index_in_bounds() {
        let result = parse(&wrap("var a: array[1..5] of integer; x: integer;", "x := a[3]"));
        assert!(result.is_success(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_constant_index_out_of_bounds() {
        let result = parse(&wrap("var a: array[1..5] of integer; x: integer;", "x := a[6]; x := 1"));
        assert!(!result.is_success());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Range);
        // Parsing carried on past the warning
        assert_eq!(body_of(&result).len(), 2);
    }

    #[test]
    fn test_negative_and_real_constant_indices() {
        let result = parse(&wrap(
            "var a: array[1..5] of integer; x: integer;",
            "readln(a[-1]); x := a[5.5]; x := a[2.0]",
        ));
        let ranges: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Range)
            .collect();
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn test_variable_index_not_checked() {
        let result = parse(&wrap("var a: array[1..5] of integer; i: integer;", "i := a[i + 10]"));
        assert!(result.is_success(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_range_checks_can_be_disabled() {
        let source = wrap("var a: array[1..5] of integer; x: integer;", "x := a[6]");
        let result = Parser::new(&source).range_checks(false).parse();
        assert!(result.is_success(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_undeclared_variable() {
        let result = parse(&wrap("var x: integer;", "y := x; x := z"));
        let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            ["variable 'y' is not declared", "variable 'z' is not declared"]
        );
    }

    #[test]
    fn test_array_misuse() {
        let result = parse(&wrap(
            "var a: array[1..2] of integer; x: integer;",
            "x := a; x := x[1]",
        ));
        let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            ["array 'a' used without an index", "variable 'x' is not an array"]
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        let result = parse(&wrap("var x: integer; x: real;", ""));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "variable 'x' is already declared");
    }

    #[test]
    fn test_reversed_array_bounds() {
        let result = parse(&wrap("var a: array[5..1] of integer;", ""));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Semantic);
    }

    #[test]
    fn test_array_size_overflow() {
        let result = parse(&wrap("var a: array[0..9223372036854775807] of integer;", ""));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Semantic);
        assert_eq!(
            result.diagnostics[0].message,
            "array range 0..9223372036854775807 is too large"
        );

        let result = parse(&wrap("var a: array[-9223372036854775807..9223372036854775807] of real;", ""));
        assert_eq!(result.diagnostics.len(), 1);

        // Largest representable count is still accepted
        let result = parse(&wrap("var a: array[1..9223372036854775807] of integer;", ""));
        assert!(result.is_success(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_moderate_nesting_is_fine() {
        let expr = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        let result = parse(&wrap("var x: integer;", &format!("x := {}", expr)));
        assert!(result.is_success(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_deep_parentheses() {
        let expr = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let result = parse(&wrap("var x: integer;", &format!("x := {}; x := 2", expr)));
        assert_eq!(result.diagnostics.len(), 1, "{:?}", result.diagnostics);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Syntax);
        assert!(result.diagnostics[0].message.starts_with("nesting deeper than"));
        // Parsing resumed after the statement
        assert_eq!(
            body_of(&result),
            [Stmt::Assign { target: "x".to_string(), value: int(2) }]
        );
    }

    #[test]
    fn test_deep_unary_chain() {
        let body = format!("x := {}1", "-".repeat(100_000));
        let result = parse(&wrap("var x: integer;", &body));
        assert_eq!(result.diagnostics.len(), 1, "{:?}", result.diagnostics);
    }

    #[test]
    fn test_deep_blocks() {
        let body = format!("{}{}", "begin ".repeat(100_000), "end ".repeat(100_000));
        let result = parse(&wrap("", &body));
        assert!(!result.is_success());
        assert!(result.diagnostics[0].message.starts_with("nesting deeper than"));
    }

    #[test]
    fn test_syntax_error_position() {
        let result = parse("program t;\nvar x: integer;\nbegin\n  x := * 2;\nend.");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "Syntax error at line 4, column 8: unexpected token '*'"
        );
    }

    #[test]
    fn test_collects_multiple_errors() {
        let result = parse(&wrap(
            "var x: integer;",
            "x := ;\nx := 1;\nwhile do x := 2;\nx := 3",
        ));
        assert_eq!(result.diagnostics.len(), 2, "{:?}", result.diagnostics);
        // The well-formed statements survive in the partial AST
        assert!(body_of(&result).contains(&Stmt::Assign { target: "x".to_string(), value: int(1) }));
        assert!(body_of(&result).contains(&Stmt::Assign { target: "x".to_string(), value: int(3) }));
    }

    #[test]
    fn test_stray_else_is_reported() {
        let result = parse(&wrap("var x: integer;", "x := 1; else x := 2"));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "unexpected token 'else'");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let result = parse("program t; begin writeln('a')");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "Syntax error: unexpected end of input!"
        );
    }

    #[test]
    fn test_lexical_errors_are_collected() {
        let result = parse(&wrap("var x: integer;", "x := 1 @ ;"));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Lexical);
        assert_eq!(body_of(&result).len(), 1);
    }

    #[test]
    fn test_trailing_tokens_after_program() {
        let result = parse("program t; begin end. x");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "unexpected token 'x'");
    }
}
