//! Pascal lexer/tokenizer
//!
//! Converts source text into a stream of tokens. Comments are dropped,
//! keywords are matched case-insensitively and everything else that looks
//! like a word becomes an identifier.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i64),
    RealLiteral(f64),
    StringLiteral(String),
    Ident(String),

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Assign,    // :=
    Eq,        // =
    NotEq,     // <>
    Lt,        // <
    LtEq,      // <=
    Gt,        // >
    GtEq,      // >=

    Semicolon, // ;
    Comma,     // ,
    Colon,     // :
    Dot,       // .
    DotDot,    // ..

    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]

    // Keywords
    And,
    Array,
    Begin,
    Boolean,
    Do,
    Else,
    End,
    False,
    For,
    If,
    Integer,
    Not,
    Of,
    Or,
    Program,
    Readln,
    Real,
    String,
    Then,
    To,
    True,
    Var,
    While,
    Write,
    Writeln,

    // Special
    Eof,
    Error(String),
}

impl Token {
    /// Whether this token can only appear at the start of a statement or
    /// block. Used as a resynchronization point after a syntax error.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Token::Begin
                | Token::If
                | Token::While
                | Token::For
                | Token::Write
                | Token::Writeln
                | Token::Readln
                | Token::Var
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::IntLiteral(n) => return write!(f, "{}", n),
            Token::RealLiteral(n) => return write!(f, "{:?}", n),
            Token::StringLiteral(s) => return write!(f, "'{}'", s),
            Token::Ident(name) => return f.write_str(name),
            Token::Error(msg) => return f.write_str(msg),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Assign => ":=",
            Token::Eq => "=",
            Token::NotEq => "<>",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::And => "and",
            Token::Array => "array",
            Token::Begin => "begin",
            Token::Boolean => "boolean",
            Token::Do => "do",
            Token::Else => "else",
            Token::End => "end",
            Token::False => "false",
            Token::For => "for",
            Token::If => "if",
            Token::Integer => "integer",
            Token::Not => "not",
            Token::Of => "of",
            Token::Or => "or",
            Token::Program => "program",
            Token::Readln => "readln",
            Token::Real => "real",
            Token::String => "string",
            Token::Then => "then",
            Token::To => "to",
            Token::True => "true",
            Token::Var => "var",
            Token::While => "while",
            Token::Write => "write",
            Token::Writeln => "writeln",
            Token::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Source position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A token together with the position of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: SourcePos,
}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?").expect("number pattern"));
static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*").expect("identifier pattern"));
static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'[^']*'").expect("string pattern"));
static BRACE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{[^}]*\}").expect("brace comment pattern"));
static PAREN_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\*(?s:.*?)\*\)").expect("paren comment pattern"));

/// Lexer for Pascal source code
///
/// Also usable as an iterator; iteration yields a single `Eof` token and
/// then stops.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Get the current source position
    pub fn source_pos(&self) -> SourcePos {
        SourcePos {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Current line number (1-based)
    pub fn line(&self) -> usize {
        self.line
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Consume `len` bytes, keeping line and column in sync
    fn bump(&mut self, len: usize) {
        let consumed = &self.source[self.pos..self.pos + len];
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += len;
    }

    /// Skip whitespace and comments
    ///
    /// Returns an error token if a comment runs off the end of the input.
    fn skip_trivia(&mut self) -> Option<Spanned> {
        loop {
            let rest = self.rest();
            let Some(c) = rest.chars().next() else {
                return None;
            };

            if c.is_whitespace() {
                self.bump(c.len_utf8());
            } else if c == '{' {
                match BRACE_COMMENT.find(rest) {
                    Some(m) => self.bump(m.end()),
                    None => return Some(self.unterminated_comment()),
                }
            } else if rest.starts_with("(*") {
                match PAREN_COMMENT.find(rest) {
                    Some(m) => self.bump(m.end()),
                    None => return Some(self.unterminated_comment()),
                }
            } else {
                return None;
            }
        }
    }

    fn unterminated_comment(&mut self) -> Spanned {
        let pos = self.source_pos();
        self.bump(self.rest().len());
        Spanned {
            token: Token::Error("unterminated comment".to_string()),
            pos,
        }
    }

    /// Read the next token
    pub fn next_token(&mut self) -> Spanned {
        if let Some(error) = self.skip_trivia() {
            return error;
        }

        let pos = self.source_pos();
        let token = self.scan();
        Spanned { token, pos }
    }

    fn scan(&mut self) -> Token {
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Token::Eof;
        };

        // Identifiers and keywords
        if c.is_ascii_alphabetic() {
            return self.read_identifier();
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        // Strings
        if c == '\'' {
            return self.read_string();
        }

        // Operators and punctuation
        let next = rest[c.len_utf8()..].chars().next();
        let (token, len) = match (c, next) {
            (':', Some('=')) => (Token::Assign, 2),
            ('<', Some('>')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::LtEq, 2),
            ('>', Some('=')) => (Token::GtEq, 2),
            ('.', Some('.')) => (Token::DotDot, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('=', _) => (Token::Eq, 1),
            (':', _) => (Token::Colon, 1),
            ('.', _) => (Token::Dot, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            (';', _) => (Token::Semicolon, 1),
            (',', _) => (Token::Comma, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            _ => {
                log::warn!("invalid character '{}' at line {}", c, self.line);
                self.bump(c.len_utf8());
                return Token::Error(format!("invalid character '{}'", c));
            }
        };
        self.bump(len);
        token
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let rest = self.rest();
        let len = IDENT.find(rest).map_or(1, |m| m.end());
        let ident = &rest[..len];
        self.bump(len);

        match ident.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "array" => Token::Array,
            "begin" => Token::Begin,
            "boolean" => Token::Boolean,
            "do" => Token::Do,
            "else" => Token::Else,
            "end" => Token::End,
            "false" => Token::False,
            "for" => Token::For,
            "if" => Token::If,
            "integer" => Token::Integer,
            "not" => Token::Not,
            "of" => Token::Of,
            "or" => Token::Or,
            "program" => Token::Program,
            "readln" => Token::Readln,
            "real" => Token::Real,
            "string" => Token::String,
            "then" => Token::Then,
            "to" => Token::To,
            "true" => Token::True,
            "var" => Token::Var,
            "while" => Token::While,
            "write" => Token::Write,
            "writeln" => Token::Writeln,
            _ => Token::Ident(ident.to_string()),
        }
    }

    /// Read a number literal
    ///
    /// `digits.digits` is a real, bare digits an integer. A dot that is not
    /// followed by a digit is left alone so that `1..5` lexes as a range.
    fn read_number(&mut self) -> Token {
        let rest = self.rest();
        let len = NUMBER.find(rest).map_or(1, |m| m.end());
        let text = &rest[..len];
        self.bump(len);

        if text.contains('.') {
            match text.parse::<f64>() {
                Ok(n) => Token::RealLiteral(n),
                Err(_) => Token::Error(format!("invalid real literal {}", text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => Token::IntLiteral(n),
                Err(_) => Token::Error(format!("integer literal {} out of range", text)),
            }
        }
    }

    /// Read a single-quoted string literal, which may span lines
    ///
    /// Without a closing quote the rest of the line is dropped.
    fn read_string(&mut self) -> Token {
        let rest = self.rest();
        match STRING.find(rest) {
            Some(m) => {
                let s = rest[1..m.end() - 1].to_string();
                self.bump(m.end());
                Token::StringLiteral(s)
            }
            None => {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.bump(len);
                Token::Error("unterminated string".to_string())
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Spanned;

    fn next(&mut self) -> Option<Spanned> {
        if self.finished {
            return None;
        }
        let spanned = self.next_token();
        if spanned.token == Token::Eof {
            self.finished = true;
        }
        Some(spanned)
    }
}
