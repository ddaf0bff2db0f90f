use std::collections::HashMap;
use std::fmt;
use lazy_static::lazy_static;

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    Program,            // PROGRAM
    Var,                // VAR
    Procedure,          // PROCEDURE
    Begin,              // BEGIN
    End,                // END
    Integer,            // INTEGER
    Real,               // REAL
    IntegerDiv,         // DIV
    // -------- //
    IntegerConst(i64),  // 1234
    RealConst(f64),     // 3.14
    Id(String),         // identifiers
    // -------- //
    Plus,               // +
    Minus,              // -
    Mul,                // *
    FloatDiv,           // /
    Assign,             // :=
    // -------- //
    LParen,             // (
    RParen,             // )
    Semi,               // ;
    Dot,                // .
    Colon,              // :
    Comma,              // ,
    Eof,
}

lazy_static! {
    /// Reserved words keyed by their canonical (upper case) spelling.
    pub static ref RESERVED_KEYWORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("PROGRAM", TokenType::Program);
        m.insert("VAR", TokenType::Var);
        m.insert("PROCEDURE", TokenType::Procedure);
        m.insert("BEGIN", TokenType::Begin);
        m.insert("END", TokenType::End);
        m.insert("INTEGER", TokenType::Integer);
        m.insert("REAL", TokenType::Real);
        m.insert("DIV", TokenType::IntegerDiv);
        m
    };
}

impl TokenType {
    /// Name of the token kind, independent of any payload.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TokenType::Program => "PROGRAM",
            TokenType::Var => "VAR",
            TokenType::Procedure => "PROCEDURE",
            TokenType::Begin => "BEGIN",
            TokenType::End => "END",
            TokenType::Integer => "INTEGER",
            TokenType::Real => "REAL",
            TokenType::IntegerDiv => "INTEGER_DIV",
            TokenType::IntegerConst(_) => "INTEGER_CONST",
            TokenType::RealConst(_) => "REAL_CONST",
            TokenType::Id(_) => "ID",
            TokenType::Plus => "PLUS",
            TokenType::Minus => "MINUS",
            TokenType::Mul => "MUL",
            TokenType::FloatDiv => "FLOAT_DIV",
            TokenType::Assign => "ASSIGN",
            TokenType::LParen => "LPAREN",
            TokenType::RParen => "RPAREN",
            TokenType::Semi => "SEMI",
            TokenType::Dot => "DOT",
            TokenType::Colon => "COLON",
            TokenType::Comma => "COMMA",
            TokenType::Eof => "EOF",
        }
    }

    pub fn same_kind(&self, other: &TokenType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize) -> Self {
        Token { token_type, line, column }
    }

    /// Lexical value as it should be reported in diagnostics.
    pub fn value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenType::Program => write!(f, "PROGRAM"),
            TokenType::Var => write!(f, "VAR"),
            TokenType::Procedure => write!(f, "PROCEDURE"),
            TokenType::Begin => write!(f, "BEGIN"),
            TokenType::End => write!(f, "END"),
            TokenType::Integer => write!(f, "INTEGER"),
            TokenType::Real => write!(f, "REAL"),
            TokenType::IntegerDiv => write!(f, "DIV"),
            TokenType::IntegerConst(n) => write!(f, "{}", n),
            TokenType::RealConst(r) if r.fract() == 0.0 => write!(f, "{:.1}", r),
            TokenType::RealConst(r) => write!(f, "{}", r),
            TokenType::Id(id) => write!(f, "{}", id),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Mul => write!(f, "*"),
            TokenType::FloatDiv => write!(f, "/"),
            TokenType::Assign => write!(f, ":="),
            TokenType::LParen => write!(f, "("),
            TokenType::RParen => write!(f, ")"),
            TokenType::Semi => write!(f, ";"),
            TokenType::Dot => write!(f, "."),
            TokenType::Colon => write!(f, ":"),
            TokenType::Comma => write!(f, ","),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token_type)
    }
}
