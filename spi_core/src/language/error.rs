use std::fmt;
use derive_more::Display;
use crate::language::token::Token;

/// Pipeline stage that raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[display("Lexer")]
    Lexer,
    #[display("Parser")]
    Parser,
    #[display("Semantic")]
    Semantic,
    #[display("Runtime")]
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorCode {
    #[display("INVALID_CHARACTER")]
    InvalidCharacter,
    #[display("UNTERMINATED_COMMENT")]
    UnterminatedComment,
    #[display("INVALID_NUMBER")]
    InvalidNumber,
    #[display("UNEXPECTED_TOKEN")]
    UnexpectedToken,
    #[display("UNEXPECTED_EOF")]
    UnexpectedEof,
    #[display("NESTING_TOO_DEEP")]
    NestingTooDeep,
    #[display("DUPLICATE_ID")]
    DuplicateId,
    #[display("ID_NOT_FOUND")]
    IdNotFound,
    #[display("WRONG_PARAMS_NUM")]
    WrongParamsNum,
    #[display("WRONG_SYMBOL_KIND")]
    WrongSymbolKind,
    #[display("INCOMPATIBLE_TYPES")]
    IncompatibleTypes,
    #[display("DIVISION_BY_ZERO")]
    DivisionByZero,
    #[display("INTEGER_OVERFLOW")]
    IntegerOverflow,
    #[display("REAL_OVERFLOW")]
    RealOverflow,
    #[display("TYPE_MISMATCH")]
    TypeMismatch,
    #[display("UNINITIALIZED_VARIABLE")]
    UninitializedVariable,
    #[display("UNRESOLVED_SYMBOL")]
    UnresolvedSymbol,
    #[display("RECURSION_LIMIT")]
    RecursionLimit,
    #[display("STACK_UNAVAILABLE")]
    StackUnavailable,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
    /// Lexical value of the offending token, when there is one.
    pub lexeme: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Error {
    pub fn at_token(kind: ErrorKind, code: ErrorCode, message: impl Into<String>, token: &Token) -> Self {
        Error {
            kind,
            code,
            message: message.into(),
            lexeme: Some(token.value()),
            line: Some(token.line),
            column: Some(token.column),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.line, &self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{} error [{}]: {} (line {}, column {})", self.kind, self.code, self.message, line, column)
            }
            (Some(line), None) => {
                write!(f, "{} error [{}]: {} (line {})", self.kind, self.code, self.message, line)
            }
            _ => {
                write!(f, "{} error [{}]: {}", self.kind, self.code, self.message)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! lexer_error {
    ($code:expr, $msg:expr, $lexeme:expr, $line:expr, $col:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Lexer,
            code: $code,
            message: $msg.to_string(),
            lexeme: Some($lexeme.to_string()),
            line: Some($line),
            column: Some($col),
        })
    };
}

#[macro_export]
macro_rules! parser_error {
    ($code:expr, $msg:expr, $token:expr) => {
        Err($crate::language::error::Error::at_token(
            $crate::language::error::ErrorKind::Parser,
            $code,
            $msg.to_string(),
            $token,
        ))
    };
}

#[macro_export]
macro_rules! semantic_error {
    ($code:expr, $msg:expr, $token:expr) => {
        Err($crate::language::error::Error::at_token(
            $crate::language::error::ErrorKind::Semantic,
            $code,
            $msg.to_string(),
            $token,
        ))
    };
}

#[macro_export]
macro_rules! runtime_error {
    ($code:expr, $msg:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Runtime,
            code: $code,
            message: $msg.to_string(),
            lexeme: None,
            line: None,
            column: None,
        })
    };
    ($code:expr, $msg:expr, $token:expr) => {
        Err($crate::language::error::Error::at_token(
            $crate::language::error::ErrorKind::Runtime,
            $code,
            $msg.to_string(),
            $token,
        ))
    };
}
