pub mod token;
pub mod error;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod printer;
pub mod symbol;
pub mod semantic;
pub mod interpreter;

pub use error::{Error, ErrorCode, ErrorKind, Result};
pub use ast::AstNode;
pub use lexer::Lexer;
pub use parser::{parse, Parser};
pub use semantic::SemanticAnalyzer;
pub use interpreter::Interpreter;
pub use interpreter::value::Value;
