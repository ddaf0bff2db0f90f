use std::cell::Cell;
use std::fmt;
use crate::language::printer::SourcePrinter;
use crate::language::symbol::{ScopeId, SymbolRef};
use crate::language::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

/// One formal parameter: `name : TYPE`.
#[derive(Debug, Clone)]
pub struct Param {
    pub var_node: Box<AstNode>,
    pub type_node: Box<AstNode>,
}

#[derive(Debug, Clone)]
pub struct ProcedureDecl {
    pub name: String,
    pub token: Token,
    pub params: Vec<Param>,
    /// Nested procedures live in the block's declarations.
    pub block: Box<AstNode>,
    /// Filled in by semantic analysis.
    pub symbol: Cell<Option<SymbolRef>>,
    /// Scope holding the parameters and locals, filled in by semantic analysis.
    pub scope: Cell<Option<ScopeId>>,
}

/// Syntax tree of one program. Every node owns its children.
///
/// The `Cell` fields start out empty and are filled in by the semantic
/// analyzer; the interpreter reads them back.
#[derive(Debug, Clone)]
pub enum AstNode {
    Program {
        name: String,
        block: Box<AstNode>,
        scope: Cell<Option<ScopeId>>,
    },
    Block {
        declarations: Vec<AstNode>,
        compound_statement: Box<AstNode>,
    },
    VarDecl {
        var_node: Box<AstNode>,
        type_node: Box<AstNode>,
    },
    ProcedureDecl(ProcedureDecl),
    Type {
        token: Token,
        name: String,
    },
    Compound(Vec<AstNode>),
    Assign {
        left: Box<AstNode>,
        op: Token,
        right: Box<AstNode>,
    },
    BinOp {
        left: Box<AstNode>,
        op: Token,
        right: Box<AstNode>,
    },
    UnaryOp {
        op: Token,
        expr: Box<AstNode>,
    },
    Num {
        token: Token,
        value: Number,
    },
    Var {
        token: Token,
        name: String,
        symbol: Cell<Option<SymbolRef>>,
    },
    NoOp,
    ProcedureCall {
        name: String,
        token: Token,
        args: Vec<AstNode>,
        symbol: Cell<Option<SymbolRef>>,
    },
}

pub trait AstVisitor<'ast, T> {
    type Error;

    fn visit_program(&mut self, name: &'ast str, block: &'ast AstNode, scope: &'ast Cell<Option<ScopeId>>) -> Result<T, Self::Error>;
    fn visit_block(&mut self, declarations: &'ast [AstNode], compound_statement: &'ast AstNode) -> Result<T, Self::Error>;
    fn visit_var_decl(&mut self, var_node: &'ast AstNode, type_node: &'ast AstNode) -> Result<T, Self::Error>;
    fn visit_procedure_decl(&mut self, decl: &'ast ProcedureDecl) -> Result<T, Self::Error>;
    fn visit_type(&mut self, token: &'ast Token, name: &'ast str) -> Result<T, Self::Error>;
    fn visit_compound(&mut self, children: &'ast [AstNode]) -> Result<T, Self::Error>;
    fn visit_assign(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<T, Self::Error>;
    fn visit_bin_op(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<T, Self::Error>;
    fn visit_unary_op(&mut self, op: &'ast Token, expr: &'ast AstNode) -> Result<T, Self::Error>;
    fn visit_num(&mut self, token: &'ast Token, value: Number) -> Result<T, Self::Error>;
    fn visit_var(&mut self, token: &'ast Token, name: &'ast str, symbol: &'ast Cell<Option<SymbolRef>>) -> Result<T, Self::Error>;
    fn visit_no_op(&mut self) -> Result<T, Self::Error>;
    fn visit_procedure_call(&mut self, name: &'ast str, token: &'ast Token, args: &'ast [AstNode], symbol: &'ast Cell<Option<SymbolRef>>) -> Result<T, Self::Error>;
}

impl AstNode {
    pub fn accept<'ast, T, V: AstVisitor<'ast, T>>(&'ast self, visitor: &mut V) -> Result<T, V::Error> {
        match self {
            AstNode::Program { name, block, scope } => visitor.visit_program(name, block, scope),
            AstNode::Block { declarations, compound_statement } =>
                visitor.visit_block(declarations, compound_statement),
            AstNode::VarDecl { var_node, type_node } => visitor.visit_var_decl(var_node, type_node),
            AstNode::ProcedureDecl(decl) => visitor.visit_procedure_decl(decl),
            AstNode::Type { token, name } => visitor.visit_type(token, name),
            AstNode::Compound(children) => visitor.visit_compound(children),
            AstNode::Assign { left, op, right } => visitor.visit_assign(left, op, right),
            AstNode::BinOp { left, op, right } => visitor.visit_bin_op(left, op, right),
            AstNode::UnaryOp { op, expr } => visitor.visit_unary_op(op, expr),
            AstNode::Num { token, value } => visitor.visit_num(token, *value),
            AstNode::Var { token, name, symbol } => visitor.visit_var(token, name, symbol),
            AstNode::NoOp => visitor.visit_no_op(),
            AstNode::ProcedureCall { name, token, args, symbol } =>
                visitor.visit_procedure_call(name, token, args, symbol),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AstNode::Program { .. } => "Program",
            AstNode::Block { .. } => "Block",
            AstNode::VarDecl { .. } => "VarDecl",
            AstNode::ProcedureDecl(_) => "ProcedureDecl",
            AstNode::Type { .. } => "Type",
            AstNode::Compound(_) => "Compound",
            AstNode::Assign { .. } => "Assign",
            AstNode::BinOp { .. } => "BinOp",
            AstNode::UnaryOp { .. } => "UnaryOp",
            AstNode::Num { .. } => "Num",
            AstNode::Var { .. } => "Var",
            AstNode::NoOp => "NoOp",
            AstNode::ProcedureCall { .. } => "ProcedureCall",
        }
    }

    /// Token that best locates this node in the source, if it has one.
    pub fn token(&self) -> Option<&Token> {
        match self {
            AstNode::ProcedureDecl(decl) => Some(&decl.token),
            AstNode::Type { token, .. }
            | AstNode::Num { token, .. }
            | AstNode::Var { token, .. }
            | AstNode::ProcedureCall { token, .. } => Some(token),
            AstNode::Assign { left, op, .. } => left.token().or(Some(op)),
            AstNode::BinOp { op, .. } | AstNode::UnaryOp { op, .. } => Some(op),
            AstNode::VarDecl { var_node, .. } => var_node.token(),
            AstNode::Program { .. } | AstNode::Block { .. } | AstNode::Compound(_) | AstNode::NoOp => None,
        }
    }

    pub fn var(token: Token, name: String) -> Self {
        AstNode::Var { token, name, symbol: Cell::new(None) }
    }
}

impl fmt::Display for AstNode {
    /// Renders the tree back as canonical source text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let source = self.accept(&mut SourcePrinter::new())?;
        f.write_str(&source)
    }
}
