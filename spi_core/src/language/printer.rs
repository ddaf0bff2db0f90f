use std::cell::Cell;
use std::fmt;
use crate::language::ast::{AstNode, AstVisitor, Number, ProcedureDecl};
use crate::language::symbol::{ScopeId, SymbolRef};
use crate::language::token::Token;

const INDENT: &str = "   ";

/// Renders a tree as canonical source: upper-case keywords, one declaration
/// or statement per line, fully parenthesized binary operations.
pub struct SourcePrinter {
    depth: usize,
}

impl SourcePrinter {
    pub fn new() -> Self {
        SourcePrinter { depth: 0 }
    }

    fn pad(&self) -> String {
        INDENT.repeat(self.depth)
    }

    fn expression(&mut self, node: &AstNode) -> Result<String, fmt::Error> {
        node.accept(self)
    }
}

impl Default for SourcePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ast> AstVisitor<'ast, String> for SourcePrinter {
    type Error = fmt::Error;

    fn visit_program(&mut self, name: &'ast str, block: &'ast AstNode, _scope: &'ast Cell<Option<ScopeId>>) -> Result<String, Self::Error> {
        let body = block.accept(self)?;
        Ok(format!("PROGRAM {};\n{}.\n", name, body))
    }

    fn visit_block(&mut self, declarations: &'ast [AstNode], compound_statement: &'ast AstNode) -> Result<String, Self::Error> {
        let mut out = String::new();
        let vars: Vec<&AstNode> = declarations.iter().filter(|d| matches!(d, AstNode::VarDecl { .. })).collect();

        if !vars.is_empty() {
            out.push_str(&format!("{}VAR\n", self.pad()));
            self.depth += 1;
            for decl in vars {
                out.push_str(&format!("{}{};\n", self.pad(), decl.accept(self)?));
            }
            self.depth -= 1;
        }

        for decl in declarations.iter().filter(|d| matches!(d, AstNode::ProcedureDecl(_))) {
            out.push_str(&decl.accept(self)?);
        }

        out.push_str(&self.pad());
        out.push_str(&compound_statement.accept(self)?);
        Ok(out)
    }

    fn visit_var_decl(&mut self, var_node: &'ast AstNode, type_node: &'ast AstNode) -> Result<String, Self::Error> {
        Ok(format!("{} : {}", self.expression(var_node)?, type_node.accept(self)?))
    }

    fn visit_procedure_decl(&mut self, decl: &'ast ProcedureDecl) -> Result<String, Self::Error> {
        let mut header = format!("{}PROCEDURE {}", self.pad(), decl.name);
        if !decl.params.is_empty() {
            let mut params = Vec::with_capacity(decl.params.len());
            for param in &decl.params {
                params.push(format!("{} : {}", self.expression(&param.var_node)?, param.type_node.accept(self)?));
            }
            header.push_str(&format!("({})", params.join("; ")));
        }

        self.depth += 1;
        let body = decl.block.accept(self);
        self.depth -= 1;

        Ok(format!("{};\n{};\n", header, body?))
    }

    fn visit_type(&mut self, _token: &'ast Token, name: &'ast str) -> Result<String, Self::Error> {
        Ok(name.to_ascii_uppercase())
    }

    fn visit_compound(&mut self, children: &'ast [AstNode]) -> Result<String, Self::Error> {
        let statements: Vec<&AstNode> = children.iter().filter(|c| !matches!(c, AstNode::NoOp)).collect();
        if statements.is_empty() {
            return Ok(format!("BEGIN\n{}END", self.pad()));
        }

        self.depth += 1;
        let mut lines = Vec::with_capacity(statements.len());
        for statement in statements {
            lines.push(format!("{}{}", self.pad(), statement.accept(self)?));
        }
        self.depth -= 1;

        Ok(format!("BEGIN\n{}\n{}END", lines.join(";\n"), self.pad()))
    }

    fn visit_assign(&mut self, left: &'ast AstNode, _op: &'ast Token, right: &'ast AstNode) -> Result<String, Self::Error> {
        Ok(format!("{} := {}", self.expression(left)?, self.expression(right)?))
    }

    fn visit_bin_op(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<String, Self::Error> {
        Ok(format!("({} {} {})", self.expression(left)?, op, self.expression(right)?))
    }

    fn visit_unary_op(&mut self, op: &'ast Token, expr: &'ast AstNode) -> Result<String, Self::Error> {
        Ok(format!("{}{}", op, self.expression(expr)?))
    }

    fn visit_num(&mut self, token: &'ast Token, _value: Number) -> Result<String, Self::Error> {
        Ok(token.value())
    }

    fn visit_var(&mut self, _token: &'ast Token, name: &'ast str, _symbol: &'ast Cell<Option<SymbolRef>>) -> Result<String, Self::Error> {
        Ok(name.to_string())
    }

    fn visit_no_op(&mut self) -> Result<String, Self::Error> {
        Ok(String::new())
    }

    fn visit_procedure_call(&mut self, name: &'ast str, _token: &'ast Token, args: &'ast [AstNode], _symbol: &'ast Cell<Option<SymbolRef>>) -> Result<String, Self::Error> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.expression(arg)?);
        }
        Ok(format!("{}({})", name, rendered.join(", ")))
    }
}
