use std::cell::Cell;
use log::{debug, log, Level};
use crate::language::ast::{AstNode, AstVisitor, Number, ProcedureDecl};
use crate::language::error::{Error, ErrorCode, ErrorKind, Result};
use crate::language::symbol::{BuiltinType, ScopeId, Symbol, SymbolRef, SymbolTable};
use crate::language::token::{Token, TokenType};
use crate::semantic_error;

/// Single-pass checker that resolves every identifier before execution.
///
/// Scopes: `builtins` (level 0) holds the type symbols, the program opens
/// level 1, and every procedure opens one more level for its parameters and
/// locals. Statement visits yield `None`; expression visits yield their type.
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    current_scope: ScopeId,
    log_scope: bool,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let builtins = symbols.push_scope("builtins", None);
        for (name, builtin) in [("INTEGER", BuiltinType::Integer), ("REAL", BuiltinType::Real)] {
            symbols.insert(builtins, Symbol::BuiltinType { name: name.to_string(), builtin });
        }

        SemanticAnalyzer {
            symbols,
            current_scope: builtins,
            log_scope: false,
        }
    }

    /// Reports scope entry/exit and table contents at `info` instead of `trace`.
    pub fn with_scope_logging(mut self, enabled: bool) -> Self {
        self.log_scope = enabled;
        self
    }

    pub fn analyze(&mut self, tree: &AstNode) -> Result<()> {
        debug!("Semantic analysis of {} node", tree.kind_name());
        tree.accept(self)?;
        Ok(())
    }

    /// Checks a standalone expression; only built-in names are in scope.
    pub fn analyze_expression(&mut self, expr: &AstNode) -> Result<BuiltinType> {
        self.expr_type(expr)
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn level(&self) -> Level {
        if self.log_scope { Level::Info } else { Level::Trace }
    }

    fn enter_scope(&mut self, scope: ScopeId) {
        self.current_scope = scope;
        log!(self.level(), "ENTER scope: {}", self.symbols.scope(scope).scope_name);
    }

    fn leave_scope(&mut self) {
        let table = self.symbols.scope(self.current_scope);
        log!(self.level(), "{}", table);
        log!(self.level(), "LEAVE scope: {}", table.scope_name);
        if let Some(enclosing) = table.enclosing_scope {
            self.current_scope = enclosing;
        }
    }

    fn expr_type(&mut self, node: &AstNode) -> Result<BuiltinType> {
        match node.accept(self)? {
            Some(builtin) => Ok(builtin),
            None => Err(match node.token() {
                Some(token) => Error::at_token(
                    ErrorKind::Semantic,
                    ErrorCode::WrongSymbolKind,
                    format!("{} is not an expression", node.kind_name()),
                    token,
                ),
                None => Error {
                    kind: ErrorKind::Semantic,
                    code: ErrorCode::WrongSymbolKind,
                    message: format!("{} is not an expression", node.kind_name()),
                    lexeme: None,
                    line: None,
                    column: None,
                },
            }),
        }
    }

    fn resolve_type(&self, type_node: &AstNode) -> Result<(SymbolRef, BuiltinType)> {
        let AstNode::Type { token, name } = type_node else {
            unreachable!("parser only produces Type nodes for type specs");
        };

        match self.symbols.lookup(self.current_scope, name) {
            Some(type_ref) => match self.symbols.get(type_ref) {
                Symbol::BuiltinType { builtin, .. } => Ok((type_ref, *builtin)),
                other => semantic_error!(
                    ErrorCode::WrongSymbolKind,
                    format!("'{}' is a {}, not a type", name, other.category()),
                    token
                ),
            },
            None => semantic_error!(ErrorCode::IdNotFound, format!("Unknown type '{}'", name), token),
        }
    }

    /// Declares `var_node` in the current scope with the type named by `type_node`.
    fn declare_var(&mut self, var_node: &AstNode, type_node: &AstNode) -> Result<(SymbolRef, BuiltinType)> {
        let AstNode::Var { token, name, symbol } = var_node else {
            unreachable!("parser only produces Var nodes for declared names");
        };

        let (type_ref, builtin) = self.resolve_type(type_node)?;
        let var = Symbol::Var { name: name.clone(), type_ref, builtin };

        match self.symbols.insert(self.current_scope, var) {
            Some(var_ref) => {
                symbol.set(Some(var_ref));
                Ok((var_ref, builtin))
            }
            None => semantic_error!(ErrorCode::DuplicateId, format!("Duplicate identifier '{}' found", name), token),
        }
    }

    fn check_assignable(&self, target: BuiltinType, value: BuiltinType, what: &str, token: &Token) -> Result<()> {
        if target.accepts(value) {
            Ok(())
        } else {
            semantic_error!(
                ErrorCode::IncompatibleTypes,
                format!("Cannot use a {} value for {} of type {}", value, what, target),
                token
            )
        }
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ast> AstVisitor<'ast, Option<BuiltinType>> for SemanticAnalyzer {
    type Error = Error;

    fn visit_program(&mut self, name: &'ast str, block: &'ast AstNode, scope: &'ast Cell<Option<ScopeId>>) -> Result<Option<BuiltinType>> {
        let global = self.symbols.push_scope(name, Some(self.current_scope));
        scope.set(Some(global));
        self.enter_scope(global);

        block.accept(self)?;

        self.leave_scope();
        Ok(None)
    }

    fn visit_block(&mut self, declarations: &'ast [AstNode], compound_statement: &'ast AstNode) -> Result<Option<BuiltinType>> {
        for declaration in declarations {
            declaration.accept(self)?;
        }
        compound_statement.accept(self)?;
        Ok(None)
    }

    fn visit_var_decl(&mut self, var_node: &'ast AstNode, type_node: &'ast AstNode) -> Result<Option<BuiltinType>> {
        self.declare_var(var_node, type_node)?;
        Ok(None)
    }

    fn visit_procedure_decl(&mut self, decl: &'ast ProcedureDecl) -> Result<Option<BuiltinType>> {
        let parent = self.current_scope;

        // The symbol goes in before the body so the procedure can call itself.
        let body_scope = self.symbols.push_scope(&decl.name, Some(parent));
        let procedure = Symbol::Procedure {
            name: decl.name.clone(),
            params: Vec::new(),
            param_types: Vec::new(),
            body_scope,
        };
        let Some(proc_ref) = self.symbols.insert(parent, procedure) else {
            return semantic_error!(
                ErrorCode::DuplicateId,
                format!("Duplicate identifier '{}' found", decl.name),
                &decl.token
            );
        };
        decl.symbol.set(Some(proc_ref));
        decl.scope.set(Some(body_scope));
        self.enter_scope(body_scope);

        let mut param_refs = Vec::with_capacity(decl.params.len());
        let mut param_types = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let (param_ref, builtin) = self.declare_var(&param.var_node, &param.type_node)?;
            param_refs.push(param_ref);
            param_types.push(builtin);
        }
        if let Symbol::Procedure { params, param_types: types, .. } = self.symbols.get_mut(proc_ref) {
            *params = param_refs;
            *types = param_types;
        }

        decl.block.accept(self)?;

        self.leave_scope();
        Ok(None)
    }

    fn visit_type(&mut self, _token: &'ast Token, _name: &'ast str) -> Result<Option<BuiltinType>> {
        Ok(None)
    }

    fn visit_compound(&mut self, children: &'ast [AstNode]) -> Result<Option<BuiltinType>> {
        for child in children {
            child.accept(self)?;
        }
        Ok(None)
    }

    fn visit_assign(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<Option<BuiltinType>> {
        let value = self.expr_type(right)?;
        let target = self.expr_type(left)?;
        let token = left.token().unwrap_or(op);
        self.check_assignable(target, value, &format!("variable '{}'", token), token)?;
        Ok(None)
    }

    fn visit_bin_op(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<Option<BuiltinType>> {
        let lhs = self.expr_type(left)?;
        let rhs = self.expr_type(right)?;

        let result = match op.token_type {
            TokenType::FloatDiv => BuiltinType::Real,
            TokenType::IntegerDiv => {
                if lhs != BuiltinType::Integer || rhs != BuiltinType::Integer {
                    return semantic_error!(
                        ErrorCode::IncompatibleTypes,
                        format!("DIV needs INTEGER operands, found {} and {}", lhs, rhs),
                        op
                    );
                }
                BuiltinType::Integer
            }
            _ => lhs.promote(rhs),
        };
        Ok(Some(result))
    }

    fn visit_unary_op(&mut self, _op: &'ast Token, expr: &'ast AstNode) -> Result<Option<BuiltinType>> {
        self.expr_type(expr).map(Some)
    }

    fn visit_num(&mut self, _token: &'ast Token, value: Number) -> Result<Option<BuiltinType>> {
        Ok(Some(match value {
            Number::Integer(_) => BuiltinType::Integer,
            Number::Real(_) => BuiltinType::Real,
        }))
    }

    fn visit_var(&mut self, token: &'ast Token, name: &'ast str, symbol: &'ast Cell<Option<SymbolRef>>) -> Result<Option<BuiltinType>> {
        let Some(var_ref) = self.symbols.lookup(self.current_scope, name) else {
            return semantic_error!(ErrorCode::IdNotFound, format!("Identifier not found: '{}'", name), token);
        };

        match self.symbols.get(var_ref) {
            Symbol::Var { builtin, .. } => {
                symbol.set(Some(var_ref));
                Ok(Some(*builtin))
            }
            other => semantic_error!(
                ErrorCode::WrongSymbolKind,
                format!("'{}' is a {}, not a variable", name, other.category()),
                token
            ),
        }
    }

    fn visit_no_op(&mut self) -> Result<Option<BuiltinType>> {
        Ok(None)
    }

    fn visit_procedure_call(&mut self, name: &'ast str, token: &'ast Token, args: &'ast [AstNode], symbol: &'ast Cell<Option<SymbolRef>>) -> Result<Option<BuiltinType>> {
        let Some(proc_ref) = self.symbols.lookup(self.current_scope, name) else {
            return semantic_error!(ErrorCode::IdNotFound, format!("Procedure not found: '{}'", name), token);
        };

        let param_types = match self.symbols.get(proc_ref) {
            Symbol::Procedure { param_types, .. } => param_types.clone(),
            other => {
                return semantic_error!(
                    ErrorCode::WrongSymbolKind,
                    format!("'{}' is a {}, not a procedure", name, other.category()),
                    token
                );
            }
        };

        if args.len() != param_types.len() {
            return semantic_error!(
                ErrorCode::WrongParamsNum,
                format!("Procedure '{}' takes {} argument(s) but {} were given", name, param_types.len(), args.len()),
                token
            );
        }

        for (index, (arg, param_type)) in args.iter().zip(param_types).enumerate() {
            let arg_type = self.expr_type(arg)?;
            let at = arg.token().unwrap_or(token);
            self.check_assignable(param_type, arg_type, &format!("argument {} of '{}'", index + 1, name), at)?;
        }

        symbol.set(Some(proc_ref));
        Ok(None)
    }
}
