pub mod call_stack;
pub mod evaluator;
pub mod value;

use std::cell::Cell;
use std::collections::HashMap;
use log::{debug, info, log, warn, Level};
use crate::language::ast::{AstNode, AstVisitor, Number, ProcedureDecl};
use crate::language::error::{Error, ErrorCode, ErrorKind, Result};
use crate::language::symbol::{BuiltinType, ScopeId, SymbolRef};
use crate::language::token::Token;
use crate::runtime_error;
use call_stack::{ActivationRecord, ArType, CallStack, Memory, StackAction, StackEvent};
use value::Value;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Highest accepted call depth. Every record also costs native frames, and
/// `spi_core::run_source` sizes its thread stack for this many.
pub const MAX_CALL_DEPTH_LIMIT: usize = 2048;

/// Tree-walking interpreter over an analyzed tree.
///
/// Variables are found through the `SymbolRef` the semantic analyzer stored
/// in each `Var` node: the scope of that symbol names the activation record
/// to use, reached from the top of the stack by following static links.
pub struct Interpreter<'ast> {
    tree: &'ast AstNode,
    call_stack: CallStack,
    procedures: HashMap<SymbolRef, &'ast ProcedureDecl>,
    declared_types: HashMap<SymbolRef, BuiltinType>,
    global_memory: Memory,
    events: Vec<StackEvent>,
    log_stack: bool,
    max_call_depth: usize,
}

impl<'ast> Interpreter<'ast> {
    pub fn new(tree: &'ast AstNode) -> Self {
        Interpreter {
            tree,
            call_stack: CallStack::new(),
            procedures: HashMap::new(),
            declared_types: HashMap::new(),
            global_memory: Memory::new(),
            events: Vec::new(),
            log_stack: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Reports every push and pop at `info` and keeps a [`StackEvent`] for each.
    pub fn with_stack_logging(mut self, enabled: bool) -> Self {
        self.log_stack = enabled;
        self
    }

    /// Most activation records allowed on the stack at once, program included.
    /// Values above [`MAX_CALL_DEPTH_LIMIT`] are clamped to it.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        if depth > MAX_CALL_DEPTH_LIMIT {
            warn!("Call depth {} clamped to {}", depth, MAX_CALL_DEPTH_LIMIT);
        }
        self.max_call_depth = depth.min(MAX_CALL_DEPTH_LIMIT);
        self
    }

    pub fn interpret(&mut self) -> Result<()> {
        debug!("Interpreting {} node", self.tree.kind_name());
        let tree = self.tree;
        tree.accept(self)?;
        info!("Program finished with {} global value(s)", self.global_memory.len());
        Ok(())
    }

    /// Evaluates the tree as a standalone expression.
    pub fn evaluate(&mut self) -> Result<Value> {
        let tree = self.tree;
        self.value_of(tree)
    }

    /// Values left in the program's activation record after it finished.
    pub fn global_memory(&self) -> &Memory {
        &self.global_memory
    }

    pub fn stack_events(&self) -> &[StackEvent] {
        &self.events
    }

    pub fn into_parts(self) -> (Memory, Vec<StackEvent>) {
        (self.global_memory, self.events)
    }

    fn value_of(&mut self, node: &'ast AstNode) -> Result<Value> {
        match node.accept(self)? {
            Some(value) => Ok(value),
            None => Err(Error {
                kind: ErrorKind::Runtime,
                code: ErrorCode::TypeMismatch,
                message: format!("{} does not produce a value", node.kind_name()),
                lexeme: node.token().map(Token::value),
                line: node.token().map(|t| t.line),
                column: node.token().map(|t| t.column),
            }),
        }
    }

    fn level(&self) -> Level {
        if self.log_stack { Level::Info } else { Level::Trace }
    }

    fn trace_stack(&mut self, action: StackAction) {
        let Some(top) = self.call_stack.peek() else {
            return;
        };
        log!(self.level(), "{}: {} {}", action, top.ar_type, top.name);
        log!(self.level(), "{}", self.call_stack);
        if self.log_stack {
            let record = top.clone();
            self.events.push(StackEvent { action, record });
        }
    }

    /// Runs `block` inside `record`, popping the record on every exit path.
    fn activate(&mut self, record: ActivationRecord, block: &'ast AstNode) -> Result<ActivationRecord> {
        self.call_stack.push(record);
        self.trace_stack(StackAction::Enter);

        let result = block.accept(self);

        self.trace_stack(StackAction::Leave);
        let record = self.call_stack.pop();
        result?;
        record.ok_or_else(|| Error {
            kind: ErrorKind::Runtime,
            code: ErrorCode::UnresolvedSymbol,
            message: "Call stack underflow".to_string(),
            lexeme: None,
            line: None,
            column: None,
        })
    }

    fn resolve(&self, token: &Token, name: &str, symbol: &Cell<Option<SymbolRef>>) -> Result<(SymbolRef, usize)> {
        let Some(var_ref) = symbol.get() else {
            return runtime_error!(
                ErrorCode::UnresolvedSymbol,
                format!("'{}' was not resolved by semantic analysis", name),
                token
            );
        };
        match self.call_stack.frame_for(var_ref.scope) {
            Some(frame) => Ok((var_ref, frame)),
            None => runtime_error!(
                ErrorCode::UnresolvedSymbol,
                format!("No active frame holds '{}'", name),
                token
            ),
        }
    }

    fn declare(&mut self, var_node: &AstNode, type_node: &AstNode) -> Option<(SymbolRef, BuiltinType)> {
        let (AstNode::Var { symbol, .. }, AstNode::Type { name, .. }) = (var_node, type_node) else {
            return None;
        };
        let builtin = if name.eq_ignore_ascii_case("REAL") { BuiltinType::Real } else { BuiltinType::Integer };
        let var_ref = symbol.get()?;
        self.declared_types.insert(var_ref, builtin);
        Some((var_ref, builtin))
    }

    fn store(&self, var_ref: SymbolRef, value: Value, name: &str, token: &Token) -> Result<Value> {
        let Some(target) = self.declared_types.get(&var_ref).copied() else {
            return Ok(value);
        };
        match value.coerce_to(target) {
            Some(value) => Ok(value),
            None => runtime_error!(
                ErrorCode::TypeMismatch,
                format!("Cannot store a {} value in '{}' of type {}", value.builtin(), name, target),
                token
            ),
        }
    }
}

impl<'ast> AstVisitor<'ast, Option<Value>> for Interpreter<'ast> {
    type Error = Error;

    fn visit_program(&mut self, name: &'ast str, block: &'ast AstNode, scope: &'ast Cell<Option<ScopeId>>) -> Result<Option<Value>> {
        let record = ActivationRecord::new(name, ArType::Program, 1).with_scope(scope.get());
        let record = self.activate(record, block)?;
        self.global_memory = record.into_members();
        Ok(None)
    }

    fn visit_block(&mut self, declarations: &'ast [AstNode], compound_statement: &'ast AstNode) -> Result<Option<Value>> {
        for declaration in declarations {
            declaration.accept(self)?;
        }
        compound_statement.accept(self)
    }

    fn visit_var_decl(&mut self, var_node: &'ast AstNode, type_node: &'ast AstNode) -> Result<Option<Value>> {
        self.declare(var_node, type_node);
        Ok(None)
    }

    fn visit_procedure_decl(&mut self, decl: &'ast ProcedureDecl) -> Result<Option<Value>> {
        if let Some(proc_ref) = decl.symbol.get() {
            self.procedures.insert(proc_ref, decl);
        }
        Ok(None)
    }

    fn visit_type(&mut self, _token: &'ast Token, _name: &'ast str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn visit_compound(&mut self, children: &'ast [AstNode]) -> Result<Option<Value>> {
        for child in children {
            child.accept(self)?;
        }
        Ok(None)
    }

    fn visit_assign(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<Option<Value>> {
        let AstNode::Var { token, name, symbol } = left else {
            return runtime_error!(ErrorCode::TypeMismatch, format!("Cannot assign to {}", left.kind_name()), op);
        };

        let value = self.value_of(right)?;
        let (var_ref, frame) = self.resolve(token, name, symbol)?;
        let value = self.store(var_ref, value, name, token)?;

        if let Some(record) = self.call_stack.get_mut(frame) {
            record.set(name, value);
        }
        Ok(None)
    }

    fn visit_bin_op(&mut self, left: &'ast AstNode, op: &'ast Token, right: &'ast AstNode) -> Result<Option<Value>> {
        let lhs = self.value_of(left)?;
        let rhs = self.value_of(right)?;
        evaluator::binary(op, lhs, rhs).map(Some)
    }

    fn visit_unary_op(&mut self, op: &'ast Token, expr: &'ast AstNode) -> Result<Option<Value>> {
        let operand = self.value_of(expr)?;
        evaluator::unary(op, operand).map(Some)
    }

    fn visit_num(&mut self, _token: &'ast Token, value: Number) -> Result<Option<Value>> {
        Ok(Some(Value::from(value)))
    }

    fn visit_var(&mut self, token: &'ast Token, name: &'ast str, symbol: &'ast Cell<Option<SymbolRef>>) -> Result<Option<Value>> {
        let (_, frame) = self.resolve(token, name, symbol)?;
        match self.call_stack.get(frame).and_then(|record| record.get(name)) {
            Some(value) => Ok(Some(value)),
            None => runtime_error!(
                ErrorCode::UninitializedVariable,
                format!("Variable '{}' is used before it is assigned", name),
                token
            ),
        }
    }

    fn visit_no_op(&mut self) -> Result<Option<Value>> {
        Ok(None)
    }

    fn visit_procedure_call(&mut self, name: &'ast str, token: &'ast Token, args: &'ast [AstNode], symbol: &'ast Cell<Option<SymbolRef>>) -> Result<Option<Value>> {
        let Some(decl) = symbol.get().and_then(|proc_ref| self.procedures.get(&proc_ref).copied()) else {
            return runtime_error!(
                ErrorCode::UnresolvedSymbol,
                format!("Procedure '{}' was not resolved by semantic analysis", name),
                token
            );
        };
        if args.len() != decl.params.len() {
            return runtime_error!(
                ErrorCode::WrongParamsNum,
                format!("Procedure '{}' takes {} argument(s) but {} were given", name, decl.params.len(), args.len()),
                token
            );
        }
        if self.call_stack.depth() >= self.max_call_depth {
            return runtime_error!(
                ErrorCode::RecursionLimit,
                format!("Call to '{}' exceeds the maximum call depth of {}", name, self.max_call_depth),
                token
            );
        }

        // Arguments are evaluated in the caller's frame before the callee exists.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.value_of(arg)?);
        }

        let declared_in = decl.symbol.get().map(|proc_ref| proc_ref.scope);
        let Some(static_link) = declared_in.and_then(|scope| self.call_stack.frame_for(scope)) else {
            return runtime_error!(
                ErrorCode::UnresolvedSymbol,
                format!("No active frame encloses procedure '{}'", name),
                token
            );
        };
        let nesting_level = self.call_stack.get(static_link).map_or(1, |record| record.nesting_level) + 1;

        let mut record = ActivationRecord::new(&decl.name, ArType::Procedure, nesting_level)
            .with_scope(decl.scope.get())
            .with_static_link(static_link);

        for (param, value) in decl.params.iter().zip(values) {
            let AstNode::Var { token: param_token, name: param_name, .. } = param.var_node.as_ref() else {
                continue;
            };
            let value = match self.declare(&param.var_node, &param.type_node) {
                Some((param_ref, _)) => self.store(param_ref, value, param_name, param_token)?,
                None => value,
            };
            record.set(param_name, value);
        }

        self.activate(record, &decl.block)?;
        Ok(None)
    }
}
