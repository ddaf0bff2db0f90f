use std::collections::HashMap;
use std::fmt;
use derive_more::Display;
use serde::Serialize;

/// Handle of a scope inside a [`SymbolTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[display("#{_0}")]
pub struct ScopeId(pub usize);

/// Stable reference to one symbol: its scope and its slot in that scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolRef {
    pub scope: ScopeId,
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum BuiltinType {
    #[display("INTEGER")]
    Integer,
    #[display("REAL")]
    Real,
}

impl BuiltinType {
    /// Result type of `+`, `-` and `*` over two operands.
    pub fn promote(self, other: BuiltinType) -> BuiltinType {
        if self == BuiltinType::Real || other == BuiltinType::Real {
            BuiltinType::Real
        } else {
            BuiltinType::Integer
        }
    }

    /// Whether a value of type `from` may be stored into a slot of this type.
    pub fn accepts(self, from: BuiltinType) -> bool {
        self == from || (self == BuiltinType::Real && from == BuiltinType::Integer)
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    BuiltinType {
        name: String,
        builtin: BuiltinType,
    },
    Var {
        name: String,
        /// Points at the `BuiltinType` symbol this variable was declared with.
        type_ref: SymbolRef,
        builtin: BuiltinType,
    },
    Procedure {
        name: String,
        params: Vec<SymbolRef>,
        param_types: Vec<BuiltinType>,
        /// Scope opened for the procedure's parameters and body.
        body_scope: ScopeId,
    },
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::BuiltinType { name, .. } | Symbol::Var { name, .. } | Symbol::Procedure { name, .. } => name,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Symbol::BuiltinType { .. } => "type",
            Symbol::Var { .. } => "variable",
            Symbol::Procedure { .. } => "procedure",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::BuiltinType { name, .. } => write!(f, "<BuiltinTypeSymbol(name='{}')>", name),
            Symbol::Var { name, builtin, .. } => write!(f, "<VarSymbol(name='{}', type='{}')>", name, builtin),
            Symbol::Procedure { name, param_types, .. } => {
                let params: Vec<String> = param_types.iter().map(|t| t.to_string()).collect();
                write!(f, "<ProcedureSymbol(name={}, parameters=[{}])>", name, params.join(", "))
            }
        }
    }
}

/// Identifiers are case-insensitive.
pub fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// One lexical scope: its own symbols plus a link to the enclosing scope.
#[derive(Debug, Clone)]
pub struct ScopedSymbolTable {
    pub scope_name: String,
    pub scope_level: usize,
    pub enclosing_scope: Option<ScopeId>,
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl ScopedSymbolTable {
    pub fn new(scope_name: &str, scope_level: usize, enclosing_scope: Option<ScopeId>) -> Self {
        ScopedSymbolTable {
            scope_name: scope_name.to_string(),
            scope_level,
            enclosing_scope,
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn lookup_local(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize(name)).copied()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl fmt::Display for ScopedSymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SCOPE (SCOPED SYMBOL TABLE)")?;
        writeln!(f, "===========================")?;
        writeln!(f, "{:<15}: {}", "Scope name", self.scope_name)?;
        writeln!(f, "{:<15}: {}", "Scope level", self.scope_level)?;
        writeln!(f, "Scope (Scoped symbol table) contents")?;
        writeln!(f, "------------------------------------")?;
        let mut keys: Vec<(&String, &usize)> = self.index.iter().collect();
        keys.sort_by_key(|(_, slot)| **slot);
        for (key, slot) in keys {
            writeln!(f, "{:>7}: {}", key, self.symbols[*slot])?;
        }
        Ok(())
    }
}

/// Arena of every scope created during one analysis pass.
///
/// Scopes refer to their parent by [`ScopeId`], so lookup walks indices
/// outward until it finds the name or runs out of enclosing scopes.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scopes: Vec<ScopedSymbolTable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: Vec::new() }
    }

    pub fn push_scope(&mut self, name: &str, enclosing: Option<ScopeId>) -> ScopeId {
        let level = match enclosing {
            Some(parent) => self.scope(parent).scope_level + 1,
            None => 0,
        };
        self.scopes.push(ScopedSymbolTable::new(name, level, enclosing));
        ScopeId(self.scopes.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &ScopedSymbolTable {
        &self.scopes[id.0]
    }

    pub fn scopes(&self) -> &[ScopedSymbolTable] {
        &self.scopes
    }

    /// Inserts into `scope`, returning `None` when the name is already taken there.
    pub fn insert(&mut self, scope: ScopeId, symbol: Symbol) -> Option<SymbolRef> {
        let table = &mut self.scopes[scope.0];
        let key = normalize(symbol.name());
        if table.index.contains_key(&key) {
            return None;
        }
        table.symbols.push(symbol);
        let slot = table.symbols.len() - 1;
        table.index.insert(key, slot);
        Some(SymbolRef { scope, slot })
    }

    pub fn get(&self, symbol: SymbolRef) -> &Symbol {
        &self.scopes[symbol.scope.0].symbols[symbol.slot]
    }

    pub fn get_mut(&mut self, symbol: SymbolRef) -> &mut Symbol {
        &mut self.scopes[symbol.scope.0].symbols[symbol.slot]
    }

    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<SymbolRef> {
        let mut current = Some(from);
        while let Some(id) = current {
            let table = self.scope(id);
            if let Some(slot) = table.lookup_local(name) {
                return Some(SymbolRef { scope: id, slot });
            }
            current = table.enclosing_scope;
        }
        None
    }

    pub fn lookup_current_scope(&self, scope: ScopeId, name: &str) -> Option<SymbolRef> {
        self.scope(scope).lookup_local(name).map(|slot| SymbolRef { scope, slot })
    }
}
