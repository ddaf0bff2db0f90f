use std::collections::BTreeMap;
use std::fmt;
use derive_more::Display;
use serde::Serialize;
use crate::language::symbol::{normalize, ScopeId};
use super::value::Value;

/// Variable name (lower-cased) to value.
pub type Memory = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ArType {
    #[display("PROGRAM")]
    Program,
    #[display("PROCEDURE")]
    Procedure,
}

/// Storage for one program or procedure invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub ar_type: ArType,
    pub nesting_level: usize,
    /// Scope whose variables live in this record.
    #[serde(skip)]
    pub scope: Option<ScopeId>,
    /// Index of the record of the lexically enclosing routine.
    #[serde(skip)]
    pub static_link: Option<usize>,
    members: Memory,
}

impl ActivationRecord {
    pub fn new(name: &str, ar_type: ArType, nesting_level: usize) -> Self {
        ActivationRecord {
            name: name.to_string(),
            ar_type,
            nesting_level,
            scope: None,
            static_link: None,
            members: Memory::new(),
        }
    }

    pub fn with_scope(mut self, scope: Option<ScopeId>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_static_link(mut self, static_link: usize) -> Self {
        self.static_link = Some(static_link);
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.get(&normalize(name)).copied()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.members.insert(normalize(name), value);
    }

    pub fn members(&self) -> &Memory {
        &self.members
    }

    pub fn into_members(self) -> Memory {
        self.members
    }
}

impl fmt::Display for ActivationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.nesting_level, self.ar_type, self.name)?;
        for (name, value) in &self.members {
            write!(f, "\n   {:<20}: {}", name, value)?;
        }
        Ok(())
    }
}

/// Runtime stack of activation records, innermost last.
#[derive(Debug, Default)]
pub struct CallStack {
    records: Vec<ActivationRecord>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack { records: Vec::new() }
    }

    pub fn push(&mut self, record: ActivationRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<ActivationRecord> {
        self.records.pop()
    }

    pub fn peek(&self) -> Option<&ActivationRecord> {
        self.records.last()
    }

    pub fn get(&self, index: usize) -> Option<&ActivationRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ActivationRecord> {
        self.records.get_mut(index)
    }

    /// Number of live records.
    pub fn depth(&self) -> usize {
        self.records.len()
    }

    /// Finds the live record holding `scope`, starting at the top of the stack
    /// and following static links outward.
    pub fn frame_for(&self, scope: ScopeId) -> Option<usize> {
        let mut index = self.records.len().checked_sub(1)?;
        loop {
            let record = &self.records[index];
            if record.scope == Some(scope) {
                return Some(index);
            }
            index = record.static_link?;
        }
    }
}

impl fmt::Display for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CALL STACK")?;
        for record in self.records.iter().rev() {
            write!(f, "\n{}", record)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum StackAction {
    #[display("ENTER")]
    Enter,
    #[display("LEAVE")]
    Leave,
}

/// Snapshot of the top record when it is pushed or about to be popped.
#[derive(Debug, Clone, Serialize)]
pub struct StackEvent {
    pub action: StackAction,
    pub record: ActivationRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut record = ActivationRecord::new("Main", ArType::Program, 1);
        record.set("Alpha", Value::Integer(3));
        assert_eq!(record.get("ALPHA"), Some(Value::Integer(3)));
        assert!(record.members().contains_key("alpha"));
    }

    #[test]
    fn static_links_skip_unrelated_frames() {
        let mut stack = CallStack::new();
        stack.push(ActivationRecord::new("main", ArType::Program, 1).with_scope(Some(ScopeId(1))));
        stack.push(
            ActivationRecord::new("outer", ArType::Procedure, 2)
                .with_scope(Some(ScopeId(2)))
                .with_static_link(0),
        );
        // A recursive call of a sibling declared in main: its static link is main, not outer.
        stack.push(
            ActivationRecord::new("sibling", ArType::Procedure, 2)
                .with_scope(Some(ScopeId(3)))
                .with_static_link(0),
        );

        assert_eq!(stack.frame_for(ScopeId(3)), Some(2));
        assert_eq!(stack.frame_for(ScopeId(1)), Some(0));
        assert_eq!(stack.frame_for(ScopeId(2)), None);
    }

    #[test]
    fn display_lists_innermost_first() {
        let mut stack = CallStack::new();
        let mut main = ActivationRecord::new("main", ArType::Program, 1);
        main.set("x", Value::Integer(1));
        stack.push(main);
        stack.push(ActivationRecord::new("p", ArType::Procedure, 2).with_static_link(0));

        let dump = stack.to_string();
        assert!(dump.starts_with("CALL STACK\n2: PROCEDURE p\n1: PROGRAM main"));
        assert!(dump.ends_with("x                   : 1"));
    }
}
