//! Runtime call stack. Free variables resolve by walking the dynamic frame
//! chain from the most recent frame downward, not the lexical structure —
//! this is load-bearing behavior, see DESIGN.md.

use std::collections::HashMap;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Program,
    Function,
    Loop,
}

/// One variable binding: the declared type is fixed at declaration and
/// survives reassignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub declared_type: Option<String>,
    pub value: Value,
}

#[derive(Debug)]
pub struct ActivationRecord {
    pub name: String,
    pub kind: FrameKind,
    pub nesting_level: usize,
    members: HashMap<String, Binding>,
}

impl ActivationRecord {
    pub fn new(name: &str, kind: FrameKind, nesting_level: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nesting_level,
            members: HashMap::new(),
        }
    }

    /// Register a declared-but-unassigned variable with its type fixed.
    pub fn declare(&mut self, name: &str, type_name: &str) {
        self.members.insert(
            name.to_string(),
            Binding {
                declared_type: Some(type_name.to_string()),
                value: Value::None,
            },
        );
    }

    /// Bind a value directly in this frame (parameters, loop counters).
    pub fn bind(&mut self, name: &str, type_name: Option<String>, value: Value) {
        self.members.insert(
            name.to_string(),
            Binding {
                declared_type: type_name,
                value,
            },
        );
    }

    fn get(&self, name: &str) -> Option<&Binding> {
        self.members.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.members.get_mut(name)
    }
}

/// Ordered stack of activation records; the back of the vec is the frame
/// that was pushed most recently.
#[derive(Debug, Default)]
pub struct CallStack {
    records: Vec<ActivationRecord>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
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

    pub fn peek_mut(&mut self) -> Option<&mut ActivationRecord> {
        self.records.last_mut()
    }

    /// Walk the dynamic chain from the top frame downward.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.records
            .iter()
            .rev()
            .find_map(|record| record.get(name))
    }

    pub fn declared_type(&self, name: &str) -> Option<&str> {
        self.lookup(name)
            .and_then(|binding| binding.declared_type.as_deref())
    }

    /// Update the nearest frame that already binds the name, keeping its
    /// declared type; a first binding lands in the top frame tagged with
    /// the value's own type.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(binding) = self
            .records
            .iter_mut()
            .rev()
            .find_map(|record| record.get_mut(name))
        {
            binding.value = value;
            return;
        }
        let type_name = match &value {
            Value::None => None,
            other => Some(other.type_name().to_string()),
        };
        if let Some(top) = self.records.last_mut() {
            top.bind(name, type_name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_dynamic_chain() {
        let mut stack = CallStack::new();
        let mut program = ActivationRecord::new("program", FrameKind::Program, 1);
        program.bind("x", Some("int".to_string()), Value::Integer(1));
        stack.push(program);
        stack.push(ActivationRecord::new("f", FrameKind::Function, 2));

        assert_eq!(
            stack.lookup("x").map(|binding| binding.value.clone()),
            Some(Value::Integer(1))
        );
    }

    #[test]
    fn assignment_updates_the_nearest_binding_and_keeps_its_type() {
        let mut stack = CallStack::new();
        let mut program = ActivationRecord::new("program", FrameKind::Program, 1);
        program.declare("x", "int");
        stack.push(program);
        stack.push(ActivationRecord::new("f", FrameKind::Function, 2));

        stack.assign("x", Value::Integer(7));
        stack.pop();
        let binding = stack.lookup("x").expect("binding should survive the pop");
        assert_eq!(binding.value, Value::Integer(7));
        assert_eq!(binding.declared_type.as_deref(), Some("int"));
    }

    #[test]
    fn popped_frames_drop_their_bindings() {
        let mut stack = CallStack::new();
        stack.push(ActivationRecord::new("program", FrameKind::Program, 1));
        let mut frame = ActivationRecord::new("loop", FrameKind::Loop, 2);
        frame.bind("i", Some("int".to_string()), Value::Integer(3));
        stack.push(frame);

        assert!(stack.lookup("i").is_some());
        stack.pop();
        assert!(stack.lookup("i").is_none());
    }
}
