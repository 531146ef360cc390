use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, Program};

pub const GLOBAL_SCOPE: &str = "global";

/// Name of the builtin print function.
pub const OUTPUT_FUNCTION: &str = "output";

pub const BUILTIN_TYPES: [&str; 4] = ["int", "float", "string", "bool"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    BuiltinType,
    Variable,
    Function,
}

/// Static description of a resolved function, shared between the symbol
/// table and the evaluator's function registry.
#[derive(Debug, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<ParamInfo>,
    pub body: Rc<Program>,
    pub ret: Option<Rc<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub type_name: Option<String>,
    pub function: Option<Rc<FunctionInfo>>,
}

impl Symbol {
    pub fn builtin_type(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::BuiltinType,
            type_name: None,
            function: None,
        }
    }

    pub fn variable(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            type_name: Some(type_name.to_string()),
            function: None,
        }
    }

    pub fn function(name: &str, info: Option<Rc<FunctionInfo>>) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Function,
            type_name: None,
            function: info,
        }
    }
}

/// One nesting level of declared names. The global scope has no enclosing
/// scope; lookup stops there.
#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub level: usize,
    symbols: HashMap<String, Symbol>,
    pub enclosing: Option<Box<Scope>>,
}

impl Scope {
    /// Global scope, seeded with the builtin type symbols and `output`.
    pub fn global() -> Self {
        let mut scope = Self::empty(GLOBAL_SCOPE.to_string(), 1);
        for type_name in BUILTIN_TYPES {
            scope.define(Symbol::builtin_type(type_name));
        }
        scope.define(Symbol::function(OUTPUT_FUNCTION, None));
        scope
    }

    pub fn empty(name: String, level: usize) -> Self {
        Self {
            name,
            level,
            symbols: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn define(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    /// Look a name up in this scope, then transitively through enclosing
    /// scopes unless `current_only` is set (used for duplicate-declaration
    /// checks, where redeclaring an outer name is fine).
    pub fn lookup(&self, name: &str, current_only: bool) -> Option<&Symbol> {
        match self.symbols.get(name) {
            Some(symbol) => Some(symbol),
            None if !current_only => self
                .enclosing
                .as_deref()
                .and_then(|scope| scope.lookup(name, current_only)),
            None => None,
        }
    }
}
