//! Static scope resolution: one pass over the tree that validates every
//! identifier use against nested symbol tables before evaluation starts.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Decl, Expr, FunctionCall, FunctionDecl, Program, Stmt};
use crate::resolver::scope::{
    FunctionInfo, ParamInfo, Scope, Symbol, SymbolKind, OUTPUT_FUNCTION,
};
use crate::token::Token;

mod error;
pub mod scope;

pub use error::{ResolveError, ResolveResult};

/// Output of the pass: the registry of resolved functions the evaluator
/// consults at call time. Scopes themselves are discarded.
#[derive(Debug)]
pub struct Resolved {
    pub functions: HashMap<String, Rc<FunctionInfo>>,
}

pub fn resolve(program: &Program) -> ResolveResult<Resolved> {
    let mut resolver = Resolver {
        scope: None,
        functions: HashMap::new(),
    };
    resolver.resolve_program(program)?;
    Ok(Resolved {
        functions: resolver.functions,
    })
}

struct Resolver {
    scope: Option<Box<Scope>>,
    functions: HashMap<String, Rc<FunctionInfo>>,
}

impl Resolver {
    fn scope(&self) -> &Scope {
        self.scope.as_deref().expect("resolver entered no scope")
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self.scope.as_deref_mut().expect("resolver entered no scope")
    }

    fn enter_scope(&mut self, name: &str) {
        let level = self.scope.as_ref().map_or(0, |scope| scope.level) + 1;
        let enclosing = self.scope.take();
        let mut scope = Box::new(Scope::empty(name.to_string(), level));
        scope.enclosing = enclosing;
        self.scope = Some(scope);
    }

    fn exit_scope(&mut self) {
        let scope = self.scope.take();
        self.scope = scope.and_then(|scope| scope.enclosing);
    }

    fn resolve_program(&mut self, program: &Program) -> ResolveResult<()> {
        // Only the outermost program opens the global scope; nested
        // programs (function bodies, blocks) resolve in the scope that is
        // already active.
        let outermost = self.scope.is_none();
        if outermost {
            self.scope = Some(Box::new(Scope::global()));
        }

        for declaration in &program.declarations {
            match declaration {
                Decl::Var(declaration) => self.declare_variable(&declaration.name, &declaration.type_name)?,
                Decl::Function(declaration) => self.resolve_function(declaration)?,
            }
        }
        for statement in &program.statements {
            self.resolve_stmt(statement)?;
        }

        if outermost {
            self.scope = None;
        }
        Ok(())
    }

    fn declare_variable(&mut self, name: &Token, type_name: &Token) -> ResolveResult<()> {
        self.check_type(type_name)?;
        if self.scope().lookup(&name.lexeme, true).is_some() {
            return Err(ResolveError::DuplicateIdentifier {
                name: name.lexeme.clone(),
                span: name.span,
            });
        }
        self.scope_mut()
            .define(Symbol::variable(&name.lexeme, &type_name.lexeme));
        Ok(())
    }

    fn check_type(&self, type_name: &Token) -> ResolveResult<()> {
        let symbol = self.scope().lookup(&type_name.lexeme, false);
        match symbol {
            Some(symbol) if symbol.kind == SymbolKind::BuiltinType => Ok(()),
            _ => Err(ResolveError::UnknownType {
                name: type_name.lexeme.clone(),
                span: type_name.span,
            }),
        }
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl) -> ResolveResult<()> {
        let name = declaration.name.lexeme.clone();

        let params = declaration
            .params
            .iter()
            .map(|param| ParamInfo {
                name: param.name.lexeme.clone(),
                type_name: param.type_name.lexeme.clone(),
            })
            .collect();
        let info = Rc::new(FunctionInfo {
            name: name.clone(),
            params,
            body: declaration.body.clone(),
            ret: declaration.ret.clone(),
        });

        // The symbol goes into the enclosing scope before the function's
        // own scope opens, so recursive calls resolve.
        self.scope_mut()
            .define(Symbol::function(&name, Some(info.clone())));
        self.functions.insert(name.clone(), info);

        self.enter_scope(&name);
        let result = self.resolve_function_scope(declaration);
        self.exit_scope();
        result
    }

    fn resolve_function_scope(&mut self, declaration: &FunctionDecl) -> ResolveResult<()> {
        for param in &declaration.params {
            self.check_type(&param.type_name)?;
            if self.scope().lookup(&param.name.lexeme, true).is_some() {
                return Err(ResolveError::DuplicateIdentifier {
                    name: param.name.lexeme.clone(),
                    span: param.name.span,
                });
            }
            self.scope_mut()
                .define(Symbol::variable(&param.name.lexeme, &param.type_name.lexeme));
        }
        self.resolve_program(&declaration.body)?;
        match &declaration.ret {
            Some(expr) => self.resolve_expr(expr),
            None => Ok(()),
        }
    }

    fn resolve_stmt(&mut self, statement: &Stmt) -> ResolveResult<()> {
        match statement {
            Stmt::Assign { target, value, .. } => {
                if self.scope().lookup(&target.lexeme, false).is_none() {
                    return Err(ResolveError::IdentifierNotFound {
                        name: target.lexeme.clone(),
                        span: target.span,
                    });
                }
                self.resolve_expr(value)
            }
            Stmt::Expr(expr) => self.resolve_expr(expr),
            Stmt::Conditional(conditional) => {
                for branch in &conditional.branches {
                    self.resolve_expr(&branch.condition)?;
                    self.resolve_program(&branch.block)?;
                }
                if let Some(block) = &conditional.else_block {
                    self.resolve_program(block)?;
                }
                Ok(())
            }
            Stmt::Loop(range_loop) => {
                self.resolve_expr(&range_loop.low)?;
                self.resolve_expr(&range_loop.high)?;
                // Loops open no static scope of their own; the counter is
                // declared into the active scope so the body resolves. Its
                // runtime binding lives only in the loop's frame.
                if self
                    .scope()
                    .lookup(&range_loop.variable.lexeme, false)
                    .is_none()
                {
                    self.scope_mut()
                        .define(Symbol::variable(&range_loop.variable.lexeme, "int"));
                }
                self.resolve_program(&range_loop.body)
            }
            Stmt::Blank(_) => Ok(()),
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) -> ResolveResult<()> {
        match expr {
            Expr::Integer { .. }
            | Expr::Float { .. }
            | Expr::Str { .. }
            | Expr::Boolean { .. } => Ok(()),
            Expr::Variable(token) => {
                if self.scope().lookup(&token.lexeme, false).is_none() {
                    return Err(ResolveError::IdentifierNotFound {
                        name: token.lexeme.clone(),
                        span: token.span,
                    });
                }
                Ok(())
            }
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Binary { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }
            Expr::Call(call) => self.resolve_call(call),
        }
    }

    fn resolve_call(&mut self, call: &FunctionCall) -> ResolveResult<()> {
        let name = &call.name.lexeme;
        let expected_arity = match self.scope().lookup(name, false) {
            Some(symbol) => symbol.function.as_ref().map(|info| info.params.len()),
            None => {
                return Err(ResolveError::FunctionNotDefined {
                    name: name.clone(),
                    span: call.name.span,
                });
            }
        };

        // `output` is variadic; user functions carry their formal list.
        if name != OUTPUT_FUNCTION {
            if let Some(expected) = expected_arity {
                if expected != call.args.len() {
                    return Err(ResolveError::ArityMismatch {
                        name: name.clone(),
                        expected,
                        found: call.args.len(),
                        span: call.name.span,
                    });
                }
            }
        }

        for arg in &call.args {
            self.resolve_expr(arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use indoc::indoc;

    fn resolve_source(source: &str) -> ResolveResult<Resolved> {
        let program = parser::parse(source).expect("parse failed");
        resolve(&program)
    }

    #[test]
    fn resolves_declared_variables_and_functions() {
        let source = indoc! {"
            let x : int;
            define inc(n : int) {
                return n + 1
            }
            x := inc(1);
            output(x)
        "};
        let resolved = resolve_source(source).expect("resolution failed");
        assert!(resolved.functions.contains_key("inc"));
    }

    #[test]
    fn rejects_duplicate_declaration_in_same_scope() {
        let err = resolve_source("let x, x : int; x := 1").expect_err("expected duplicate error");
        assert!(matches!(
            err,
            ResolveError::DuplicateIdentifier { name, .. } if name == "x"
        ));
    }

    #[test]
    fn allows_shadowing_outer_declarations() {
        let source = indoc! {"
            let x : int;
            define f() {
                let x : float;
                x := 1.5
            }
            f()
        "};
        resolve_source(source).expect("shadowing an outer scope should resolve");
    }

    #[test]
    fn rejects_undeclared_identifier() {
        let err = resolve_source("x := 1").expect_err("expected not-found error");
        assert!(matches!(
            err,
            ResolveError::IdentifierNotFound { name, .. } if name == "x"
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = resolve_source("let x : decimal; x := 1").expect_err("expected type error");
        assert!(matches!(
            err,
            ResolveError::UnknownType { name, .. } if name == "decimal"
        ));
    }

    #[test]
    fn rejects_call_to_undefined_function() {
        let err = resolve_source("missing(1)").expect_err("expected undefined function");
        assert!(matches!(
            err,
            ResolveError::FunctionNotDefined { name, .. } if name == "missing"
        ));
    }

    #[test]
    fn rejects_arity_mismatch() {
        let source = indoc! {"
            define add(a : int, b : int) {
                return a + b
            }
            add(1)
        "};
        let err = resolve_source(source).expect_err("expected arity error");
        assert_eq!(
            err,
            ResolveError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
                span: crate::token::Span { line: 4, column: 1 },
            }
        );
    }

    #[test]
    fn recursive_calls_resolve() {
        let source = indoc! {"
            define count_down(n : int) {
                if n > 0 {
                    count_down(n - 1)
                }
            }
            count_down(3)
        "};
        resolve_source(source).expect("recursion should resolve");
    }

    #[test]
    fn loop_counter_is_visible_in_the_body() {
        resolve_source("loop from 1 to 3 using i { output(i) }")
            .expect("loop body should resolve");
    }
}
