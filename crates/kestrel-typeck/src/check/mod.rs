//! The checking pass over one module.
//!
//! A [`Checker`] walks the module's top-level declarations in source order,
//! resolving each one and typing every expression it reaches. Expression
//! types are memoized per node in the module's [`TypeInfo`], so asking for
//! a node twice never repeats work or diagnostics.
//!
//! User mistakes become [`TypeError`]s pushed onto the module; the typing
//! functions then return `Ok(None)` and the walk carries on. An
//! [`InternalError`] aborts the pass through `?`.
//!
//! [`TypeInfo`]: crate::type_info::TypeInfo

mod decl;
mod expr;

use std::sync::Arc;

use kestrel_ast::{Ast, NodeId, NodeKind};
use kestrel_common::module_graph::{CycleError, ModuleGraph};
use rowan::TextRange;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::builtins::BuiltIns;
use crate::error::{InternalError, TypeError};
use crate::module::Module;
use crate::scope::ScopeId;
use crate::ty::Type;
use crate::type_info::TypedValue;

/// Result of typing a node: `Ok(None)` when a diagnostic was reported.
pub(crate) type Check<T> = Result<Option<T>, InternalError>;

/// Everything a module's pass can see besides the module itself.
pub(crate) struct Context<'a> {
    /// Other modules of the session, indexed by `ModuleId`. The module
    /// being checked is absent (`None`) while its pass runs.
    pub modules: &'a [Option<Module>],
    pub graph: &'a ModuleGraph,
    pub builtins: &'a BuiltIns,
    /// Import cycles found while ordering the session.
    pub cycles: &'a [CycleError],
}

pub(crate) struct Checker<'a> {
    ast: Arc<Ast>,
    module: &'a mut Module,
    cx: Context<'a>,
    scope: ScopeId,
    /// Nodes whose typing reported an error.
    failed: FxHashSet<NodeId>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(module: &'a mut Module, cx: Context<'a>) -> Self {
        let ast = Arc::clone(module.ast());
        let scope = module.top_scope();
        Checker {
            ast,
            module,
            cx,
            scope,
            failed: FxHashSet::default(),
        }
    }

    /// Resolve every top-level declaration, then mark the module completed.
    pub(crate) fn check_module(mut self) -> Result<(), InternalError> {
        debug!(module = self.module.name(), "checking module");

        let ast = Arc::clone(&self.ast);
        for &node in ast.root() {
            match ast.kind(node) {
                NodeKind::Decl(decl) => self.resolve_decl(node, decl)?,
                other => {
                    return Err(InternalError::NotADeclaration {
                        node,
                        shape: other.shape(),
                    })
                }
            }
        }

        self.module.completed = true;
        debug!(
            module = self.module.name(),
            errors = self.module.errors.len(),
            "module completed"
        );
        Ok(())
    }

    // ── Memoized typing ────────────────────────────────────────────────

    /// The typed value of an expression node.
    pub(crate) fn typed_value_of(&mut self, node: NodeId) -> Check<TypedValue> {
        if let Some(typed) = self.module.info.typed_value(node) {
            return Ok(Some(typed.clone()));
        }
        if self.failed.contains(&node) {
            return Ok(None);
        }

        let result = self.check_expr(node)?;
        match &result {
            Some(typed) => self.module.info.record_type(node, typed.clone())?,
            None => {
                self.failed.insert(node);
            }
        }
        Ok(result)
    }

    pub(crate) fn type_of(&mut self, node: NodeId) -> Check<Type> {
        Ok(self.typed_value_of(node)?.map(|typed| typed.ty))
    }

    /// Type `node` and require it to denote a type. Reports "expected type"
    /// otherwise. Returns the denoted type, not the descriptor.
    pub(crate) fn type_expr(&mut self, node: NodeId) -> Check<Type> {
        let Some(ty) = self.type_of(node)? else {
            return Ok(None);
        };
        if !ty.is_type_desc() {
            self.error(TypeError::ExpectedType {
                found: ty,
                range: self.range(node),
            });
            return Ok(None);
        }
        Ok(Some(ty.skip_type_desc()))
    }

    /// Type `node` and require it to be a value rather than a type.
    pub(crate) fn value_expr(&mut self, node: NodeId) -> Check<TypedValue> {
        let Some(typed) = self.typed_value_of(node)? else {
            return Ok(None);
        };
        if typed.ty.is_type_desc() {
            self.error(TypeError::ExpectedExpression {
                found: typed.ty,
                range: self.range(node),
            });
            return Ok(None);
        }
        Ok(Some(typed))
    }

    /// Remember the outcome for a node typed outside [`typed_value_of`],
    /// such as an argument list.
    ///
    /// [`typed_value_of`]: Checker::typed_value_of
    fn remember(&mut self, node: NodeId, typed: Option<TypedValue>) -> Result<(), InternalError> {
        match typed {
            Some(typed) => self.module.info.record_type(node, typed),
            None => {
                self.failed.insert(node);
                Ok(())
            }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    pub(crate) fn error(&mut self, err: TypeError) {
        trace!(error = %err, "type error");
        self.module.errors.push(err);
    }

    pub(crate) fn range(&self, node: NodeId) -> TextRange {
        self.ast.range(node)
    }

    fn ill_formed(&self, node: NodeId) -> InternalError {
        InternalError::IllFormedAst {
            node,
            shape: self.ast.kind(node).shape(),
        }
    }

    /// The name of an identifier node.
    fn ident_name(&self, node: NodeId) -> Result<String, InternalError> {
        self.ast
            .ident_name(node)
            .map(str::to_string)
            .ok_or_else(|| self.ill_formed(node))
    }

    /// Run `f` in a fresh scope nested in the current one.
    pub(crate) fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let parent = self.scope;
        self.scope = self.module.scopes.push(parent);
        trace!(scope = self.scope.0, parent = parent.0, "push scope");
        let result = f(self);
        trace!(scope = self.scope.0, "pop scope");
        self.scope = parent;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ast::AstBuilder;
    use kestrel_common::module_graph::ModuleId;

    fn with_checker<T>(ast: Ast, f: impl FnOnce(&mut Checker<'_>) -> T) -> (T, Module) {
        let graph = ModuleGraph::new();
        let builtins = BuiltIns::standard();
        let mut module = Module::new(ModuleId(0), "main", Arc::new(ast));
        let cx = Context {
            modules: &[],
            graph: &graph,
            builtins: &builtins,
            cycles: &[],
        };
        let result = f(&mut Checker::new(&mut module, cx));
        (result, module)
    }

    #[test]
    fn failures_are_memoized() {
        let mut b = AstBuilder::new();
        let missing = b.ident("missing");
        let ast = b.finish(vec![]);

        let (results, module) = with_checker(ast, |checker| {
            let first = checker.typed_value_of(missing).unwrap();
            let second = checker.typed_value_of(missing).unwrap();
            (first, second)
        });
        assert!(results.0.is_none() && results.1.is_none());
        assert_eq!(module.errors().len(), 1);
    }

    #[test]
    fn successes_are_recorded_once() {
        let mut b = AstBuilder::new();
        let one = b.int("1");
        let neg = b.prefix(kestrel_ast::PrefixOp::Neg, one);
        let ast = b.finish(vec![]);

        let (results, module) = with_checker(ast, |checker| {
            let first = checker.typed_value_of(neg).unwrap();
            let second = checker.typed_value_of(neg).unwrap();
            (first, second)
        });
        let (first, second) = (results.0.unwrap(), results.1.unwrap());
        assert_eq!(first.value, second.value);
        assert_eq!(module.info().types().count(), 2);
        assert!(module.errors().is_empty());
    }

    #[test]
    fn blocks_open_and_close_scopes() {
        let mut b = AstBuilder::new();
        let one = b.int("1");
        let inner = b.var("inner", None, Some(one));
        let block = b.curly(vec![inner]);
        let ast = b.finish(vec![]);

        let (scope_after, module) = with_checker(ast, |checker| {
            checker.typed_value_of(block).unwrap();
            checker.scope
        });
        assert_eq!(scope_after, module.top_scope());
        assert!(module.lookup("inner").is_none());
        // universe, top level, the block
        assert_eq!(module.scopes().len(), 3);
    }
}
