//! A compilation unit and everything checking learned about it.

use std::sync::Arc;

use kestrel_ast::{Ast, NodeId, NodeKind};
use kestrel_common::diagnostic::{self, Diagnostic};
use kestrel_common::module_graph::ModuleId;

use crate::constant::Value;
use crate::diagnostics::to_diagnostic;
use crate::error::TypeError;
use crate::scope::{ScopeId, Scopes};
use crate::symbol::Symbol;
use crate::ty::{PrimitiveKind, Type};
use crate::type_info::{TypeInfo, TypedValue};

/// A module: its syntax tree, scopes, type information and diagnostics.
///
/// Only the module's own checking pass mutates it. Once [`is_completed`]
/// returns `true` it is read-only and may be shared freely.
///
/// [`is_completed`]: Module::is_completed
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    name: String,
    ast: Arc<Ast>,
    pub(crate) info: TypeInfo,
    pub(crate) scopes: Scopes,
    top_scope: ScopeId,
    pub(crate) imports: Vec<ModuleId>,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) completed: bool,
}

impl Module {
    /// An unchecked module with the universe and an empty top-level scope.
    pub fn new(id: ModuleId, name: impl Into<String>, ast: Arc<Ast>) -> Self {
        let mut scopes = Scopes::new();
        for symbol in universe() {
            // Names are distinct, so this never collides.
            let _ = scopes.define(ScopeId::UNIVERSE, Arc::new(symbol));
        }
        let top_scope = scopes.push(ScopeId::UNIVERSE);
        Module {
            id,
            name: name.into(),
            ast,
            info: TypeInfo::new(),
            scopes,
            top_scope,
            imports: Vec::new(),
            errors: Vec::new(),
            completed: false,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ast(&self) -> &Arc<Ast> {
        &self.ast
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn top_scope(&self) -> ScopeId {
        self.top_scope
    }

    /// Imported modules, in import order.
    pub fn imports(&self) -> &[ModuleId] {
        &self.imports
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Look up a top-level name (or a universe name).
    pub fn lookup(&self, name: &str) -> Option<&Arc<Symbol>> {
        self.scopes.lookup(self.top_scope, name)
    }

    /// The type of `node`, falling back to a top-level lookup for
    /// identifiers that were never typed.
    pub fn type_of(&self, node: NodeId) -> Option<Type> {
        if let Some(ty) = self.info.type_of(node) {
            return Some(ty.clone());
        }
        self.symbol_of(node).and_then(|sym| sym.ty().cloned())
    }

    /// The constant value of `node`, with the same fallback as
    /// [`Module::type_of`].
    pub fn value_of(&self, node: NodeId) -> Option<TypedValue> {
        if let Some(typed) = self.info.value_of(node) {
            return Some(typed.clone());
        }
        match self.symbol_of(node).map(|sym| sym.as_ref()) {
            Some(Symbol::Const { typed, .. }) => typed.clone(),
            _ => None,
        }
    }

    /// The symbol an identifier declares or refers to.
    pub fn symbol_of(&self, ident: NodeId) -> Option<&Arc<Symbol>> {
        if let Some(sym) = self.info.symbol_of(ident) {
            return Some(sym);
        }
        match self.ast.get(ident).map(|n| &n.kind) {
            Some(NodeKind::Ident { name }) => self.lookup(name),
            _ => None,
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.iter().map(to_diagnostic).collect()
    }

    /// Whether checking reported any error (notes do not count).
    pub fn has_errors(&self) -> bool {
        diagnostic::has_errors(&self.diagnostics())
    }
}

/// Predeclared names: primitive types and the boolean constants.
fn universe() -> Vec<Symbol> {
    let type_name = |name: &str, kind: PrimitiveKind| Symbol::TypeName {
        name: name.to_string(),
        ty: Some(Type::type_desc(Type::Primitive(kind))),
        owner: ScopeId::UNIVERSE,
        ident: None,
        node: None,
    };
    let boolean = |name: &str, value: bool| Symbol::Const {
        name: name.to_string(),
        typed: Some(TypedValue::untyped(Value::Bool(value))),
        owner: ScopeId::UNIVERSE,
        ident: None,
        node: None,
    };
    vec![
        type_name("i32", PrimitiveKind::I32),
        type_name("u8", PrimitiveKind::U8),
        type_name("f64", PrimitiveKind::F64),
        type_name("bool", PrimitiveKind::Bool),
        type_name("string", PrimitiveKind::String),
        type_name("any", PrimitiveKind::Any),
        boolean("true", true),
        boolean("false", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ast::AstBuilder;

    #[test]
    fn universe_is_visible_from_the_top_scope() {
        let module = Module::new(ModuleId(0), "main", Arc::new(Ast::default()));
        let i32_ = module.lookup("i32").unwrap();
        assert_eq!(i32_.ty().unwrap().to_string(), "typedesc(i32)");
        assert_eq!(i32_.owner(), Some(ScopeId::UNIVERSE));
        let t = module.lookup("true").unwrap();
        assert_eq!(t.value(), Some(&Value::Bool(true)));
        assert!(module.scopes().lookup_local(module.top_scope(), "i32").is_none());
        assert!(!module.is_completed());
    }

    #[test]
    fn symbol_of_falls_back_to_scope_lookup() {
        let mut b = AstBuilder::new();
        let ident = b.ident("false");
        let other = b.ident("missing");
        let ast = Arc::new(b.finish(vec![]));
        let module = Module::new(ModuleId(0), "main", ast);

        assert_eq!(module.symbol_of(ident).map(|s| s.name()), Some("false"));
        assert_eq!(
            module.type_of(ident).map(|t| t.to_string()).as_deref(),
            Some("untyped bool")
        );
        assert_eq!(
            module.value_of(ident).and_then(|t| t.value),
            Some(Value::Bool(false))
        );
        assert!(module.symbol_of(other).is_none());
        assert!(module.type_of(other).is_none());
    }

    #[test]
    fn notes_alone_do_not_fail_a_module() {
        let mut module = Module::new(ModuleId(0), "main", Arc::new(Ast::default()));
        module.errors.push(TypeError::PreviousDeclaration {
            name: "x".into(),
            range: rowan::TextRange::empty(0.into()),
        });
        assert!(!module.has_errors());
        assert_eq!(module.diagnostics().len(), 1);
    }
}
