//! Symbols bound in scopes.
//!
//! A symbol whose type is `None` belongs to a declaration that failed to
//! check. It stays bound so later uses report "has no type" instead of
//! "undefined".

use kestrel_ast::NodeId;
use kestrel_common::module_graph::ModuleId;

use crate::constant::Value;
use crate::scope::ScopeId;
use crate::ty::Type;
use crate::type_info::TypedValue;

#[derive(Debug)]
pub enum Symbol {
    /// A variable or a function parameter.
    Var {
        name: String,
        ty: Option<Type>,
        owner: ScopeId,
        ident: NodeId,
        node: NodeId,
    },
    /// A constant. `true` and `false` are universe constants without
    /// declaring syntax.
    Const {
        name: String,
        typed: Option<TypedValue>,
        owner: ScopeId,
        ident: Option<NodeId>,
        node: Option<NodeId>,
    },
    Func {
        name: String,
        ty: Option<Type>,
        owner: ScopeId,
        ident: NodeId,
        node: NodeId,
    },
    /// A struct, enum or primitive type name. The type is a type
    /// descriptor. Primitive names have no declaring syntax.
    TypeName {
        name: String,
        ty: Option<Type>,
        owner: ScopeId,
        ident: Option<NodeId>,
        node: Option<NodeId>,
    },
    /// An intrinsic from the session's registry, referenced by `@name`.
    /// Never bound in a scope.
    BuiltIn { name: String, ty: Type },
    /// An imported module.
    Module { id: ModuleId, name: String },
}

impl Symbol {
    /// The scope the symbol is bound in. For a module this is the universe
    /// scope enclosing its top-level scope.
    pub fn owner(&self) -> Option<ScopeId> {
        match self {
            Symbol::Var { owner, .. }
            | Symbol::Const { owner, .. }
            | Symbol::Func { owner, .. }
            | Symbol::TypeName { owner, .. } => Some(*owner),
            Symbol::BuiltIn { .. } => None,
            Symbol::Module { .. } => Some(ScopeId::UNIVERSE),
        }
    }

    pub fn ty(&self) -> Option<&Type> {
        match self {
            Symbol::Var { ty, .. } | Symbol::Func { ty, .. } | Symbol::TypeName { ty, .. } => {
                ty.as_ref()
            }
            Symbol::Const { typed, .. } => typed.as_ref().map(|t| &t.ty),
            Symbol::BuiltIn { ty, .. } => Some(ty),
            Symbol::Module { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Var { name, .. }
            | Symbol::Const { name, .. }
            | Symbol::Func { name, .. }
            | Symbol::TypeName { name, .. }
            | Symbol::BuiltIn { name, .. }
            | Symbol::Module { name, .. } => name,
        }
    }

    /// The declaring identifier.
    pub fn ident(&self) -> Option<NodeId> {
        match self {
            Symbol::Var { ident, .. } | Symbol::Func { ident, .. } => Some(*ident),
            Symbol::Const { ident, .. } | Symbol::TypeName { ident, .. } => *ident,
            Symbol::BuiltIn { .. } | Symbol::Module { .. } => None,
        }
    }

    /// The declaring node (a declaration or a parameter).
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Symbol::Var { node, .. } | Symbol::Func { node, .. } => Some(*node),
            Symbol::Const { node, .. } | Symbol::TypeName { node, .. } => *node,
            Symbol::BuiltIn { .. } | Symbol::Module { .. } => None,
        }
    }

    /// The folded value of a constant.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Symbol::Const { typed, .. } => typed.as_ref().and_then(|t| t.value.as_ref()),
            _ => None,
        }
    }

    pub fn typed_value(&self) -> Option<TypedValue> {
        match self {
            Symbol::Const { typed, .. } => typed.clone(),
            _ => self.ty().map(|ty| TypedValue::new(ty.clone())),
        }
    }

    /// What the symbol is, for log output.
    pub fn describe(&self) -> &'static str {
        match self {
            Symbol::Var { .. } => "variable",
            Symbol::Const { .. } => "constant",
            Symbol::Func { .. } => "function",
            Symbol::TypeName { .. } => "type",
            Symbol::BuiltIn { .. } => "built-in function",
            Symbol::Module { .. } => "module",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_exposes_type_and_value() {
        let sym = Symbol::Const {
            name: "N".into(),
            typed: Some(TypedValue::constant(Type::i32(), Value::Int(4))),
            owner: ScopeId(1),
            ident: Some(NodeId(0)),
            node: Some(NodeId(2)),
        };
        assert_eq!(sym.ty().map(ToString::to_string).as_deref(), Some("i32"));
        assert_eq!(sym.value(), Some(&Value::Int(4)));
        assert_eq!(sym.owner(), Some(ScopeId(1)));
        assert_eq!(sym.ident(), Some(NodeId(0)));
        assert_eq!(sym.node(), Some(NodeId(2)));
    }

    #[test]
    fn builtins_and_modules_have_no_syntax() {
        let builtin = Symbol::BuiltIn {
            name: "print".into(),
            ty: Type::any(),
        };
        assert_eq!(builtin.owner(), None);
        assert_eq!(builtin.ident(), None);
        assert!(builtin.ty().is_some());

        let module = Symbol::Module {
            id: ModuleId(3),
            name: "math".into(),
        };
        assert!(module.ty().is_none());
        assert_eq!(module.owner(), Some(ScopeId::UNIVERSE));
        assert_eq!(module.name(), "math");
        assert_eq!(module.describe(), "module");
    }

    #[test]
    fn failed_declarations_have_no_type() {
        let sym = Symbol::Var {
            name: "x".into(),
            ty: None,
            owner: ScopeId(1),
            ident: NodeId(0),
            node: NodeId(1),
        };
        assert!(sym.ty().is_none());
        assert!(sym.typed_value().is_none());
    }
}
