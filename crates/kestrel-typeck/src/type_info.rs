//! Per-module results of checking.
//!
//! Three append-only tables keyed by [`NodeId`]: declaring identifiers to
//! their symbols, referencing identifiers to the symbols they resolved to,
//! and expression nodes to their typed values. An entry, once written, is
//! final; writing it again is an internal error.

use std::sync::Arc;

use kestrel_ast::NodeId;

use crate::constant::Value;
use crate::error::InternalError;
use crate::symbol::Symbol;
use crate::ty::Type;

/// A type, plus the constant value when the node is a compile-time
/// constant.
#[derive(Clone, Debug)]
pub struct TypedValue {
    pub ty: Type,
    pub value: Option<Value>,
}

impl TypedValue {
    pub fn new(ty: Type) -> Self {
        TypedValue { ty, value: None }
    }

    pub fn constant(ty: Type, value: Value) -> Self {
        TypedValue {
            ty,
            value: Some(value),
        }
    }

    /// A literal-like constant typed by its untyped kind.
    pub fn untyped(value: Value) -> Self {
        TypedValue {
            ty: value.untyped_type(),
            value: Some(value),
        }
    }
}

/// A table indexed by node id.
#[derive(Debug)]
pub struct NodeMap<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for NodeMap<T> {
    fn default() -> Self {
        NodeMap { slots: Vec::new() }
    }
}

impl<T> NodeMap<T> {
    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.slots.get(node.index()).and_then(Option::as_ref)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    /// Store `value` for `node`, handing it back if the slot is taken.
    pub fn insert(&mut self, node: NodeId, value: T) -> Result<(), T> {
        let index = node.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        match &mut self.slots[index] {
            Some(_) => Err(value),
            slot => {
                *slot = Some(value);
                Ok(())
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (NodeId(i as u32), v)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct TypeInfo {
    defs: NodeMap<Arc<Symbol>>,
    def_order: Vec<NodeId>,
    uses: NodeMap<Arc<Symbol>>,
    types: NodeMap<TypedValue>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_def(&mut self, ident: NodeId, symbol: Arc<Symbol>) -> Result<(), InternalError> {
        self.defs
            .insert(ident, symbol)
            .map_err(|_| InternalError::SymbolRecordedTwice { node: ident })?;
        self.def_order.push(ident);
        Ok(())
    }

    pub fn record_use(&mut self, ident: NodeId, symbol: Arc<Symbol>) -> Result<(), InternalError> {
        self.uses
            .insert(ident, symbol)
            .map_err(|_| InternalError::SymbolRecordedTwice { node: ident })
    }

    pub fn record_type(&mut self, node: NodeId, typed: TypedValue) -> Result<(), InternalError> {
        self.types
            .insert(node, typed)
            .map_err(|_| InternalError::TypeRecordedTwice { node })
    }

    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.get(node).map(|t| &t.ty)
    }

    /// The typed value of `node`, if it is a compile-time constant.
    pub fn value_of(&self, node: NodeId) -> Option<&TypedValue> {
        self.types.get(node).filter(|t| t.value.is_some())
    }

    pub fn typed_value(&self, node: NodeId) -> Option<&TypedValue> {
        self.types.get(node)
    }

    /// The type of `node` with untyped kinds replaced by their defaults.
    /// This is what code generation sees.
    pub fn concrete_type_of(&self, node: NodeId) -> Option<Type> {
        self.type_of(node).map(Type::skip_untyped)
    }

    /// The symbol an identifier declares or refers to.
    pub fn symbol_of(&self, ident: NodeId) -> Option<&Arc<Symbol>> {
        self.uses.get(ident).or_else(|| self.defs.get(ident))
    }

    pub fn def_of(&self, ident: NodeId) -> Option<&Arc<Symbol>> {
        self.defs.get(ident)
    }

    pub fn use_of(&self, ident: NodeId) -> Option<&Arc<Symbol>> {
        self.uses.get(ident)
    }

    /// Declarations in the order they were resolved.
    pub fn defs(&self) -> impl Iterator<Item = (NodeId, &Arc<Symbol>)> {
        self.def_order
            .iter()
            .filter_map(|id| self.defs.get(*id).map(|sym| (*id, sym)))
    }

    pub fn uses(&self) -> impl Iterator<Item = (NodeId, &Arc<Symbol>)> {
        self.uses.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = (NodeId, &TypedValue)> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeId;
    use crate::ty::PrimitiveKind;

    fn var(name: &str) -> Arc<Symbol> {
        Arc::new(Symbol::Var {
            name: name.into(),
            ty: Some(Type::i32()),
            owner: ScopeId(1),
            ident: NodeId(0),
            node: NodeId(0),
        })
    }

    #[test]
    fn node_map_rejects_second_write() {
        let mut map = NodeMap::default();
        assert!(map.insert(NodeId(4), "a").is_ok());
        assert_eq!(map.insert(NodeId(4), "b"), Err("b"));
        assert_eq!(map.get(NodeId(4)), Some(&"a"));
        assert_eq!(map.get(NodeId(100)), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn recording_a_type_twice_is_an_internal_error() {
        let mut info = TypeInfo::new();
        info.record_type(NodeId(1), TypedValue::new(Type::i32()))
            .unwrap();
        let err = info
            .record_type(NodeId(1), TypedValue::new(Type::bool()))
            .unwrap_err();
        assert!(matches!(err, InternalError::TypeRecordedTwice { node } if node == NodeId(1)));
        assert_eq!(info.type_of(NodeId(1)).map(ToString::to_string).as_deref(), Some("i32"));
    }

    #[test]
    fn value_of_only_reports_constants() {
        let mut info = TypeInfo::new();
        info.record_type(NodeId(0), TypedValue::untyped(Value::Int(3)))
            .unwrap();
        info.record_type(NodeId(1), TypedValue::new(Type::i32()))
            .unwrap();
        assert!(info.value_of(NodeId(0)).is_some());
        assert!(info.value_of(NodeId(1)).is_none());
        assert!(info.typed_value(NodeId(1)).is_some());
    }

    #[test]
    fn concrete_type_skips_untyped() {
        let mut info = TypeInfo::new();
        info.record_type(
            NodeId(0),
            TypedValue::new(Type::Primitive(PrimitiveKind::UntypedFloat)),
        )
        .unwrap();
        assert_eq!(info.concrete_type_of(NodeId(0)).unwrap().to_string(), "f64");
    }

    #[test]
    fn defs_iterate_in_declaration_order() {
        let mut info = TypeInfo::new();
        info.record_def(NodeId(9), var("b")).unwrap();
        info.record_def(NodeId(2), var("a")).unwrap();
        info.record_use(NodeId(5), var("b")).unwrap();

        let names: Vec<&str> = info.defs().map(|(_, sym)| sym.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(info.symbol_of(NodeId(5)).map(|s| s.name()), Some("b"));
        assert_eq!(info.symbol_of(NodeId(2)).map(|s| s.name()), Some("a"));
        assert!(info.record_use(NodeId(5), var("c")).is_err());
    }
}
