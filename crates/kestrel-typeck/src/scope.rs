//! Lexical scopes.
//!
//! Scopes live in a per-module arena. Index 0 is the universe scope holding
//! the primitive type names; the module's top-level scope is its child, and
//! every block opens a child of the scope it appears in. Lookups walk the
//! parent chain outward and the first binding wins.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::symbol::Symbol;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const UNIVERSE: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: FxHashMap<String, Arc<Symbol>>,
}

/// The scope arena of one module.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    /// Create an arena holding only an empty universe scope.
    pub fn new() -> Self {
        Scopes {
            scopes: vec![Scope::default()],
        }
    }

    /// Open a new scope nested in `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            symbols: FxHashMap::default(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    /// Bind a symbol under its name.
    ///
    /// A second binding of the same name in the same scope is rejected and
    /// the existing symbol returned. Shadowing a name from an enclosing
    /// scope is fine.
    pub fn define(&mut self, scope: ScopeId, symbol: Arc<Symbol>) -> Result<(), Arc<Symbol>> {
        let symbols = &mut self.scopes[scope.index()].symbols;
        if let Some(existing) = symbols.get(symbol.name()) {
            return Err(Arc::clone(existing));
        }
        symbols.insert(symbol.name().to_string(), symbol);
        Ok(())
    }

    /// Look up a name, searching from `scope` outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Arc<Symbol>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// Look up a name in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Arc<Symbol>> {
        self.scopes[scope.index()].symbols.get(name)
    }

    /// Names bound directly in `scope`, sorted.
    pub fn names(&self, scope: ScopeId) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes[scope.index()]
            .symbols
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of scopes in the arena.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
