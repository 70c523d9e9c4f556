//! A checking session: the built-in registry plus every module of a
//! program.
//!
//! Modules are checked in dependency order so that an import always sees a
//! completed module. Modules caught in an import cycle are still checked,
//! as a group ahead of the modules importing them; the imports that close
//! the cycle report it.

use std::sync::Arc;

use kestrel_ast::{Ast, Decl, NodeKind};
use kestrel_common::diagnostic::Diagnostic;
use kestrel_common::module_graph::{dependency_order, ModuleGraph, ModuleId};
use tracing::debug;

use crate::builtins::BuiltIns;
use crate::check::{Checker, Context};
use crate::error::InternalError;
use crate::module::Module;

#[derive(Debug)]
pub struct Session {
    builtins: BuiltIns,
    graph: ModuleGraph,
    /// Indexed by `ModuleId`. A slot is `None` only while its module is
    /// being checked, or after [`Session::take_module`].
    modules: Vec<Option<Module>>,
}

impl Session {
    pub fn new(builtins: BuiltIns) -> Self {
        Session {
            builtins,
            graph: ModuleGraph::new(),
            modules: Vec::new(),
        }
    }

    pub fn builtins(&self) -> &BuiltIns {
        &self.builtins
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Register a module under a name other modules can import it by.
    pub fn add_module(&mut self, name: &str, ast: Ast) -> Result<ModuleId, InternalError> {
        if self.graph.resolve(name).is_some() {
            return Err(InternalError::DuplicateModule {
                name: name.to_string(),
            });
        }
        let id = self.graph.add_module(name);
        self.modules.push(Some(Module::new(id, name, Arc::new(ast))));
        Ok(id)
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index()).and_then(Option::as_ref)
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.graph.resolve(name).and_then(|id| self.module(id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().flatten()
    }

    /// Move a module out of the session, e.g. to hand it to code
    /// generation.
    pub fn take_module(&mut self, id: ModuleId) -> Option<Module> {
        self.modules.get_mut(id.index()).and_then(Option::take)
    }

    /// Diagnostics of every module, tagged with the module they belong to.
    pub fn diagnostics(&self) -> Vec<(ModuleId, Diagnostic)> {
        self.modules()
            .flat_map(|m| m.diagnostics().into_iter().map(move |d| (m.id(), d)))
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.modules().any(Module::has_errors)
    }

    /// Check every module not checked yet.
    ///
    /// User errors end up in each module's diagnostics; `Err` means the
    /// checker hit an internal error and stopped. Modules checked before
    /// that point keep their results.
    pub fn check(&mut self) -> Result<(), InternalError> {
        self.collect_imports();

        let (order, cycles) = dependency_order(&self.graph);
        for cycle in &cycles {
            debug!(%cycle, "import cycle in session");
        }

        for id in order {
            let Some(slot) = self.modules.get_mut(id.index()) else {
                continue;
            };
            let Some(mut module) = slot.take() else {
                continue;
            };
            if module.is_completed() {
                self.modules[id.index()] = Some(module);
                continue;
            }

            let cx = Context {
                modules: &self.modules,
                graph: &self.graph,
                builtins: &self.builtins,
                cycles: &cycles,
            };
            let result = Checker::new(&mut module, cx).check_module();
            self.modules[id.index()] = Some(module);
            result?;
        }
        Ok(())
    }

    /// Add a graph edge for every import declaration that names a known
    /// module. Unknown names are reported when the import is resolved.
    fn collect_imports(&mut self) {
        let mut edges = Vec::new();
        for module in self.modules.iter().flatten() {
            let ast = module.ast();
            for node in ast.ids() {
                let NodeKind::Decl(Decl::Import { name }) = ast.kind(node) else {
                    continue;
                };
                let target = ast.ident_name(*name).and_then(|n| self.graph.resolve(n));
                if let Some(target) = target {
                    edges.push((module.id(), target));
                }
            }
        }
        for (from, to) in edges {
            self.graph.add_dependency(from, to);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(BuiltIns::standard())
    }
}
