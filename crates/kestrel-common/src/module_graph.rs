//! Import graph of the modules in one compilation session.
//!
//! A module may only be checked once every module it imports has completed
//! checking. [`dependency_order`] yields such an order and reports import
//! cycles, which the checker rejects instead of reading half-checked
//! modules.

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;

/// A unique identifier for a module within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A module's name and the modules it imports.
#[derive(Debug)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
    /// Imported modules, in first-import order, without duplicates.
    pub dependencies: Vec<ModuleId>,
}

/// Error returned when the import graph contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// The module names forming the cycle, e.g. `["a", "b", "a"]`.
    pub cycle_path: Vec<String>,
    /// Every module that can reach every other one through imports,
    /// sorted. A superset of the names on `cycle_path` when cycles
    /// overlap.
    pub members: Vec<String>,
}

impl CycleError {
    fn from_path(cycle_path: Vec<String>) -> Self {
        let mut members = cycle_path.clone();
        members.sort();
        members.dedup();
        CycleError {
            cycle_path,
            members,
        }
    }

    /// Whether the module named `name` takes part in the cycle.
    pub fn involves(&self, name: &str) -> bool {
        self.members.iter().any(|n| n == name)
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cycle_path.join(" -> "))
    }
}

/// A directed graph of modules and their imports.
///
/// Modules are stored in insertion order and identified by [`ModuleId`].
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<ModuleInfo>,
    name_to_id: FxHashMap<String, ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module and return its sequentially assigned id.
    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        let name = name.into();
        let id = ModuleId(self.modules.len() as u32);
        self.name_to_id.insert(name.clone(), id);
        self.modules.push(ModuleInfo {
            id,
            name,
            dependencies: Vec::new(),
        });
        id
    }

    /// Look up a module by name.
    pub fn resolve(&self, name: &str) -> Option<ModuleId> {
        self.name_to_id.get(name).copied()
    }

    /// Record that module `from` imports module `to`.
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let deps = &mut self.modules[from.index()].dependencies;
        if !deps.contains(&to) {
            deps.push(to);
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn get(&self, id: ModuleId) -> &ModuleInfo {
        &self.modules[id.index()]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.modules[id.index()].name
    }
}

/// Remaining imports of each module that are not ordered yet.
fn initial_in_degree(graph: &ModuleGraph) -> Vec<u32> {
    graph
        .modules
        .iter()
        .map(|m| m.dependencies.len() as u32)
        .collect()
}

/// Append `ids` to the order and release the modules importing them.
/// Returns the modules that became ready, sorted by name.
fn place(
    graph: &ModuleGraph,
    ids: &[ModuleId],
    in_degree: &mut [u32],
    placed: &mut [bool],
    order: &mut Vec<ModuleId>,
) -> Vec<ModuleId> {
    for &id in ids {
        placed[id.index()] = true;
        in_degree[id.index()] = 0;
        order.push(id);
    }
    let mut ready = Vec::new();
    for (i, module) in graph.modules.iter().enumerate() {
        if placed[i] || in_degree[i] == 0 {
            continue;
        }
        let released = module.dependencies.iter().filter(|d| ids.contains(d)).count() as u32;
        in_degree[i] -= released;
        if released > 0 && in_degree[i] == 0 {
            ready.push(ModuleId(i as u32));
        }
    }
    ready.sort_by(|a, b| graph.name(*a).cmp(graph.name(*b)));
    ready
}

/// Kahn's algorithm from the current state: order every module reachable
/// through modules whose imports are all ordered.
fn drain(
    graph: &ModuleGraph,
    in_degree: &mut [u32],
    placed: &mut [bool],
    order: &mut Vec<ModuleId>,
) {
    let mut ready: Vec<ModuleId> = (0..graph.modules.len())
        .filter(|&i| !placed[i] && in_degree[i] == 0)
        .map(|i| ModuleId(i as u32))
        .collect();
    ready.sort_by(|a, b| graph.name(*a).cmp(graph.name(*b)));

    let mut queue = VecDeque::from(ready);
    while let Some(id) = queue.pop_front() {
        if placed[id.index()] {
            continue;
        }
        let newly_ready = place(graph, &[id], in_degree, placed, order);
        queue.extend(newly_ready);
    }
}

/// Topological sort of the import graph: imported modules first, with
/// alphabetical tie-breaking for determinism.
pub fn topological_sort(graph: &ModuleGraph) -> Result<Vec<ModuleId>, CycleError> {
    let n = graph.modules.len();
    let mut in_degree = initial_in_degree(graph);
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    drain(graph, &mut in_degree, &mut placed, &mut order);

    if order.len() == n {
        Ok(order)
    } else {
        let start = (0..n).find(|&i| in_degree[i] > 0).unwrap_or(0);
        Err(CycleError::from_path(extract_cycle_path(graph, &in_degree, start)))
    }
}

/// Like [`topological_sort`], but always yields every module.
///
/// When ordering gets stuck, one group of mutually importing modules that
/// imports nothing else still unordered is placed (alphabetically) and
/// ordering resumes. A module that merely imports a cycle therefore comes
/// after every member of it. Each placed group is returned as a
/// [`CycleError`], in placement order.
pub fn dependency_order(graph: &ModuleGraph) -> (Vec<ModuleId>, Vec<CycleError>) {
    let n = graph.modules.len();
    let mut in_degree = initial_in_degree(graph);
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut cycles = Vec::new();

    loop {
        drain(graph, &mut in_degree, &mut placed, &mut order);
        let Some(mut group) = sink_group(graph, &placed) else {
            return (order, cycles);
        };

        let cycle_path = extract_cycle_path(graph, &in_degree, group[0].index());
        group.sort_by(|a, b| graph.name(*a).cmp(graph.name(*b)));
        place(graph, &group, &mut in_degree, &mut placed, &mut order);

        let members = group.iter().map(|id| graph.name(*id).to_string()).collect();
        cycles.push(CycleError {
            cycle_path,
            members,
        });
    }
}

/// Unordered modules reachable from `from` through unordered imports,
/// `from` itself included only when it lies on a cycle.
fn reachable(graph: &ModuleGraph, placed: &[bool], from: usize) -> Vec<bool> {
    let mut seen = vec![false; graph.modules.len()];
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        for dep in &graph.modules[i].dependencies {
            let d = dep.index();
            if !placed[d] && !seen[d] {
                seen[d] = true;
                stack.push(d);
            }
        }
    }
    seen
}

/// The first (by name) unordered module whose every unordered import
/// leads back to it, together with the modules on those paths. `None`
/// once everything is ordered.
fn sink_group(graph: &ModuleGraph, placed: &[bool]) -> Option<Vec<ModuleId>> {
    let mut candidates: Vec<usize> = (0..graph.modules.len()).filter(|&i| !placed[i]).collect();
    candidates.sort_by(|a, b| graph.modules[*a].name.cmp(&graph.modules[*b].name));

    for &v in &candidates {
        let from_v = reachable(graph, placed, v);
        let closed = (0..graph.modules.len())
            .filter(|&u| from_v[u])
            .all(|u| reachable(graph, placed, u)[v]);
        if closed && from_v[v] {
            let group = (0..graph.modules.len())
                .filter(|&u| from_v[u])
                .map(|u| ModuleId(u as u32))
                .collect();
            return Some(group);
        }
    }
    None
}

/// Follow import edges among unordered modules from `start` until one
/// repeats.
fn extract_cycle_path(graph: &ModuleGraph, in_degree: &[u32], start: usize) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    let mut visited = vec![false; graph.modules.len()];
    let mut current = start;

    loop {
        if visited[current] {
            let cycle_start_name = &graph.modules[current].name;
            let cycle_begin = path
                .iter()
                .position(|name| name == cycle_start_name)
                .unwrap_or(0);
            let mut cycle = path[cycle_begin..].to_vec();
            cycle.push(cycle_start_name.clone());
            return cycle;
        }

        visited[current] = true;
        path.push(graph.modules[current].name.clone());

        let next = graph.modules[current]
            .dependencies
            .iter()
            .find(|dep| in_degree[dep.index()] > 0);

        match next {
            Some(dep) => current = dep.index(),
            None => return path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &ModuleGraph, order: &[ModuleId]) -> Vec<String> {
        order.iter().map(|id| graph.name(*id).to_string()).collect()
    }

    #[test]
    fn add_and_resolve() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("math");
        let b = graph.add_module("io");

        assert_eq!(graph.resolve("math"), Some(a));
        assert_eq!(graph.resolve("io"), Some(b));
        assert_eq!(graph.resolve("net"), None);
        assert_eq!(graph.module_count(), 2);
    }

    #[test]
    fn duplicate_imports_are_recorded_once() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        graph.add_dependency(a, b);
        graph.add_dependency(a, b);
        assert_eq!(graph.get(a).dependencies, vec![b]);
    }

    #[test]
    fn toposort_linear() {
        // a imports b, b imports c.
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        let c = graph.add_module("c");
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);

        let order = topological_sort(&graph).unwrap();
        assert_eq!(names(&graph, &order), vec!["c", "b", "a"]);
    }

    #[test]
    fn toposort_diamond() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        let c = graph.add_module("c");
        let d = graph.add_module("d");
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = topological_sort(&graph).unwrap();
        assert_eq!(names(&graph, &order), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn toposort_cycle() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        let c = graph.add_module("c");
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, a);

        let err = topological_sort(&graph).unwrap_err();
        assert_eq!(err.cycle_path, vec!["a", "b", "c", "a"]);
        assert_eq!(err.to_string(), "a -> b -> c -> a");
        assert!(err.involves("b"));
        assert!(!err.involves("d"));
    }

    #[test]
    fn self_import_is_a_cycle() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        graph.add_dependency(a, a);

        let err = topological_sort(&graph).unwrap_err();
        assert_eq!(err.cycle_path, vec!["a", "a"]);
    }

    #[test]
    fn dependency_order_keeps_acyclic_prefix() {
        // util is independent; a <-> b form a cycle; main imports a.
        let mut graph = ModuleGraph::new();
        let main = graph.add_module("main");
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        let util = graph.add_module("util");
        graph.add_dependency(main, a);
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);
        graph.add_dependency(b, util);

        let (order, cycles) = dependency_order(&graph);
        // main comes after the cycle it imports, whatever the insertion order.
        assert_eq!(names(&graph, &order), vec!["util", "a", "b", "main"]);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].involves("a") && cycles[0].involves("b"));
        assert!(!cycles[0].involves("main"));
    }

    #[test]
    fn dependency_order_places_imported_cycles_first() {
        // x <-> y, and x also imports the cycle p <-> q.
        let mut graph = ModuleGraph::new();
        let x = graph.add_module("x");
        let y = graph.add_module("y");
        let p = graph.add_module("p");
        let q = graph.add_module("q");
        graph.add_dependency(x, y);
        graph.add_dependency(y, x);
        graph.add_dependency(x, p);
        graph.add_dependency(p, q);
        graph.add_dependency(q, p);

        let (order, cycles) = dependency_order(&graph);
        assert_eq!(names(&graph, &order), vec!["p", "q", "x", "y"]);
        assert_eq!(cycles[0].members, vec!["p", "q"]);
        assert_eq!(cycles[1].members, vec!["x", "y"]);
        assert_eq!(cycles[0].to_string(), "p -> q -> p");
    }

    #[test]
    fn overlapping_cycles_form_one_group() {
        // a <-> b and b <-> c share b.
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        let c = graph.add_module("c");
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);
        graph.add_dependency(b, c);
        graph.add_dependency(c, b);

        let (order, cycles) = dependency_order(&graph);
        assert_eq!(names(&graph, &order), vec!["a", "b", "c"]);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].involves("a") && cycles[0].involves("c"));
    }

    #[test]
    fn dependency_order_without_cycle_matches_toposort() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("a");
        let b = graph.add_module("b");
        graph.add_dependency(a, b);

        let (order, cycles) = dependency_order(&graph);
        assert!(cycles.is_empty());
        assert_eq!(order, topological_sort(&graph).unwrap());
    }
}
