//! Multi-module sessions: import ordering, member access across modules
//! and import cycles.

use kestrel_ast::{Ast, AstBuilder, InfixOp};
use kestrel_typeck::builtins::BuiltIns;
use kestrel_typeck::error::{InternalError, TypeError};
use kestrel_typeck::{Module, Session};

// ── Helpers ────────────────────────────────────────────────────────────

fn assert_has_error<F: Fn(&TypeError) -> bool>(module: &Module, pred: F, desc: &str) {
    assert!(
        module.errors().iter().any(pred),
        "expected error matching `{}`, got errors: {:?}",
        desc,
        module.errors()
    );
}

/// `const N = 3` and `func twice(x: i32) -> i32 { x * 2 }`
fn util() -> Ast {
    let mut b = AstBuilder::new();
    let three = b.int("3");
    let n = b.const_("N", None, three);
    let x_ty = b.ident("i32");
    let x = b.param("x", x_ty);
    let result = b.ident("i32");
    let sig = b.signature(vec![x], None, Some(result));
    let x_use = b.ident("x");
    let two = b.int("2");
    let product = b.infix(InfixOp::Mul, x_use, two);
    let body = b.curly(vec![product]);
    let twice = b.func("twice", sig, Some(body));
    b.finish(vec![n, twice])
}

/// A module that only imports the given modules.
fn importer(imports: &[&str]) -> Ast {
    let mut b = AstBuilder::new();
    let root = imports.iter().map(|name| b.import(name)).collect();
    b.finish(root)
}

// ── Imports ────────────────────────────────────────────────────────────

#[test]
fn imported_members_are_typed() {
    let mut b = AstBuilder::new();
    let import = b.import("util");
    let util_ref = b.ident("util");
    let n = b.member(util_ref, "N");
    let a = b.var("a", None, Some(n));
    let util_ref2 = b.ident("util");
    let twice = b.member(util_ref2, "twice");
    let four = b.int("4");
    let call = b.call(twice, vec![four]);
    let c = b.var("c", None, Some(call));
    let util_ref3 = b.ident("util");
    let missing = b.member(util_ref3, "missing");
    let d = b.var("d", None, Some(missing));
    let main_ast = b.finish(vec![import, a, c, d]);

    let mut session = Session::new(BuiltIns::standard());
    // Registered before its dependency; checking order still follows
    // the imports.
    let main = session.add_module("main", main_ast).unwrap();
    let util = session.add_module("util", util()).unwrap();
    session.check().unwrap();

    let m = session.module(main).unwrap();
    assert!(m.is_completed());
    assert_eq!(m.imports(), &[util]);
    assert_eq!(m.type_of(n).unwrap().to_string(), "i32");
    assert_eq!(m.value_of(n).and_then(|t| t.value.and_then(|v| v.as_int())), Some(3));
    assert_eq!(m.type_of(call).unwrap().to_string(), "i32");
    assert_eq!(m.info().use_of(util_ref).map(|s| s.describe()), Some("module"));
    let errors: Vec<String> = m.errors().iter().map(ToString::to_string).collect();
    assert_eq!(errors, vec!["no member `missing` in (util)".to_string()]);

    assert!(session.module(util).unwrap().errors().is_empty());
    assert!(session.module_by_name("util").is_some());
}

#[test]
fn unknown_module() {
    let mut session = Session::new(BuiltIns::standard());
    let main = session.add_module("main", importer(&["nowhere"])).unwrap();
    session.check().unwrap();

    let m = session.module(main).unwrap();
    assert_has_error(
        m,
        |e| matches!(e, TypeError::UnknownModule { name, .. } if name == "nowhere"),
        "UnknownModule(nowhere)",
    );
    assert!(m.imports().is_empty());
}

#[test]
fn import_cycles_are_rejected() {
    let mut session = Session::new(BuiltIns::standard());
    let a = session.add_module("a", importer(&["b"])).unwrap();
    let b = session.add_module("b", importer(&["a"])).unwrap();
    session.check().unwrap();

    for id in [a, b] {
        let m = session.module(id).unwrap();
        assert_has_error(
            m,
            |e| {
                matches!(e, TypeError::ImportCycle { cycle, .. }
                    if cycle.contains('a') && cycle.contains('b'))
            },
            "ImportCycle naming a and b",
        );
        assert!(m.imports().is_empty());
        // Both modules are still checked to the end.
        assert!(m.is_completed());
    }
    assert!(session.has_errors());
    assert_eq!(session.diagnostics().len(), 2);
}

#[test]
fn importing_a_cycle_is_not_itself_a_cycle() {
    let mut session = Session::new(BuiltIns::standard());
    // Registered ahead of the cycle it imports.
    let main = session.add_module("main", importer(&["a"])).unwrap();
    let a = session.add_module("a", importer(&["b"])).unwrap();
    let b = session.add_module("b", importer(&["a"])).unwrap();
    session.check().unwrap();

    let m = session.module(main).unwrap();
    assert!(m.errors().is_empty(), "unexpected errors: {:?}", m.errors());
    assert_eq!(m.imports(), &[a]);
    assert!(session.module(a).unwrap().has_errors());
    assert!(session.module(b).unwrap().has_errors());
}

#[test]
fn a_cycle_importing_another_cycle() {
    // x <-> y, and x also imports p <-> q.
    let mut session = Session::new(BuiltIns::standard());
    let x = session.add_module("x", importer(&["y", "p"])).unwrap();
    let y = session.add_module("y", importer(&["x"])).unwrap();
    let p = session.add_module("p", importer(&["q"])).unwrap();
    let _q = session.add_module("q", importer(&["p"])).unwrap();
    session.check().unwrap();

    // Only the import closing x's own cycle is rejected.
    let x = session.module(x).unwrap();
    let errors: Vec<String> = x.errors().iter().map(ToString::to_string).collect();
    assert_eq!(errors, vec!["import cycle: x -> y -> x".to_string()]);
    assert_eq!(x.imports(), &[p]);
    assert!(session.module(y).unwrap().has_errors());
}

#[test]
fn self_import_is_a_cycle() {
    let mut session = Session::new(BuiltIns::standard());
    let main = session.add_module("main", importer(&["main"])).unwrap();
    session.check().unwrap();

    let m = session.module(main).unwrap();
    let errors: Vec<String> = m.errors().iter().map(ToString::to_string).collect();
    assert_eq!(errors, vec!["import cycle: main -> main".to_string()]);
}

#[test]
fn acyclic_chain_next_to_a_cycle() {
    let mut session = Session::new(BuiltIns::standard());
    let base = session.add_module("base", importer(&[])).unwrap();
    let mid = session.add_module("mid", importer(&["base"])).unwrap();
    let x = session.add_module("x", importer(&["y"])).unwrap();
    let _y = session.add_module("y", importer(&["x"])).unwrap();
    session.check().unwrap();

    assert!(session.module(base).unwrap().errors().is_empty());
    let mid = session.module(mid).unwrap();
    assert!(mid.errors().is_empty());
    assert_eq!(mid.imports(), &[base]);
    assert!(session.module(x).unwrap().has_errors());
}

// ── Session management ─────────────────────────────────────────────────

#[test]
fn duplicate_module_names() {
    let mut session = Session::default();
    session.add_module("main", Ast::default()).unwrap();
    let err = session.add_module("main", Ast::default()).unwrap_err();
    assert_eq!(
        err,
        InternalError::DuplicateModule {
            name: "main".into()
        }
    );
}

#[test]
fn modules_added_later_are_checked_on_the_next_run() {
    let mut session = Session::default();
    let util = session.add_module("util", util()).unwrap();
    session.check().unwrap();
    assert!(session.module(util).unwrap().is_completed());

    let main = session.add_module("main", importer(&["util"])).unwrap();
    session.check().unwrap();
    let m = session.module(main).unwrap();
    assert!(m.errors().is_empty());
    assert_eq!(m.imports(), &[util]);

    let taken = session.take_module(main).unwrap();
    assert_eq!(taken.name(), "main");
    assert!(session.module(main).is_none());
}
