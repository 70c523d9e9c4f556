//! Semantic analysis for Kestrel.
//!
//! Given parsed modules ([`kestrel_ast::Ast`]), this crate binds every
//! identifier to a symbol, assigns a type to every expression, folds the
//! constants the type system needs (array sizes, tuple indices, `const`
//! initializers) and reports what is wrong as diagnostics.
//!
//! The entry point is [`Session`]: register modules, call
//! [`Session::check`], then read each [`Module`]'s type information and
//! diagnostics. For a single module, [`check`] does all of that at once.

pub mod builtins;
mod check;
pub mod constant;
pub mod diagnostics;
pub mod error;
pub mod module;
pub mod scope;
pub mod session;
pub mod symbol;
pub mod ty;
pub mod type_info;

pub use builtins::{BuiltIn, BuiltIns};
pub use error::{InternalError, TypeError};
pub use module::Module;
pub use session::Session;
pub use ty::Type;
pub use type_info::{TypeInfo, TypedValue};

use kestrel_ast::Ast;

/// Check a single module with the standard built-ins and no imports.
pub fn check(name: &str, ast: Ast) -> Result<Module, InternalError> {
    let mut session = Session::default();
    let id = session.add_module(name, ast)?;
    session.check()?;
    session
        .take_module(id)
        .ok_or_else(|| InternalError::MissingModule {
            name: name.to_string(),
        })
}
