//! Built-in functions (`@name(...)`).
//!
//! The registry is a plain list owned by the session. Each entry has a
//! `Func` signature, checked with the same [`FuncType::check_args`] as user
//! calls, and a native evaluator run at check time once the arguments fit.

use std::fmt;

use crate::constant::Value;
use crate::ty::{FuncType, PrimitiveKind, Type};
use crate::type_info::TypedValue;

/// Evaluate a built-in call on already checked arguments. An `Err` is
/// reported at the call site.
pub type BuiltInEval = fn(&[TypedValue]) -> Result<TypedValue, String>;

#[derive(Clone)]
pub struct BuiltIn {
    pub name: &'static str,
    pub eval: BuiltInEval,
    pub ty: FuncType,
}

impl fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltIn")
            .field("name", &self.name)
            .field("ty", &self.ty.to_string())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BuiltIns {
    entries: Vec<BuiltIn>,
}

impl BuiltIns {
    pub fn new(entries: Vec<BuiltIn>) -> Self {
        BuiltIns { entries }
    }

    /// The standard set: `magic`, `type_of`, `print`, `assert`, `asPtr`.
    pub fn standard() -> Self {
        let any_type_desc = Type::type_desc(Type::any());
        BuiltIns::new(vec![
            BuiltIn {
                name: "magic",
                eval: eval_magic,
                ty: FuncType::new(
                    vec![any_type_desc.clone()],
                    vec![Type::Primitive(PrimitiveKind::UntypedString)],
                ),
            },
            BuiltIn {
                name: "type_of",
                eval: eval_type_of,
                ty: FuncType::new(vec![any_type_desc], vec![Type::any()]),
            },
            BuiltIn {
                name: "print",
                eval: eval_print,
                ty: FuncType::new(vec![Type::any()], vec![]),
            },
            BuiltIn {
                name: "assert",
                eval: eval_assert,
                ty: FuncType::new(vec![Type::bool()], vec![]),
            },
            BuiltIn {
                name: "asPtr",
                eval: eval_as_ptr,
                ty: FuncType::new(vec![Type::string()], vec![Type::reference(Type::u8())]),
            },
        ])
    }

    pub fn lookup(&self, name: &str) -> Option<&BuiltIn> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuiltIn> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn first(args: &[TypedValue]) -> Result<&TypedValue, String> {
    args.first().ok_or_else(|| "missing argument".to_string())
}

/// The display name of a type, as an untyped string constant.
fn eval_magic(args: &[TypedValue]) -> Result<TypedValue, String> {
    let name = first(args)?.ty.skip_type_desc().to_string();
    Ok(TypedValue::untyped(Value::String(name)))
}

fn eval_type_of(args: &[TypedValue]) -> Result<TypedValue, String> {
    Ok(first(args)?.clone())
}

fn eval_print(_args: &[TypedValue]) -> Result<TypedValue, String> {
    Ok(TypedValue::new(Type::unit()))
}

fn eval_assert(args: &[TypedValue]) -> Result<TypedValue, String> {
    match first(args)?.value {
        Some(Value::Bool(false)) => Err("assertion failed".to_string()),
        _ => Ok(TypedValue::new(Type::unit())),
    }
}

fn eval_as_ptr(_args: &[TypedValue]) -> Result<TypedValue, String> {
    Ok(TypedValue::new(Type::reference(Type::u8())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[TypedValue]) -> Result<TypedValue, String> {
        let builtins = BuiltIns::standard();
        let builtin = builtins.lookup(name).expect("standard built-in");
        let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
        builtin
            .ty
            .check_args(&arg_types)
            .map_err(|e| e.to_string())?;
        (builtin.eval)(args)
    }

    #[test]
    fn standard_registry() {
        let builtins = BuiltIns::standard();
        let names: Vec<&str> = builtins.iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["magic", "type_of", "print", "assert", "asPtr"]);
        assert!(builtins.lookup("sizeof").is_none());
        assert_eq!(
            builtins.lookup("asPtr").unwrap().ty.to_string(),
            "(string) -> &u8"
        );
    }

    #[test]
    fn magic_names_the_type() {
        let arg = TypedValue::new(Type::type_desc(Type::array(3, Type::i32())));
        let result = call("magic", &[arg]).unwrap();
        assert_eq!(result.ty.to_string(), "untyped string");
        assert_eq!(result.value, Some(Value::String("[3]i32".into())));
    }

    #[test]
    fn magic_rejects_values() {
        let arg = TypedValue::new(Type::i32());
        let err = call("magic", &[arg]).unwrap_err();
        assert_eq!(
            err,
            "expected 'typedesc(any)' for 1st argument, got 'i32' instead"
        );
    }

    #[test]
    fn type_of_returns_the_descriptor() {
        let arg = TypedValue::new(Type::type_desc(Type::bool()));
        let result = call("type_of", &[arg]).unwrap();
        assert_eq!(result.ty.to_string(), "typedesc(bool)");
    }

    #[test]
    fn assert_fails_on_known_false() {
        let falsy = TypedValue::constant(Type::Primitive(PrimitiveKind::UntypedBool), Value::Bool(false));
        assert_eq!(call("assert", &[falsy]).unwrap_err(), "assertion failed");
        let unknown = TypedValue::new(Type::bool());
        assert_eq!(call("assert", &[unknown]).unwrap().ty.to_string(), "()");
    }

    #[test]
    fn print_accepts_anything() {
        let arg = TypedValue::new(Type::reference(Type::u8()));
        assert!(call("print", &[arg]).is_ok());
        assert!(call("print", &[]).is_err());
    }
}
