//! Type representation for the Kestrel type system.
//!
//! Types are immutable values compared structurally through [`Type::equals`].
//! Named struct and enum types are shared behind an `Arc`, so cloning a
//! `Type` is cheap and a finished module can be read from several threads.
//!
//! Literals produce *untyped* primitives (`untyped int` and friends). They
//! only live on the expression that produced them; anything stored beyond
//! that expression goes through [`Type::skip_untyped`] first.

use std::fmt;
use std::sync::Arc;

use kestrel_ast::NodeId;

/// The kind of a primitive type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    Bool,
    I32,
    U8,
    F64,
    String,
    Unit,
    /// Matches every type in [`Type::equals`].
    Any,
}

impl PrimitiveKind {
    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            PrimitiveKind::UntypedBool
                | PrimitiveKind::UntypedInt
                | PrimitiveKind::UntypedFloat
                | PrimitiveKind::UntypedString
        )
    }

    /// The concrete kind an untyped kind defaults to. Concrete kinds map to
    /// themselves.
    pub fn concrete(self) -> PrimitiveKind {
        match self {
            PrimitiveKind::UntypedBool => PrimitiveKind::Bool,
            PrimitiveKind::UntypedInt => PrimitiveKind::I32,
            PrimitiveKind::UntypedFloat => PrimitiveKind::F64,
            PrimitiveKind::UntypedString => PrimitiveKind::String,
            other => other,
        }
    }

    /// Whether a value of this (untyped) kind may be used where `target`
    /// is expected.
    pub fn converts_to(self, target: PrimitiveKind) -> bool {
        match self {
            PrimitiveKind::UntypedInt => matches!(
                target,
                PrimitiveKind::I32 | PrimitiveKind::U8 | PrimitiveKind::F64
            ),
            PrimitiveKind::UntypedFloat => target == PrimitiveKind::F64,
            PrimitiveKind::UntypedBool => target == PrimitiveKind::Bool,
            PrimitiveKind::UntypedString => target == PrimitiveKind::String,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::UntypedBool => "untyped bool",
            PrimitiveKind::UntypedInt => "untyped int",
            PrimitiveKind::UntypedFloat => "untyped float",
            PrimitiveKind::UntypedString => "untyped string",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::String => "string",
            PrimitiveKind::Unit => "()",
            PrimitiveKind::Any => "any",
        }
    }
}

/// A Kestrel type.
#[derive(Clone, Debug)]
pub enum Type {
    Primitive(PrimitiveKind),
    /// The type of an expression that denotes a type. Never nested.
    TypeDesc(Box<Type>),
    Tuple(Vec<Type>),
    Func(Box<FuncType>),
    Array(Box<ArrayType>),
    Ref(Box<Type>),
    /// The anonymous shape of a struct; reached through [`Type::Named`].
    Struct(StructType),
    /// The anonymous shape of an enum; reached through [`Type::Named`].
    Enum(EnumType),
    Named(Arc<Named>),
}

impl Type {
    pub fn primitive(kind: PrimitiveKind) -> Type {
        Type::Primitive(kind)
    }

    pub fn unit() -> Type {
        Type::Primitive(PrimitiveKind::Unit)
    }

    pub fn any() -> Type {
        Type::Primitive(PrimitiveKind::Any)
    }

    pub fn bool() -> Type {
        Type::Primitive(PrimitiveKind::Bool)
    }

    pub fn i32() -> Type {
        Type::Primitive(PrimitiveKind::I32)
    }

    pub fn u8() -> Type {
        Type::Primitive(PrimitiveKind::U8)
    }

    pub fn f64() -> Type {
        Type::Primitive(PrimitiveKind::F64)
    }

    pub fn string() -> Type {
        Type::Primitive(PrimitiveKind::String)
    }

    /// Wrap `ty` in a type descriptor, unless it already is one.
    pub fn type_desc(ty: Type) -> Type {
        match ty {
            Type::TypeDesc(_) => ty,
            other => Type::TypeDesc(Box::new(other)),
        }
    }

    pub fn reference(base: Type) -> Type {
        Type::Ref(Box::new(base))
    }

    pub fn array(size: u64, elem: Type) -> Type {
        Type::Array(Box::new(ArrayType { size, elem }))
    }

    pub fn func(func: FuncType) -> Type {
        Type::Func(Box::new(func))
    }

    /// Normalize a single type into a one-element tuple. Tuples and `()`
    /// are returned unchanged.
    pub fn wrap_in_tuple(ty: Type) -> Vec<Type> {
        match ty {
            Type::Tuple(elems) => elems,
            Type::Primitive(PrimitiveKind::Unit) => Vec::new(),
            other => vec![other],
        }
    }

    /// The structural shape of this type: named types unwrap to their
    /// declared shape and one-element tuples to their element.
    pub fn underlying(&self) -> &Type {
        let mut ty = self;
        loop {
            match ty {
                Type::Named(named) => ty = &named.underlying,
                Type::Tuple(elems) if elems.len() == 1 => ty = &elems[0],
                _ => return ty,
            }
        }
    }

    /// Structural equality. `any` on either side matches everything.
    pub fn equals(&self, other: &Type) -> bool {
        use PrimitiveKind::{Any, Unit};

        match (self.underlying(), other.underlying()) {
            (Type::Primitive(Any), _) | (_, Type::Primitive(Any)) => true,
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Primitive(Unit), Type::Tuple(elems))
            | (Type::Tuple(elems), Type::Primitive(Unit)) => elems.is_empty(),
            (Type::TypeDesc(a), Type::TypeDesc(b)) => a.equals(b),
            (Type::Tuple(a), Type::Tuple(b)) => tuples_equal(a, b),
            (Type::Func(a), Type::Func(b)) => a.equals(b),
            (Type::Array(a), Type::Array(b)) => a.size == b.size && a.elem.equals(&b.elem),
            (Type::Ref(a), Type::Ref(b)) => a.equals(b),
            (Type::Struct(a), Type::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a
                        .fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(x, y)| x.name == y.name && x.ty.equals(&y.ty))
            }
            (Type::Enum(a), Type::Enum(b)) => a.variants == b.variants,
            _ => false,
        }
    }

    /// Whether a value of this type may flow into a slot of type `target`.
    ///
    /// Besides [`Type::equals`], an untyped primitive is accepted where a
    /// concrete kind it converts to is expected, element-wise for tuples.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self.equals(target) {
            return true;
        }
        match (self.underlying(), target.underlying()) {
            (Type::Primitive(from), Type::Primitive(to)) => from.converts_to(*to),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.assignable_to(y))
            }
            _ => false,
        }
    }

    /// Replace untyped primitives with their default concrete kinds,
    /// recursing into tuples.
    pub fn skip_untyped(&self) -> Type {
        match self {
            Type::Primitive(kind) => Type::Primitive(kind.concrete()),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(Type::skip_untyped).collect()),
            other => other.clone(),
        }
    }

    pub fn is_untyped(&self) -> bool {
        match self.underlying() {
            Type::Primitive(kind) => kind.is_untyped(),
            _ => false,
        }
    }

    pub fn is_type_desc(&self) -> bool {
        matches!(self.underlying(), Type::TypeDesc(_))
    }

    /// The type a type descriptor denotes, or the type itself.
    pub fn skip_type_desc(&self) -> Type {
        match self.underlying() {
            Type::TypeDesc(inner) => (**inner).clone(),
            _ => self.clone(),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self.underlying() {
            Type::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match self.underlying() {
            Type::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self.underlying() {
            Type::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Ref(base) => Some(base),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self.underlying() {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self.underlying() {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Tuple elements. Unlike the other queries this does not look through
    /// one-element tuples, which would hide the tuple itself.
    pub fn as_tuple(&self) -> Option<&[Type]> {
        match self {
            Type::Tuple(elems) => Some(elems),
            Type::Named(named) => named.underlying.as_tuple(),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&Arc<Named>> {
        match self {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }
}

fn tuples_equal(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(kind) => f.write_str(kind.name()),
            Type::TypeDesc(inner) => write!(f, "typedesc({})", inner),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            Type::Func(func) => write!(f, "{}", func),
            Type::Array(array) => write!(f, "[{}]{}", array.size, array.elem),
            Type::Ref(base) => write!(f, "&{}", base),
            Type::Struct(s) => {
                write!(f, "struct {{")?;
                for (i, field) in s.fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}: {}", sep, field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            Type::Enum(e) => write!(f, "enum {{ {} }}", e.variants.join(", ")),
            Type::Named(named) => f.write_str(&named.name),
        }
    }
}

// ── Composite shapes ─────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ArrayType {
    pub size: u64,
    pub elem: Type,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, Default)]
pub struct StructType {
    pub fields: Vec<Field>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EnumType {
    pub variants: Vec<String>,
}

impl EnumType {
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v == name)
    }
}

/// A nominal struct or enum type.
#[derive(Debug)]
pub struct Named {
    pub name: String,
    /// A [`Type::Struct`] or [`Type::Enum`].
    pub underlying: Type,
    /// The declaring identifier, absent for built-in types.
    pub decl: Option<NodeId>,
}

impl Named {
    pub fn new(name: impl Into<String>, underlying: Type, decl: Option<NodeId>) -> Arc<Named> {
        Arc::new(Named {
            name: name.into(),
            underlying,
            decl,
        })
    }

    /// The spelling the code generator uses for a member, e.g. `Color__Red`.
    pub fn qualified_member(&self, member: &str) -> String {
        format!("{}__{}", self.name, member)
    }
}

// ── Functions ────────────────────────────────────────────────────────────

/// A function signature.
#[derive(Clone, Debug)]
pub struct FuncType {
    /// Reserved for methods; no rule produces one yet.
    pub receiver: Option<Arc<Named>>,
    pub params: Vec<Type>,
    pub result: Vec<Type>,
    pub variadic: Option<Type>,
}

impl FuncType {
    pub fn new(params: Vec<Type>, result: Vec<Type>) -> Self {
        Self {
            receiver: None,
            params,
            result,
            variadic: None,
        }
    }

    pub fn with_variadic(mut self, variadic: Type) -> Self {
        self.variadic = Some(variadic);
        self
    }

    /// The declared result as a single type: `()` for no results, the
    /// element itself for one, a tuple otherwise.
    pub fn result_type(&self) -> Type {
        match self.result.as_slice() {
            [] => Type::unit(),
            [single] => single.clone(),
            many => Type::Tuple(many.to_vec()),
        }
    }

    pub fn equals(&self, other: &FuncType) -> bool {
        let variadic_eq = match (&self.variadic, &other.variadic) {
            (Some(a), Some(b)) => a.equals(b),
            (None, None) => true,
            _ => false,
        };
        variadic_eq
            && tuples_equal(&self.params, &other.params)
            && tuples_equal(&self.result, &other.result)
    }

    /// Match argument types against the parameters.
    ///
    /// Reports the first offending argument index. For arity errors the
    /// index is `min(params, args)`, which is past the end of the shorter
    /// list.
    pub fn check_args(&self, args: &[Type]) -> Result<(), ArgsError> {
        let params = self.params.len();
        let count = args.len();
        let index = params.min(count);

        if count > params && self.variadic.is_none() {
            return Err(ArgsError {
                index,
                kind: ArgsErrorKind::TooMany {
                    expected: params,
                    got: count,
                },
            });
        }
        if count < params {
            return Err(ArgsError {
                index,
                kind: ArgsErrorKind::NotEnough {
                    expected: params,
                    got: count,
                },
            });
        }

        for (i, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !arg.assignable_to(param) {
                return Err(ArgsError {
                    index: i,
                    kind: ArgsErrorKind::Mismatch {
                        expected: param.clone(),
                        found: arg.clone(),
                    },
                });
            }
        }

        if let Some(variadic) = &self.variadic {
            for (i, arg) in args.iter().enumerate().skip(params) {
                if !arg.assignable_to(variadic) {
                    return Err(ArgsError {
                        index: i,
                        kind: ArgsErrorKind::VariadicMismatch {
                            expected: variadic.clone(),
                            found: arg.clone(),
                        },
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        write_list(f, &self.params)?;
        if let Some(variadic) = &self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...{}", variadic)?;
        }
        write!(f, ") -> ")?;
        match self.result.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "(")?;
                write_list(f, many)?;
                write!(f, ")")
            }
        }
    }
}

/// Why an argument list does not fit a signature.
#[derive(Clone, Debug)]
pub struct ArgsError {
    /// Index of the offending argument.
    pub index: usize,
    pub kind: ArgsErrorKind,
}

#[derive(Clone, Debug)]
pub enum ArgsErrorKind {
    TooMany { expected: usize, got: usize },
    NotEnough { expected: usize, got: usize },
    Mismatch { expected: Type, found: Type },
    VariadicMismatch { expected: Type, found: Type },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ArgsErrorKind::TooMany { expected, got } => {
                write!(f, "too many arguments (expected {}, got {})", expected, got)
            }
            ArgsErrorKind::NotEnough { expected, got } => {
                write!(f, "not enough arguments (expected {}, got {})", expected, got)
            }
            ArgsErrorKind::Mismatch { expected, found } => write!(
                f,
                "expected '{}' for {} argument, got '{}' instead",
                expected,
                ordinalize(self.index + 1),
                found
            ),
            ArgsErrorKind::VariadicMismatch { expected, found } => {
                write!(f, "expected '{}', got '{}' instead", expected, found)
            }
        }
    }
}

/// `1` -> `1st`, `12` -> `12th`, `22` -> `22nd`.
pub fn ordinalize(n: usize) -> String {
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{}{}", n, suffix)
}
