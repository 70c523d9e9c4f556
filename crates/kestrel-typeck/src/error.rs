//! Type errors and internal errors.
//!
//! A [`TypeError`] is a mistake in the checked program. It is recorded in
//! the module and checking carries on. An [`InternalError`] means the
//! checker or the parser broke a contract; it aborts the pass.

use std::fmt;

use kestrel_ast::NodeId;
use rowan::TextRange;

use crate::ty::{ArgsError, Type};

/// A user-facing error (or the note attached to one), with the range it
/// points at.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// An identifier with no binding in any enclosing scope.
    Undefined { name: String, range: TextRange },
    /// A binding whose declaration failed to check.
    NoType { name: String, range: TextRange },
    UnknownBuiltIn { name: String, range: TextRange },
    /// `@name { ... }`
    BlockBuiltInArgs { range: TextRange },
    /// A built-in's evaluator rejected its arguments.
    BuiltInFailed {
        name: String,
        message: String,
        range: TextRange,
    },
    /// Arguments do not fit the callee's signature.
    Args { error: ArgsError, range: TextRange },
    NotAFunction { range: TextRange },
    ExpectedOneArgument { range: TextRange },
    IndexNotI32 { found: Type, range: TextRange },
    NotIndexable { range: TextRange },
    ExpectedIntegerLiteral { range: TextRange },
    IndexOutOfRange { len: usize, range: TextRange },
    SlicesNotImplemented { range: TextRange },
    ArraySizeUnknown { range: TextRange },
    ArraySizeNotInteger { range: TextRange },
    ArraySizeOutOfRange { range: TextRange },
    IntegerOutOfRange { range: TextRange },
    /// A value where a type was expected.
    ExpectedType { found: Type, range: TextRange },
    /// A type where a value was expected.
    ExpectedExpression { found: Type, range: TextRange },
    OperatorUndefined {
        op: String,
        ty: Type,
        range: TextRange,
    },
    /// The operands of a binary operator differ.
    OperandMismatch {
        lhs: Type,
        rhs: Type,
        range: TextRange,
    },
    NotAReference { range: TextRange },
    ElementMismatch {
        expected: Type,
        found: Type,
        range: TextRange,
    },
    BranchMismatch {
        expected: Type,
        found: Type,
        range: TextRange,
    },
    ConditionNotBool { found: Type, range: TextRange },
    WhileBodyNotUnit { found: Type, range: TextRange },
    /// A value does not fit its annotation or declared result.
    Mismatch {
        expected: Type,
        found: Type,
        range: TextRange,
    },
    MissingTypeOrValue { name: String, range: TextRange },
    NotConstant { name: String, range: TextRange },
    Redeclared { name: String, range: TextRange },
    /// Note attached to [`TypeError::Redeclared`].
    PreviousDeclaration { name: String, range: TextRange },
    DuplicateField { name: String, range: TextRange },
    DuplicateVariant { name: String, range: TextRange },
    NoMember {
        member: String,
        owner: String,
        range: TextRange,
    },
    UnknownModule { name: String, range: TextRange },
    ImportCycle { cycle: String, range: TextRange },
}

impl TypeError {
    pub fn range(&self) -> TextRange {
        match self {
            TypeError::Undefined { range, .. }
            | TypeError::NoType { range, .. }
            | TypeError::UnknownBuiltIn { range, .. }
            | TypeError::BlockBuiltInArgs { range }
            | TypeError::BuiltInFailed { range, .. }
            | TypeError::Args { range, .. }
            | TypeError::NotAFunction { range }
            | TypeError::ExpectedOneArgument { range }
            | TypeError::IndexNotI32 { range, .. }
            | TypeError::NotIndexable { range }
            | TypeError::ExpectedIntegerLiteral { range }
            | TypeError::IndexOutOfRange { range, .. }
            | TypeError::SlicesNotImplemented { range }
            | TypeError::ArraySizeUnknown { range }
            | TypeError::ArraySizeNotInteger { range }
            | TypeError::ArraySizeOutOfRange { range }
            | TypeError::IntegerOutOfRange { range }
            | TypeError::ExpectedType { range, .. }
            | TypeError::ExpectedExpression { range, .. }
            | TypeError::OperatorUndefined { range, .. }
            | TypeError::OperandMismatch { range, .. }
            | TypeError::NotAReference { range }
            | TypeError::ElementMismatch { range, .. }
            | TypeError::BranchMismatch { range, .. }
            | TypeError::ConditionNotBool { range, .. }
            | TypeError::WhileBodyNotUnit { range, .. }
            | TypeError::Mismatch { range, .. }
            | TypeError::MissingTypeOrValue { range, .. }
            | TypeError::NotConstant { range, .. }
            | TypeError::Redeclared { range, .. }
            | TypeError::PreviousDeclaration { range, .. }
            | TypeError::DuplicateField { range, .. }
            | TypeError::DuplicateVariant { range, .. }
            | TypeError::NoMember { range, .. }
            | TypeError::UnknownModule { range, .. }
            | TypeError::ImportCycle { range, .. } => *range,
        }
    }

    /// Notes explain another error and do not fail the module on their own.
    pub fn is_note(&self) -> bool {
        matches!(self, TypeError::PreviousDeclaration { .. })
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Undefined { name, .. } => {
                write!(f, "identifier `{}` is undefined", name)
            }
            TypeError::NoType { name, .. } => write!(f, "expression `{}` has no type", name),
            TypeError::UnknownBuiltIn { name, .. } => {
                write!(f, "unknown built-in function '@{}'", name)
            }
            TypeError::BlockBuiltInArgs { .. } => {
                write!(f, "block as built-in function argument is not yet supported")
            }
            TypeError::BuiltInFailed { name, message, .. } => write!(f, "@{}: {}", name, message),
            TypeError::Args { error, .. } => write!(f, "{}", error),
            TypeError::NotAFunction { .. } => write!(f, "expression is not a function"),
            TypeError::ExpectedOneArgument { .. } => write!(f, "expected 1 argument"),
            TypeError::IndexNotI32 { found, .. } => write!(
                f,
                "expected type (i32) for index, got ({}) instead",
                found
            ),
            TypeError::NotIndexable { .. } => write!(f, "expression is not an array or tuple"),
            TypeError::ExpectedIntegerLiteral { .. } => write!(f, "expected integer literal"),
            TypeError::IndexOutOfRange { len, .. } => {
                write!(f, "index must be in range 0..{}", len.saturating_sub(1))
            }
            TypeError::SlicesNotImplemented { .. } => write!(f, "slices are not implemented"),
            TypeError::ArraySizeUnknown { .. } => write!(f, "array size cannot be inferred"),
            TypeError::ArraySizeNotInteger { .. } => {
                write!(f, "expected integer value for array size")
            }
            TypeError::ArraySizeOutOfRange { .. } => {
                write!(f, "size must be in range 0..{}", i64::MAX)
            }
            TypeError::IntegerOutOfRange { .. } => write!(f, "integer literal out of range"),
            TypeError::ExpectedType { found, .. } => {
                write!(f, "expected type, got ({}) instead", found)
            }
            TypeError::ExpectedExpression { found, .. } => {
                write!(f, "expected expression, got type '{}' instead", found)
            }
            TypeError::OperatorUndefined { op, ty, .. } => write!(
                f,
                "operator '{}' is not defined for the type ({})",
                op, ty
            ),
            TypeError::OperandMismatch { lhs, rhs, .. } => {
                write!(f, "type mismatch ({} and {})", lhs, rhs)
            }
            TypeError::NotAReference { .. } => write!(f, "expression is not a reference type"),
            TypeError::ElementMismatch {
                expected, found, ..
            } => write!(
                f,
                "expected type ({}) for element, got ({}) instead",
                expected, found
            ),
            TypeError::BranchMismatch {
                expected, found, ..
            } => write!(
                f,
                "all branches must have the same type with first branch ({}), got ({}) instead",
                expected, found
            ),
            TypeError::ConditionNotBool { found, .. } => write!(
                f,
                "expected type (bool) for condition, got ({}) instead",
                found
            ),
            TypeError::WhileBodyNotUnit { found, .. } => {
                write!(f, "while loop body must have no type, but got ({})", found)
            }
            TypeError::Mismatch {
                expected, found, ..
            } => write!(f, "expected type ({}), got ({}) instead", expected, found),
            TypeError::MissingTypeOrValue { name, .. } => {
                write!(f, "declaration of `{}` is missing a type or a value", name)
            }
            TypeError::NotConstant { name, .. } => {
                write!(f, "value of constant `{}` is not a constant", name)
            }
            TypeError::Redeclared { name, .. } => {
                write!(f, "`{}` is already declared in this scope", name)
            }
            TypeError::PreviousDeclaration { name, .. } => {
                write!(f, "previous declaration of `{}` is here", name)
            }
            TypeError::DuplicateField { name, .. } => write!(f, "duplicate field `{}`", name),
            TypeError::DuplicateVariant { name, .. } => {
                write!(f, "duplicate enumerator `{}`", name)
            }
            TypeError::NoMember { member, owner, .. } => {
                write!(f, "no member `{}` in ({})", member, owner)
            }
            TypeError::UnknownModule { name, .. } => write!(f, "module `{}` not found", name),
            TypeError::ImportCycle { cycle, .. } => write!(f, "import cycle: {}", cycle),
        }
    }
}

/// A broken contract between the parser and the checker, or inside the
/// checker itself. Checking stops at the first one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("ill-formed AST: unexpected {shape} node {node:?}")]
    IllFormedAst { node: NodeId, shape: &'static str },
    #[error("top-level {shape} node {node:?} is not a declaration")]
    NotADeclaration { node: NodeId, shape: &'static str },
    #[error("{what} is not implemented")]
    Unimplemented { what: &'static str },
    #[error("type of node {node:?} recorded twice")]
    TypeRecordedTwice { node: NodeId },
    #[error("symbol of identifier {node:?} recorded twice")]
    SymbolRecordedTwice { node: NodeId },
    #[error("module `{name}` is not part of the session")]
    MissingModule { name: String },
    #[error("module `{name}` is already part of the session")]
    DuplicateModule { name: String },
}
