//! Node shapes.
//!
//! The set of shapes is closed: the parser only ever produces the variants
//! below, and the checker matches on them exhaustively.

use std::fmt;

use crate::NodeId;

// ── Operators ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `&x`
    Addr,
    /// `&mut x`
    MutAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl InfixOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            InfixOp::Add
                | InfixOp::Sub
                | InfixOp::Mul
                | InfixOp::Div
                | InfixOp::Mod
                | InfixOp::BitAnd
                | InfixOp::BitOr
                | InfixOp::BitXor
                | InfixOp::Shl
                | InfixOp::Shr
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            InfixOp::Eq | InfixOp::Ne | InfixOp::Lt | InfixOp::Le | InfixOp::Gt | InfixOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    /// `x.*`
    Unwrap,
    /// `x?`
    Try,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOp::Neg => "-",
            PrefixOp::Not => "!",
            PrefixOp::Addr => "&",
            PrefixOp::MutAddr => "&mut",
        })
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InfixOp::Assign => "=",
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::BitAnd => "&",
            InfixOp::BitOr => "|",
            InfixOp::BitXor => "^",
            InfixOp::Shl => "<<",
            InfixOp::Shr => ">>",
            InfixOp::Eq => "==",
            InfixOp::Ne => "!=",
            InfixOp::Lt => "<",
            InfixOp::Le => "<=",
            InfixOp::Gt => ">",
            InfixOp::Ge => ">=",
        })
    }
}

impl fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostfixOp::Unwrap => ".*",
            PostfixOp::Try => "?",
        })
    }
}

// ── Literals ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Float,
    /// The literal text keeps its surrounding quotes and escapes.
    String,
}

// ── Declarations ─────────────────────────────────────────────────────────

/// A declaration. Every `name` points at an [`NodeKind::Ident`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `var name: ty = value`
    Var {
        name: NodeId,
        ty: Option<NodeId>,
        value: Option<NodeId>,
    },
    /// `const name: ty = value`
    Const {
        name: NodeId,
        ty: Option<NodeId>,
        value: NodeId,
    },
    /// `func name(params) -> result { body }`; `signature` is a
    /// [`NodeKind::Signature`], `body` a [`NodeKind::CurlyList`].
    Func {
        name: NodeId,
        signature: NodeId,
        body: Option<NodeId>,
    },
    /// `struct Name { field: ty, ... }`; fields are [`NodeKind::Param`]s.
    Struct { name: NodeId, fields: Vec<NodeId> },
    /// `enum Name { A, B }`; variants are identifiers.
    Enum { name: NodeId, variants: Vec<NodeId> },
    /// `import name`
    Import { name: NodeId },
}

impl Decl {
    /// The identifier being declared.
    pub fn name(&self) -> NodeId {
        match self {
            Decl::Var { name, .. }
            | Decl::Const { name, .. }
            | Decl::Func { name, .. }
            | Decl::Struct { name, .. }
            | Decl::Enum { name, .. }
            | Decl::Import { name } => *name,
        }
    }

    /// Keyword introducing the declaration, for messages and debug output.
    pub fn keyword(&self) -> &'static str {
        match self {
            Decl::Var { .. } => "var",
            Decl::Const { .. } => "const",
            Decl::Func { .. } => "func",
            Decl::Struct { .. } => "struct",
            Decl::Enum { .. } => "enum",
            Decl::Import { .. } => "import",
        }
    }
}

// ── Node kinds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The empty expression `()` in statement position.
    Empty,
    Ident {
        name: String,
    },
    Literal {
        kind: LiteralKind,
        text: String,
    },
    /// `@name(args)`; `name` is an identifier, `args` a paren or curly list.
    BuiltInCall {
        name: NodeId,
        args: NodeId,
    },
    /// `callee(args)`; `args` is a paren list.
    Call {
        callee: NodeId,
        args: NodeId,
    },
    /// `operand[args]`; `args` is a bracket list.
    Index {
        operand: NodeId,
        args: NodeId,
    },
    /// `operand.member`
    Member {
        operand: NodeId,
        member: NodeId,
    },
    /// `[args]elem`; `args` is a bracket list.
    ArrayType {
        args: NodeId,
        elem: NodeId,
    },
    /// `(params) -> result`, optionally with a trailing `...variadic`.
    Signature {
        params: NodeId,
        variadic: Option<NodeId>,
        result: Option<NodeId>,
    },
    /// `name: ty` inside a signature or struct body.
    Param {
        name: NodeId,
        ty: NodeId,
    },
    Prefix {
        op: PrefixOp,
        operand: NodeId,
    },
    Infix {
        op: InfixOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Postfix {
        op: PostfixOp,
        operand: NodeId,
    },
    BracketList(Vec<NodeId>),
    ParenList(Vec<NodeId>),
    /// A block: `{ a; b; c }`.
    CurlyList(Vec<NodeId>),
    If {
        cond: NodeId,
        body: NodeId,
        else_branch: Option<NodeId>,
    },
    /// `else body`, where `body` is a block or a nested `if`.
    Else {
        body: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    Decl(Decl),
    /// A node the parser failed to make sense of.
    Bad,
    List(Vec<NodeId>),
    ExprList(Vec<NodeId>),
    AttributeList(Vec<NodeId>),
}

impl NodeKind {
    /// Short, stable name of the shape, used in internal error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            NodeKind::Empty => "Empty",
            NodeKind::Ident { .. } => "Ident",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::BuiltInCall { .. } => "BuiltInCall",
            NodeKind::Call { .. } => "Call",
            NodeKind::Index { .. } => "Index",
            NodeKind::Member { .. } => "Member",
            NodeKind::ArrayType { .. } => "ArrayType",
            NodeKind::Signature { .. } => "Signature",
            NodeKind::Param { .. } => "Param",
            NodeKind::Prefix { .. } => "Prefix",
            NodeKind::Infix { .. } => "Infix",
            NodeKind::Postfix { .. } => "Postfix",
            NodeKind::BracketList(_) => "BracketList",
            NodeKind::ParenList(_) => "ParenList",
            NodeKind::CurlyList(_) => "CurlyList",
            NodeKind::If { .. } => "If",
            NodeKind::Else { .. } => "Else",
            NodeKind::While { .. } => "While",
            NodeKind::Decl(_) => "Decl",
            NodeKind::Bad => "Bad",
            NodeKind::List(_) => "List",
            NodeKind::ExprList(_) => "ExprList",
            NodeKind::AttributeList(_) => "AttributeList",
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Empty | NodeKind::Ident { .. } | NodeKind::Literal { .. } | NodeKind::Bad => {
                Vec::new()
            }
            NodeKind::BuiltInCall { name, args } => vec![*name, *args],
            NodeKind::Call { callee, args } => vec![*callee, *args],
            NodeKind::Index { operand, args } => vec![*operand, *args],
            NodeKind::Member { operand, member } => vec![*operand, *member],
            NodeKind::ArrayType { args, elem } => vec![*args, *elem],
            NodeKind::Signature {
                params,
                variadic,
                result,
            } => std::iter::once(*params)
                .chain(*variadic)
                .chain(*result)
                .collect(),
            NodeKind::Param { name, ty } => vec![*name, *ty],
            NodeKind::Prefix { operand, .. } | NodeKind::Postfix { operand, .. } => vec![*operand],
            NodeKind::Infix { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::BracketList(items)
            | NodeKind::ParenList(items)
            | NodeKind::CurlyList(items)
            | NodeKind::List(items)
            | NodeKind::ExprList(items)
            | NodeKind::AttributeList(items) => items.clone(),
            NodeKind::If {
                cond,
                body,
                else_branch,
            } => [*cond, *body].into_iter().chain(*else_branch).collect(),
            NodeKind::Else { body } => vec![*body],
            NodeKind::While { cond, body } => vec![*cond, *body],
            NodeKind::Decl(decl) => match decl {
                Decl::Var { name, ty, value } => {
                    std::iter::once(*name).chain(*ty).chain(*value).collect()
                }
                Decl::Const { name, ty, value } => std::iter::once(*name)
                    .chain(*ty)
                    .chain(std::iter::once(*value))
                    .collect(),
                Decl::Func {
                    name,
                    signature,
                    body,
                } => [*name, *signature].into_iter().chain(*body).collect(),
                Decl::Struct { name, fields } => {
                    std::iter::once(*name).chain(fields.iter().copied()).collect()
                }
                Decl::Enum { name, variants } => std::iter::once(*name)
                    .chain(variants.iter().copied())
                    .collect(),
                Decl::Import { name } => vec![*name],
            },
        }
    }
}
