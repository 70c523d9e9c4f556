//! Construction of [`Ast`]s.
//!
//! Children are allocated before their parents, so a node's id is always
//! greater than the ids of its children. Nodes built without an explicit
//! range get a one-byte synthetic range at their own index, which keeps
//! ranges unique for tests that never had source text.

use kestrel_common::{TextRange, TextSize};

use crate::node::{Decl, InfixOp, LiteralKind, NodeKind, PostfixOp, PrefixOp};
use crate::{Ast, Node, NodeId};

#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node with a synthetic range.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let at = TextSize::from(self.nodes.len() as u32);
        self.alloc_at(kind, TextRange::at(at, TextSize::from(1)))
    }

    /// Allocate a node covering `range` of the source text.
    pub fn alloc_at(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, range });
        id
    }

    /// Overwrite the range of an already allocated node.
    pub fn set_range(&mut self, id: NodeId, range: TextRange) {
        self.nodes[id.index()].range = range;
    }

    pub fn finish(self, root: Vec<NodeId>) -> Ast {
        Ast {
            nodes: self.nodes,
            root,
        }
    }

    // ── Leaves ───────────────────────────────────────────────────────────

    pub fn empty(&mut self) -> NodeId {
        self.alloc(NodeKind::Empty)
    }

    pub fn bad(&mut self) -> NodeId {
        self.alloc(NodeKind::Bad)
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Ident {
            name: name.to_string(),
        })
    }

    pub fn int(&mut self, text: &str) -> NodeId {
        self.literal(LiteralKind::Int, text)
    }

    pub fn float(&mut self, text: &str) -> NodeId {
        self.literal(LiteralKind::Float, text)
    }

    /// A string literal; `text` is the raw lexeme including its quotes.
    pub fn string(&mut self, text: &str) -> NodeId {
        self.literal(LiteralKind::String, text)
    }

    pub fn literal(&mut self, kind: LiteralKind, text: &str) -> NodeId {
        self.alloc(NodeKind::Literal {
            kind,
            text: text.to_string(),
        })
    }

    // ── Lists ────────────────────────────────────────────────────────────

    pub fn bracket(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::BracketList(items))
    }

    pub fn paren(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::ParenList(items))
    }

    pub fn curly(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::CurlyList(items))
    }

    pub fn list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::List(items))
    }

    // ── Expressions ──────────────────────────────────────────────────────

    /// `@name(args)`; `args` must be a paren list (or a curly list, which
    /// the checker rejects).
    pub fn builtin_call(&mut self, name: &str, args: NodeId) -> NodeId {
        let name = self.ident(name);
        self.alloc(NodeKind::BuiltInCall { name, args })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        let args = self.paren(args);
        self.alloc(NodeKind::Call { callee, args })
    }

    pub fn index(&mut self, operand: NodeId, args: Vec<NodeId>) -> NodeId {
        let args = self.bracket(args);
        self.alloc(NodeKind::Index { operand, args })
    }

    pub fn member(&mut self, operand: NodeId, member: &str) -> NodeId {
        let member = self.ident(member);
        self.alloc(NodeKind::Member { operand, member })
    }

    /// `[size]elem`
    pub fn array_type(&mut self, size: Vec<NodeId>, elem: NodeId) -> NodeId {
        let args = self.bracket(size);
        self.alloc(NodeKind::ArrayType { args, elem })
    }

    pub fn signature(
        &mut self,
        params: Vec<NodeId>,
        variadic: Option<NodeId>,
        result: Option<NodeId>,
    ) -> NodeId {
        let params = self.paren(params);
        self.alloc(NodeKind::Signature {
            params,
            variadic,
            result,
        })
    }

    pub fn param(&mut self, name: &str, ty: NodeId) -> NodeId {
        let name = self.ident(name);
        self.alloc(NodeKind::Param { name, ty })
    }

    pub fn prefix(&mut self, op: PrefixOp, operand: NodeId) -> NodeId {
        self.alloc(NodeKind::Prefix { op, operand })
    }

    pub fn infix(&mut self, op: InfixOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.alloc(NodeKind::Infix { op, lhs, rhs })
    }

    pub fn postfix(&mut self, op: PostfixOp, operand: NodeId) -> NodeId {
        self.alloc(NodeKind::Postfix { op, operand })
    }

    /// `if cond body else else_body`; the `Else` node is created here.
    pub fn if_(&mut self, cond: NodeId, body: NodeId, else_body: Option<NodeId>) -> NodeId {
        let else_branch = else_body.map(|body| self.alloc(NodeKind::Else { body }));
        self.alloc(NodeKind::If {
            cond,
            body,
            else_branch,
        })
    }

    pub fn while_(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.alloc(NodeKind::While { cond, body })
    }

    // ── Declarations ─────────────────────────────────────────────────────

    pub fn decl(&mut self, decl: Decl) -> NodeId {
        self.alloc(NodeKind::Decl(decl))
    }

    pub fn var(&mut self, name: &str, ty: Option<NodeId>, value: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.decl(Decl::Var { name, ty, value })
    }

    pub fn const_(&mut self, name: &str, ty: Option<NodeId>, value: NodeId) -> NodeId {
        let name = self.ident(name);
        self.decl(Decl::Const { name, ty, value })
    }

    pub fn func(&mut self, name: &str, signature: NodeId, body: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.decl(Decl::Func {
            name,
            signature,
            body,
        })
    }

    /// `struct name { fields }`; each field is a `(name, type)` pair.
    pub fn struct_(&mut self, name: &str, fields: Vec<(&str, NodeId)>) -> NodeId {
        let name = self.ident(name);
        let fields = fields
            .into_iter()
            .map(|(field, ty)| self.param(field, ty))
            .collect();
        self.decl(Decl::Struct { name, fields })
    }

    pub fn enum_(&mut self, name: &str, variants: &[&str]) -> NodeId {
        let name = self.ident(name);
        let variants = variants.iter().map(|v| self.ident(v)).collect();
        self.decl(Decl::Enum { name, variants })
    }

    pub fn import(&mut self, name: &str) -> NodeId {
        let name = self.ident(name);
        self.decl(Decl::Import { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ranges_are_unique() {
        let mut b = AstBuilder::new();
        let a = b.ident("a");
        let c = b.ident("c");
        let ast = b.finish(vec![]);
        assert_ne!(ast.range(a), ast.range(c));
        assert_eq!(u32::from(ast.range(c).start()), 1);
    }

    #[test]
    fn explicit_ranges_are_kept() {
        let mut b = AstBuilder::new();
        let range = TextRange::new(10.into(), 14.into());
        let x = b.alloc_at(NodeKind::Empty, range);
        let y = b.ident("y");
        b.set_range(y, TextRange::new(20.into(), 21.into()));
        let ast = b.finish(vec![x]);
        assert_eq!(ast.range(x), range);
        assert_eq!(ast.range(y), TextRange::new(20.into(), 21.into()));
    }

    #[test]
    fn if_wraps_else_body() {
        let mut b = AstBuilder::new();
        let cond = b.ident("c");
        let body = b.curly(vec![]);
        let other = b.curly(vec![]);
        let if_ = b.if_(cond, body, Some(other));
        let ast = b.finish(vec![if_]);
        let NodeKind::If {
            else_branch: Some(else_branch),
            ..
        } = ast.kind(if_)
        else {
            panic!("expected an if with an else branch");
        };
        assert_eq!(ast.kind(*else_branch), &NodeKind::Else { body: other });
    }

    #[test]
    fn struct_fields_become_params() {
        let mut b = AstBuilder::new();
        let i32_ = b.ident("i32");
        let s = b.struct_("Point", vec![("x", i32_)]);
        let ast = b.finish(vec![s]);
        let NodeKind::Decl(Decl::Struct { fields, .. }) = ast.kind(s) else {
            panic!("expected a struct");
        };
        assert!(matches!(ast.kind(fields[0]), NodeKind::Param { ty, .. } if *ty == i32_));
    }
}
