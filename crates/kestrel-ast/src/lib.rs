//! Kestrel syntax tree.
//!
//! The parser hands the checker an [`Ast`]: an arena of [`Node`]s addressed
//! by [`NodeId`]. Node identity is the arena index, so every side table the
//! checker keeps (types, symbol uses, definitions) is a plain vector indexed
//! by `NodeId` rather than a map keyed by node address.
//!
//! The tree is read-only once built. [`AstBuilder`] is the only way to
//! construct one; the parser drives it, and so do tests.

pub mod builder;
pub mod node;

use kestrel_common::TextRange;

pub use builder::AstBuilder;
pub use node::{Decl, InfixOp, LiteralKind, NodeKind, PostfixOp, PrefixOp};

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
}

/// A parsed module: the node arena plus its top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Vec<NodeId>,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    /// Top-level statements, in source order.
    pub fn root(&self) -> &[NodeId] {
        &self.root
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The name of an identifier node, or `None` for any other shape.
    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Ident { name } => Some(name),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Iterate over all node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }
}
