//! Indented dump of a canonical tree.

use std::fmt;

use ntb_ir::Names;

use crate::tree::{CanonicalTree, Leaf, NodeId, NodeKind};

/// Display adapter returned by [`CanonicalTree::pretty`].
pub struct TreeDisplay<'a, 'e, N: Names + ?Sized> {
    tree: &'a CanonicalTree<'e>,
    names: &'a N,
}

impl<'e> CanonicalTree<'e> {
    /// Render one node per line, children indented under their parent.
    pub fn pretty<'a, N: Names + ?Sized>(&'a self, names: &'a N) -> TreeDisplay<'a, 'e, N> {
        TreeDisplay { tree: self, names }
    }
}

impl<N: Names + ?Sized> TreeDisplay<'_, '_, N> {
    fn node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self.tree.kind(id) {
            NodeKind::Binary { op, children } => {
                writeln!(f, "{indent}{}", op.spelling())?;
                for &child in children {
                    self.node(f, child, depth + 1)?;
                }
                Ok(())
            }
            NodeKind::Unary { op, child } => {
                writeln!(f, "{indent}{}", op.spelling())?;
                self.node(f, *child, depth + 1)
            }
            NodeKind::Member { field, arrow, base } => {
                let sep = if *arrow { "->" } else { "." };
                writeln!(f, "{indent}{sep}{}", self.names.field_name(*field))?;
                self.node(f, *base, depth + 1)
            }
            NodeKind::Cast { kind, child } => {
                writeln!(f, "{indent}{}", kind.name())?;
                self.node(f, *child, depth + 1)
            }
            NodeKind::Leaf(Leaf::Const(value)) => writeln!(f, "{indent}{value}"),
            NodeKind::Leaf(Leaf::Expr(expr)) => {
                writeln!(f, "{indent}{}", expr.display(self.names))
            }
        }
    }
}

impl<N: Names + ?Sized> fmt::Display for TreeDisplay<'_, '_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node(f, self.tree.root(), 0)
    }
}
