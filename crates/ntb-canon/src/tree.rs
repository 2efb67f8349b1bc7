//! Canonical expression tree: arena storage and construction.

use ntb_ir::{BinaryOp, CastKind, ConstEvaluator, Expr, FieldId, UnaryOp};

use crate::error::CanonError;

/// Index of a node in its tree's arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Terminal of a canonical tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Leaf<'e> {
    /// Integer constant expression, already evaluated.
    Const(i64),
    /// Any other terminal, compared structurally.
    Expr(&'e Expr),
}

impl Leaf<'_> {
    pub const fn as_const(&self) -> Option<i64> {
        match self {
            Self::Const(value) => Some(*value),
            Self::Expr(_) => None,
        }
    }
}

/// Node payload.
#[derive(Clone, Debug)]
pub enum NodeKind<'e> {
    /// n-ary operator. Children of `+` and `*` are unordered operands.
    Binary { op: BinaryOp, children: Vec<NodeId> },
    Unary { op: UnaryOp, child: NodeId },
    /// Member access. `arrow` also covers `(*a).f` and `a[0].f`.
    Member {
        field: FieldId,
        arrow: bool,
        base: NodeId,
    },
    /// Implicit conversion that may change the value.
    Cast { kind: CastKind, child: NodeId },
    Leaf(Leaf<'e>),
}

#[derive(Clone, Debug)]
pub struct Node<'e> {
    pub kind: NodeKind<'e>,
    /// Back-reference used when splicing nodes during coalescing.
    pub parent: Option<NodeId>,
}

/// Normalized n-ary form of an expression.
///
/// The root is always an additive binary node; `e` is represented as
/// `e + 0`. Nodes detached by coalescing stay in the arena unreferenced.
#[derive(Clone, Debug)]
pub struct CanonicalTree<'e> {
    pub(crate) nodes: Vec<Node<'e>>,
    pub(crate) root: NodeId,
    pub(crate) eval: ConstEvaluator,
}

impl<'e> CanonicalTree<'e> {
    /// Build and normalize the canonical form of `expr`.
    pub fn from_expr(expr: &'e Expr, eval: ConstEvaluator) -> Result<Self, CanonError> {
        Self::from_sum(&[expr], eval)
    }

    /// Build and normalize the canonical form of `e1 + e2 + ... + 0`.
    pub fn from_sum(exprs: &[&'e Expr], eval: ConstEvaluator) -> Result<Self, CanonError> {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            eval,
        };
        tree.root = tree.add_zero(exprs, None);
        tree.normalize()?;
        Ok(tree)
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node<'e> {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind<'e> {
        &self.node(id).kind
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind<'e> {
        &mut self.nodes[id.index()].kind
    }

    pub(crate) const fn evaluator(&self) -> ConstEvaluator {
        self.eval
    }

    /// Operands of the root node.
    pub fn root_children(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Binary { children, .. } => children,
            _ => &[],
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind<'e>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node { kind, parent });
        if let Some(parent) = parent {
            self.attach(parent, id);
        }
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        match self.kind_mut(parent) {
            NodeKind::Binary { children, .. } => children.push(child),
            NodeKind::Unary { child: slot, .. }
            | NodeKind::Cast { child: slot, .. }
            | NodeKind::Member { base: slot, .. } => *slot = child,
            NodeKind::Leaf(_) => {}
        }
    }

    /// Create `+ [0, e1, e2, ...]` under `parent`.
    fn add_zero(&mut self, exprs: &[&'e Expr], parent: Option<NodeId>) -> NodeId {
        let node = self.alloc(
            NodeKind::Binary {
                op: BinaryOp::Add,
                children: Vec::new(),
            },
            parent,
        );
        self.alloc(NodeKind::Leaf(Leaf::Const(0)), Some(node));
        for expr in exprs {
            self.create(expr, node);
        }
        node
    }

    /// Placeholder slot for single-child nodes, overwritten by `attach`.
    const fn unset() -> NodeId {
        NodeId(u32::MAX)
    }

    fn create(&mut self, expr: &'e Expr, parent: NodeId) {
        let expr = expr.ignore_value_preserving();
        match expr {
            Expr::Binary { op, left, right } => self.create_binary(*op, left, right, parent),
            Expr::Member { base, field, arrow } => self.create_member(base, *field, *arrow, parent),
            Expr::Unary {
                op: UnaryOp::Deref,
                expr: inner,
            } => {
                let node = self.alloc(
                    NodeKind::Unary {
                        op: UnaryOp::Deref,
                        child: Self::unset(),
                    },
                    Some(parent),
                );
                self.add_zero(&[&**inner], Some(node));
            }
            Expr::Unary {
                op: op @ (UnaryOp::Plus | UnaryOp::Minus),
                expr: inner,
            } => {
                // Signed constants become leaves so that they can be folded.
                if let Ok(value) = self.eval.eval(expr) {
                    self.alloc(NodeKind::Leaf(Leaf::Const(value)), Some(parent));
                } else {
                    let node = self.alloc(
                        NodeKind::Unary {
                            op: *op,
                            child: Self::unset(),
                        },
                        Some(parent),
                    );
                    self.create(inner, node);
                }
            }
            Expr::Unary { op, expr: inner } => {
                let node = self.alloc(
                    NodeKind::Unary {
                        op: *op,
                        child: Self::unset(),
                    },
                    Some(parent),
                );
                self.create(inner, node);
            }
            // e1[e2] is *(e1 + e2 + 0).
            Expr::Index { base, index } => {
                let node = self.alloc(
                    NodeKind::Unary {
                        op: UnaryOp::Deref,
                        child: Self::unset(),
                    },
                    Some(parent),
                );
                self.add_zero(&[&**base, &**index], Some(node));
            }
            Expr::Cast {
                kind,
                implicit: true,
                expr: inner,
            } => {
                let node = self.alloc(
                    NodeKind::Cast {
                        kind: *kind,
                        child: Self::unset(),
                    },
                    Some(parent),
                );
                self.create(inner, node);
            }
            _ => {
                let leaf = match self.eval.eval(expr) {
                    Ok(value) => Leaf::Const(value),
                    Err(_) => Leaf::Expr(expr),
                };
                self.alloc(NodeKind::Leaf(leaf), Some(parent));
            }
        }
    }

    fn create_binary(&mut self, op: BinaryOp, left: &'e Expr, right: &'e Expr, parent: NodeId) {
        // a - c becomes a + (-c) unless -c overflows.
        if op == BinaryOp::Sub {
            let negated = self
                .eval
                .eval(right)
                .and_then(|c| self.eval.checked_neg(c));
            if let Ok(value) = negated {
                let node = self.alloc(
                    NodeKind::Binary {
                        op: BinaryOp::Add,
                        children: Vec::new(),
                    },
                    Some(parent),
                );
                self.create(left, node);
                self.alloc(NodeKind::Leaf(Leaf::Const(value)), Some(node));
                return;
            }
        }
        let node = self.alloc(
            NodeKind::Binary {
                op,
                children: Vec::new(),
            },
            Some(parent),
        );
        self.create(left, node);
        self.create(right, node);
    }

    fn create_member(&mut self, base: &'e Expr, field: FieldId, arrow: bool, parent: NodeId) {
        let base = base.ignore_value_preserving();
        // a->f, (*a).f and a[0].f share the form Member(f, a + 0).
        let arrow_base: Option<Vec<&'e Expr>> = if arrow {
            Some(vec![base])
        } else {
            match base {
                Expr::Unary {
                    op: UnaryOp::Deref,
                    expr,
                } => Some(vec![&**expr]),
                Expr::Index { base, index } => Some(vec![&**base, &**index]),
                _ => None,
            }
        };
        let node = self.alloc(
            NodeKind::Member {
                field,
                arrow: arrow_base.is_some(),
                base: Self::unset(),
            },
            Some(parent),
        );
        match arrow_base {
            Some(exprs) => {
                self.add_zero(&exprs, Some(node));
            }
            None => self.create(base, node),
        }
    }
}
