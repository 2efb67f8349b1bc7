//! Rewriting passes: coalesce, sort, constant-fold.

use ntb_ir::BinaryOp;

use crate::compare::compare_nodes;
use crate::error::CanonError;
use crate::tree::{CanonicalTree, Leaf, NodeId, NodeKind};

impl CanonicalTree<'_> {
    /// Run coalesce, sort and fold until none of them changes the tree.
    pub(crate) fn normalize(&mut self) -> Result<(), CanonError> {
        loop {
            let mut changed = false;
            self.coalesce(self.root, &mut changed);
            self.sort(self.root);
            self.fold(self.root, &mut changed)?;
            if !changed {
                break;
            }
        }
        if !matches!(self.kind(self.root), NodeKind::Binary { .. }) {
            return Err(CanonError::Malformed("root is not a binary operator"));
        }
        Ok(())
    }

    fn single_child(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Unary { child, .. } | NodeKind::Cast { child, .. } => Some(*child),
            NodeKind::Member { base, .. } => Some(*base),
            NodeKind::Binary { .. } | NodeKind::Leaf(_) => None,
        }
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Binary { children, .. } => children.clone(),
            _ => Vec::new(),
        }
    }

    /// A node merges into its parent when both operators are `+`/`*` and
    /// either the operators match or the node has a single operand.
    fn can_coalesce(&self, id: NodeId) -> bool {
        let NodeKind::Binary { op, children } = self.kind(id) else {
            return false;
        };
        if !op.is_commutative_and_associative() {
            return false;
        }
        let Some(parent) = self.node(id).parent else {
            return false;
        };
        match self.kind(parent) {
            NodeKind::Binary { op: parent_op, .. } => {
                parent_op.is_commutative_and_associative()
                    && (op == parent_op || children.len() == 1)
            }
            _ => false,
        }
    }

    /// Replace `id` in its parent's operand list by `id`'s own operands.
    fn splice(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let own = self.children(id);
        for &child in &own {
            self.nodes[child.index()].parent = Some(parent);
        }
        if let NodeKind::Binary { children, .. } = self.kind_mut(parent) {
            if let Some(pos) = children.iter().position(|&c| c == id) {
                let mut merged = Vec::with_capacity(children.len() + own.len());
                merged.extend_from_slice(&children[..pos]);
                merged.extend(own);
                merged.extend_from_slice(&children[pos + 1..]);
                *children = merged;
            }
        }
        if let NodeKind::Binary { children, .. } = self.kind_mut(id) {
            children.clear();
        }
        self.nodes[id.index()].parent = None;
    }

    fn coalesce(&mut self, id: NodeId, changed: &mut bool) {
        if let Some(child) = self.single_child(id) {
            self.coalesce(child, changed);
            return;
        }
        for child in self.children(id) {
            self.coalesce(child, changed);
        }
        if self.can_coalesce(id) {
            self.splice(id);
            *changed = true;
        }
    }

    fn sort(&mut self, id: NodeId) {
        if let Some(child) = self.single_child(id) {
            self.sort(child);
            return;
        }
        for child in self.children(id) {
            self.sort(child);
        }
        let NodeKind::Binary { op, children } = self.kind(id) else {
            return;
        };
        if !op.is_commutative_and_associative() {
            return;
        }
        let mut sorted = children.clone();
        sorted.sort_by(|&a, &b| compare_nodes(self, a, self, b));
        if let NodeKind::Binary { children, .. } = self.kind_mut(id) {
            *children = sorted;
        }
    }

    fn fold(&mut self, id: NodeId, changed: &mut bool) -> Result<(), CanonError> {
        if let Some(child) = self.single_child(id) {
            return self.fold(child, changed);
        }
        for child in self.children(id) {
            if !matches!(self.kind(child), NodeKind::Leaf(_)) {
                self.fold(child, changed)?;
            }
        }
        let NodeKind::Binary { op, children } = self.kind(id) else {
            return Ok(());
        };
        let op = *op;
        if !op.is_commutative_and_associative() {
            return Ok(());
        }

        let consts: Vec<(NodeId, i64)> = children
            .iter()
            .filter_map(|&c| match self.kind(c) {
                NodeKind::Leaf(Leaf::Const(value)) => Some((c, *value)),
                _ => None,
            })
            .collect();
        if consts.len() < 2 {
            return Ok(());
        }

        let eval = self.evaluator();
        let mut folded = consts[0].1;
        for &(_, value) in &consts[1..] {
            folded = match op {
                BinaryOp::Add => eval.checked_add(folded, value),
                _ => eval.checked_mul(folded, value),
            }
            .map_err(|_| CanonError::Overflow)?;
        }

        if let NodeKind::Binary { children, .. } = self.kind_mut(id) {
            children.retain(|c| !consts.iter().any(|(k, _)| k == c));
        }
        self.alloc(NodeKind::Leaf(Leaf::Const(folded)), Some(id));

        let remaining = self.children(id).len();
        if remaining == 1 && self.can_coalesce(id) {
            self.splice(id);
        }
        *changed = true;
        Ok(())
    }
}
