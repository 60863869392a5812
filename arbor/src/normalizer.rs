//! Rewrites n-ary scene groups into binary trees.
//!
//! A group with `n` surviving children is split at `ceil(n / 2)` and both
//! halves are processed by the same rule, so e.g. `{B, C, D}` becomes
//! `group(group(B, C), D)`. Single-child groups are replaced by their child,
//! empty groups vanish.

use glam::Affine3A;

use crate::{CsgOp, SceneNode, SceneNodeKind};

/// Node of the binary tree produced by [`normalize()`].
///
/// Geometries and CSG nodes borrow the scene nodes they came from; groups
/// are either the original scene groups or synthetic ones introduced by the
/// halving.
#[derive(Debug)]
pub enum BinaryNode<'a, N> {
    Group {
        local: Affine3A,
        left: Box<Self>,
        right: Box<Self>,
    },

    Csg {
        local: Affine3A,
        op: CsgOp,
        node: &'a N,
        left: Option<Box<Self>>,
        right: Option<Box<Self>>,
    },

    Geometry {
        local: Affine3A,
        node: &'a N,
    },
}

impl<'a, N> BinaryNode<'a, N> {
    /// Transform relative to the parent binary node.
    pub fn local(&self) -> Affine3A {
        match self {
            BinaryNode::Group { local, .. }
            | BinaryNode::Csg { local, .. }
            | BinaryNode::Geometry { local, .. } => *local,
        }
    }

    pub fn children(&self) -> (Option<&Self>, Option<&Self>) {
        match self {
            BinaryNode::Group { left, right, .. } => {
                (Some(left.as_ref()), Some(right.as_ref()))
            }

            BinaryNode::Csg { left, right, .. } => {
                (left.as_deref(), right.as_deref())
            }

            BinaryNode::Geometry { .. } => (None, None),
        }
    }

    /// Returns number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let (left, right) = self.children();

        1 + left.map_or(0, Self::node_count)
            + right.map_or(0, Self::node_count)
    }

    /// Returns number of nodes on the longest path from `self` to a leaf,
    /// including both ends.
    pub fn depth(&self) -> usize {
        let (left, right) = self.children();

        1 + left.map_or(0, Self::depth).max(right.map_or(0, Self::depth))
    }

    fn prepend(mut self, outer: Affine3A) -> Self {
        match &mut self {
            BinaryNode::Group { local, .. }
            | BinaryNode::Csg { local, .. }
            | BinaryNode::Geometry { local, .. } => {
                *local = outer * *local;
            }
        }

        self
    }
}

/// Normalizes the subtree rooted at `node`; returns `None` if nothing is
/// left of it (i.e. it consists only of empty groups).
pub fn normalize<N>(node: &N) -> Option<BinaryNode<'_, N>>
where
    N: SceneNode,
{
    match node.kind() {
        SceneNodeKind::Group => {
            let children: Vec<_> = (0..node.child_count())
                .filter_map(|idx| node.child(idx))
                .filter_map(normalize)
                .collect();

            halve(children, node.local())
        }

        SceneNodeKind::Csg(op) => {
            let left = node.child(0).and_then(normalize).map(Box::new);
            let right = node.child(1).and_then(normalize).map(Box::new);

            if left.is_none() && right.is_none() {
                return None;
            }

            Some(BinaryNode::Csg {
                local: node.local(),
                op,
                node,
                left,
                right,
            })
        }

        SceneNodeKind::Geometry => Some(BinaryNode::Geometry {
            local: node.local(),
            node,
        }),
    }
}

fn halve<'a, N>(
    mut children: Vec<BinaryNode<'a, N>>,
    local: Affine3A,
) -> Option<BinaryNode<'a, N>> {
    match children.len() {
        0 => None,
        1 => children.pop().map(|child| child.prepend(local)),

        len => {
            let right = children.split_off(len.div_ceil(2));
            let left = children;

            let left = halve(left, Affine3A::IDENTITY)?;
            let right = halve(right, Affine3A::IDENTITY)?;

            Some(BinaryNode::Group {
                local,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}
