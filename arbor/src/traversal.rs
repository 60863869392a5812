//! Stackless walks over the flattened trees.
//!
//! Both [`Acceleration::nodes()`] and [`Primitives::prim_tree()`] are laid
//! out in pre-order with miss links, so a walk is just a cursor that either
//! advances by one (descend) or jumps to `skip_index` (skip the subtree).

use crate::{
    AcceleratedNode, Acceleration, PrimTreeNode, PrimitiveId, Primitives,
};

/// Walks the subtree rooted at `start`, calling `visit` on each node in
/// pre-order; when `visit` returns `false`, the node's descendants are
/// skipped.
///
/// Nothing gets visited when `start` is out of range.
pub fn traverse(
    acceleration: &Acceleration,
    start: u32,
    mut visit: impl FnMut(&AcceleratedNode, u32) -> bool,
) {
    let nodes = acceleration.nodes();

    let Some(root) = nodes.get(start as usize) else {
        return;
    };

    let end = root.skip_index;
    let mut cursor = start;

    while cursor < end {
        let node = &nodes[cursor as usize];

        cursor = if visit(node, cursor) {
            cursor + 1
        } else {
            node.skip_index
        };
    }
}

/// Walks the prim-tree of given primitive, in the same manner as
/// [`traverse()`].
///
/// Indices passed to `visit` are absolute, i.e. they point into
/// [`Primitives::prim_tree()`].
pub fn traverse_prim_tree(
    primitives: &Primitives,
    id: PrimitiveId,
    mut visit: impl FnMut(&PrimTreeNode, u32) -> bool,
) {
    let Some(range) = primitives.tree_range(id) else {
        return;
    };

    let nodes = primitives.prim_tree();
    let mut cursor = range.start as u32;
    let end = range.end as u32;

    while cursor < end {
        let node = &nodes[cursor as usize];

        cursor = if visit(node, cursor) {
            cursor + 1
        } else {
            node.skip_index
        };
    }
}
