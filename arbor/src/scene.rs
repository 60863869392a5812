mod node;

use glam::Affine3A;

pub use self::node::*;
use crate::{Material, Primitive};

/// Boolean operator of a constructive-solid-geometry node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CsgOp {
    Union,
    Intersection,
    Difference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneNodeKind {
    Group,
    Csg(CsgOp),
    Geometry,
}

/// Read-only view over a scene graph node.
///
/// The acceleration compiler only ever talks to the scene through this trait,
/// so any scene representation can be compiled as long as it can answer these
/// questions.
///
/// Children are addressed by slot: for groups every slot in
/// `0..child_count()` is expected to be occupied, while CSG nodes always
/// report two slots, either of which may be empty.
pub trait SceneNode {
    fn kind(&self) -> SceneNodeKind;

    /// Transform relative to the parent node.
    fn local(&self) -> Affine3A;

    fn child_count(&self) -> usize {
        0
    }

    fn child(&self, idx: usize) -> Option<&Self> {
        _ = idx;
        None
    }

    fn primitive(&self) -> Option<&Primitive> {
        None
    }

    fn material(&self) -> Option<&Material> {
        None
    }
}
