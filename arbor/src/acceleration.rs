use std::fmt;
use std::ops::Range;

use glam::Affine3A;

use crate::{
    AccelerationBuilder, Config, CsgOp, MaterialId, MaterialRecord,
    Materials, PrimitiveId, PrimitiveKind, Primitives, SceneNode,
};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Group = 0,
    CsgUnion = 1,
    CsgIntersection = 2,
    CsgDifference = 3,
    PrimitiveSphere = 4,
    PrimitiveBox = 5,
    PrimitiveCylinder = 6,
    PrimitiveTriangles = 7,
}

impl NodeType {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            NodeType::PrimitiveSphere
                | NodeType::PrimitiveBox
                | NodeType::PrimitiveCylinder
                | NodeType::PrimitiveTriangles
        )
    }

    pub(crate) fn from_csg(op: CsgOp) -> Self {
        match op {
            CsgOp::Union => NodeType::CsgUnion,
            CsgOp::Intersection => NodeType::CsgIntersection,
            CsgOp::Difference => NodeType::CsgDifference,
        }
    }

    /// Returns node type for given primitive kind, or `None` if that kind
    /// cannot be ray-traced.
    pub(crate) fn from_primitive(kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::Sphere => Some(NodeType::PrimitiveSphere),
            PrimitiveKind::Cuboid => Some(NodeType::PrimitiveBox),
            PrimitiveKind::Cylinder => Some(NodeType::PrimitiveCylinder),
            PrimitiveKind::Triangles => Some(NodeType::PrimitiveTriangles),
            PrimitiveKind::Lines | PrimitiveKind::Points => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Group => "group",
            NodeType::CsgUnion => "union",
            NodeType::CsgIntersection => "intersection",
            NodeType::CsgDifference => "difference",
            NodeType::PrimitiveSphere => "sphere",
            NodeType::PrimitiveBox => "box",
            NodeType::PrimitiveCylinder => "cylinder",
            NodeType::PrimitiveTriangles => "triangles",
        };

        f.write_str(name)
    }
}

/// Single entry of [`Acceleration::nodes()`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceleratedNode {
    pub ty: NodeType,
    pub world: Affine3A,
    pub world_inverse: Affine3A,

    /// Nearest emitted ancestor; `None` only for the root.
    pub parent_index: Option<u32>,

    /// Where the second child's subtree starts.
    ///
    /// The first child, if any, lives at `index + 1` - unless that slot is
    /// the second child itself, which happens when the first child has been
    /// skipped.
    pub second_child_index: Option<u32>,

    /// One past the last node of this node's subtree.
    pub skip_index: u32,

    pub material_index: Option<MaterialId>,
    pub primitive_index: Option<PrimitiveId>,
}

/// Flattened, immutable acceleration structure of a scene.
///
/// Nodes are stored in pre-order, so every subtree occupies a contiguous
/// range of indices starting at its root.
#[derive(Clone, Debug, Default)]
pub struct Acceleration {
    pub(crate) nodes: Vec<AcceleratedNode>,
    pub(crate) materials: Materials,
    pub(crate) primitives: Primitives,
}

impl Acceleration {
    /// Compiles scene rooted at `root` using the default [`Config`].
    pub fn build<N>(root: &N) -> Self
    where
        N: SceneNode,
    {
        Self::build_with(root, Config::default())
    }

    pub fn build_with<N>(root: &N, config: Config) -> Self
    where
        N: SceneNode,
    {
        AccelerationBuilder::new(config).build(root)
    }

    pub fn nodes(&self) -> &[AcceleratedNode] {
        &self.nodes
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    pub fn material(
        &self,
        node: &AcceleratedNode,
    ) -> Option<&MaterialRecord> {
        self.materials.get(node.material_index?)
    }

    /// Returns whether the scene compiled to nothing ray-traceable.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns index of the first child of given node.
    pub fn first_child(&self, index: u32) -> Option<u32> {
        let node = self.nodes.get(index as usize)?;
        let next = index + 1;

        if next < node.skip_index && node.second_child_index != Some(next) {
            Some(next)
        } else {
            None
        }
    }

    /// Returns index of the second child of given node.
    pub fn second_child(&self, index: u32) -> Option<u32> {
        self.nodes.get(index as usize)?.second_child_index
    }

    /// Returns range of indices occupied by given node's subtree.
    pub fn subtree(&self, index: u32) -> Option<Range<u32>> {
        let node = self.nodes.get(index as usize)?;

        Some(index..node.skip_index)
    }

    /// Panics if any of the structural invariants doesn't hold.
    pub(crate) fn assert_valid(&self) {
        let len = self.nodes.len() as u32;

        for (index, node) in self.nodes.iter().enumerate() {
            let index = index as u32;

            assert!(
                node.skip_index > index && node.skip_index <= len,
                "node {index} has invalid skip index {}",
                node.skip_index
            );

            match node.parent_index {
                Some(parent_index) => {
                    let parent = &self.nodes[parent_index as usize];

                    assert!(
                        parent_index < index && index < parent.skip_index,
                        "node {index} lies outside of its parent's subtree"
                    );
                }

                None => {
                    assert_eq!(0, index, "node {index} has no parent");
                    assert_eq!(len, node.skip_index, "root must span all");
                }
            }

            if let Some(second) = node.second_child_index {
                assert!(
                    second > index && second < node.skip_index,
                    "node {index} has invalid second child {second}"
                );

                assert_eq!(
                    Some(index),
                    self.nodes[second as usize].parent_index,
                    "node {second} is not a child of node {index}"
                );
            }

            if node.ty.is_primitive() {
                assert_eq!(None, node.second_child_index);
                assert_eq!(index + 1, node.skip_index);
            }
        }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(f: &mut fmt::Formatter<'_>, val: Option<u32>) -> fmt::Result {
            match val {
                Some(val) => write!(f, "{val}"),
                None => write!(f, "-"),
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            write!(f, "[{index}]: {}, parent=", node.ty)?;
            opt(f, node.parent_index)?;
            write!(f, ", second=")?;
            opt(f, node.second_child_index)?;
            write!(f, ", skip={}, material=", node.skip_index)?;
            opt(f, node.material_index.map(|id| id.get()))?;
            write!(f, ", primitive=")?;
            opt(f, node.primitive_index.map(|id| id.get()))?;
            writeln!(f)?;
        }

        Ok(())
    }
}
