use std::sync::Arc;

use glam::{Affine3A, Vec3};

use super::{CsgOp, SceneNode, SceneNodeKind};
use crate::{Material, Primitive};

/// Minimal owned scene tree implementing [`SceneNode`].
///
/// Primitives and materials are kept behind `Arc`s, so that many geometries
/// can refer to the same instance.
#[derive(Clone, Debug)]
pub struct Node {
    local: Affine3A,
    body: NodeBody,
}

#[derive(Clone, Debug)]
enum NodeBody {
    Group {
        children: Vec<Node>,
    },

    Csg {
        op: CsgOp,
        operands: [Option<Box<Node>>; 2],
    },

    Geometry {
        primitive: Option<Arc<Primitive>>,
        material: Option<Arc<Material>>,
    },
}

impl Node {
    pub fn group(children: impl IntoIterator<Item = Node>) -> Self {
        Self {
            local: Affine3A::IDENTITY,
            body: NodeBody::Group {
                children: children.into_iter().collect(),
            },
        }
    }

    pub fn csg(op: CsgOp, lhs: Option<Node>, rhs: Option<Node>) -> Self {
        Self {
            local: Affine3A::IDENTITY,
            body: NodeBody::Csg {
                op,
                operands: [lhs.map(Box::new), rhs.map(Box::new)],
            },
        }
    }

    pub fn union(lhs: Node, rhs: Node) -> Self {
        Self::csg(CsgOp::Union, Some(lhs), Some(rhs))
    }

    pub fn intersection(lhs: Node, rhs: Node) -> Self {
        Self::csg(CsgOp::Intersection, Some(lhs), Some(rhs))
    }

    pub fn difference(lhs: Node, rhs: Node) -> Self {
        Self::csg(CsgOp::Difference, Some(lhs), Some(rhs))
    }

    pub fn geometry() -> Self {
        Self {
            local: Affine3A::IDENTITY,
            body: NodeBody::Geometry {
                primitive: None,
                material: None,
            },
        }
    }

    pub fn with_local(mut self, local: Affine3A) -> Self {
        self.local = local;
        self
    }

    pub fn with_translation(self, translation: Vec3) -> Self {
        self.with_local(Affine3A::from_translation(translation))
    }

    /// Attaches a primitive; no-op for non-geometry nodes.
    pub fn with_primitive(
        mut self,
        primitive: impl Into<Arc<Primitive>>,
    ) -> Self {
        if let NodeBody::Geometry { primitive: slot, .. } = &mut self.body {
            *slot = Some(primitive.into());
        }

        self
    }

    /// Attaches a material; no-op for non-geometry nodes.
    pub fn with_material(
        mut self,
        material: impl Into<Arc<Material>>,
    ) -> Self {
        if let NodeBody::Geometry { material: slot, .. } = &mut self.body {
            *slot = Some(material.into());
        }

        self
    }

    /// Appends a child; no-op for non-group nodes.
    pub fn with_child(mut self, child: Node) -> Self {
        if let NodeBody::Group { children } = &mut self.body {
            children.push(child);
        }

        self
    }
}

impl SceneNode for Node {
    fn kind(&self) -> SceneNodeKind {
        match &self.body {
            NodeBody::Group { .. } => SceneNodeKind::Group,
            NodeBody::Csg { op, .. } => SceneNodeKind::Csg(*op),
            NodeBody::Geometry { .. } => SceneNodeKind::Geometry,
        }
    }

    fn local(&self) -> Affine3A {
        self.local
    }

    fn child_count(&self) -> usize {
        match &self.body {
            NodeBody::Group { children } => children.len(),
            NodeBody::Csg { .. } => 2,
            NodeBody::Geometry { .. } => 0,
        }
    }

    fn child(&self, idx: usize) -> Option<&Self> {
        match &self.body {
            NodeBody::Group { children } => children.get(idx),
            NodeBody::Csg { operands, .. } => operands.get(idx)?.as_deref(),
            NodeBody::Geometry { .. } => None,
        }
    }

    fn primitive(&self) -> Option<&Primitive> {
        match &self.body {
            NodeBody::Geometry { primitive, .. } => primitive.as_deref(),
            _ => None,
        }
    }

    fn material(&self) -> Option<&Material> {
        match &self.body {
            NodeBody::Geometry { material, .. } => material.as_deref(),
            _ => None,
        }
    }
}
