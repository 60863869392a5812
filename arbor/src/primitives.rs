mod bvh;

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use fxhash::FxHashMap;
use glam::{Vec2, Vec3};

pub use self::bvh::*;
use crate::{
    Config, Primitive, PrimitiveHandle, PrimitiveKind, VertexChannel,
    VertexLayout,
};

/// Vertex record, as stored in [`Primitives::triangles()`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Global triangle tables shared by all triangle primitives of a scene.
///
/// Each registered primitive owns a contiguous slice of every table; slices
/// are appended in registration order and never move.
#[derive(Clone, Debug, Default)]
pub struct Primitives {
    config: Config,
    index: FxHashMap<PrimitiveHandle, PrimitiveId>,
    triangles: Vec<Vertex>,
    indices: Vec<u32>,
    index_offsets: Vec<u32>,
    prim_tree: Vec<PrimTreeNode>,
    tree_offsets: Vec<u32>,
}

impl Primitives {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Registers a triangle primitive, returning its id.
    ///
    /// Primitives are recognized by their handle: registering the same
    /// primitive twice yields the same id and doesn't touch any of the
    /// tables. Returns `None` (leaving the tables intact) for anything that
    /// is not a well-formed triangle mesh with positions, normals and
    /// texture coordinates.
    pub fn register(&mut self, primitive: &Primitive) -> Option<PrimitiveId> {
        if let Some(id) = self.index.get(&primitive.handle()) {
            return Some(*id);
        }

        if let Err(reason) = Self::validate(primitive) {
            log::trace!(
                "Rejecting primitive {:?}: {reason}",
                primitive.handle()
            );

            return None;
        }

        let vertices = Self::read_vertices(primitive)?;

        let mut triangles: Vec<_> = primitive
            .indices()
            .chunks_exact(3)
            .map(|tri| {
                let tri = [tri[0], tri[1], tri[2]];

                BvhTriangle::new(
                    tri,
                    tri.map(|idx| vertices[idx as usize].position),
                )
            })
            .collect();

        let id = PrimitiveId::new(self.index_offsets.len() as u32);
        let vertex_base = self.triangles.len() as u32;

        let tree_offset = self.prim_tree.len() as u32;

        self.index_offsets.push(self.indices.len() as u32);
        self.tree_offsets.push(tree_offset);
        self.triangles.extend(vertices);

        let root = bvh::build(
            &self.config,
            &mut triangles,
            vertex_base,
            &mut self.prim_tree,
            &mut self.indices,
        );

        debug_assert_eq!(tree_offset, root);

        self.index.insert(primitive.handle(), id);

        log::trace!(
            "Registered primitive {:?} as {:?}; triangles = {}",
            primitive.handle(),
            id,
            triangles.len()
        );

        Some(id)
    }

    fn validate(primitive: &Primitive) -> Result<(), &'static str> {
        if primitive.kind() != PrimitiveKind::Triangles {
            return Err("not a triangle mesh");
        }

        let layout = primitive.layout();

        let has_required_channels = [
            VertexChannel::Position,
            VertexChannel::Normal,
            VertexChannel::TexCoord,
        ]
        .into_iter()
        .all(|channel| layout.has(channel));

        if !has_required_channels {
            return Err("vertex layout lacks positions, normals or uvs");
        }

        if primitive.indices().len() < 3 {
            return Err("degenerate (fewer than three indices)");
        }

        let vertex_count = primitive.vertex_count();

        let has_valid_indices = primitive
            .indices()
            .chunks_exact(3)
            .flatten()
            .all(|&idx| (idx as usize) < vertex_count);

        if !has_valid_indices {
            return Err("index out of bounds");
        }

        Ok(())
    }

    fn read_vertices(primitive: &Primitive) -> Option<Vec<Vertex>> {
        let layout: &VertexLayout = primitive.layout();
        let buffer = primitive.vertices();

        (0..primitive.vertex_count())
            .map(|idx| {
                let position =
                    layout.read(buffer, idx, VertexChannel::Position)?;

                let normal = layout.read(buffer, idx, VertexChannel::Normal)?;
                let uv = layout.read(buffer, idx, VertexChannel::TexCoord)?;

                Some(Vertex {
                    position: Vec3::from_slice(position),
                    normal: Vec3::from_slice(normal),
                    uv: Vec2::from_slice(uv),
                })
            })
            .collect()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Vertex records of all registered primitives.
    pub fn triangles(&self) -> &[Vertex] {
        &self.triangles
    }

    /// Triangle indices of all registered primitives, already offset into
    /// [`Self::triangles()`].
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Start of each primitive's slice within [`Self::indices()`].
    pub fn index_offsets(&self) -> &[u32] {
        &self.index_offsets
    }

    /// BVH nodes of all registered primitives.
    pub fn prim_tree(&self) -> &[PrimTreeNode] {
        &self.prim_tree
    }

    /// Root of each primitive's BVH within [`Self::prim_tree()`].
    pub fn tree_offsets(&self) -> &[u32] {
        &self.tree_offsets
    }

    pub fn len(&self) -> usize {
        self.index_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_offsets.is_empty()
    }

    /// Returns range of [`Self::indices()`] belonging to given primitive.
    pub fn index_range(&self, id: PrimitiveId) -> Option<Range<usize>> {
        let id = id.get() as usize;
        let start = *self.index_offsets.get(id)? as usize;

        let end = self
            .index_offsets
            .get(id + 1)
            .map_or(self.indices.len(), |end| *end as usize);

        Some(start..end)
    }

    /// Returns range of [`Self::prim_tree()`] belonging to given primitive.
    pub fn tree_range(&self, id: PrimitiveId) -> Option<Range<usize>> {
        let id = id.get() as usize;
        let start = *self.tree_offsets.get(id)? as usize;

        let end = self
            .tree_offsets
            .get(id + 1)
            .map_or(self.prim_tree.len(), |end| *end as usize);

        Some(start..end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u32);

impl PrimitiveId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}
