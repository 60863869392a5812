use std::sync::atomic::{AtomicU64, Ordering};

use derivative::Derivative;

/// Stable identity of a [`Primitive`], assigned once at creation.
///
/// Two primitives with identical contents still get different handles, which
/// is what the primitive deduplication keys on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveHandle(u64);

impl PrimitiveHandle {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);

        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Sphere,
    Cuboid,
    Cylinder,
    Triangles,
    Lines,
    Points,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexChannel {
    Position,
    Normal,
    TexCoord,
    Tangent,
    Color,
}

impl VertexChannel {
    /// Number of `f32` components this channel occupies.
    pub fn components(&self) -> usize {
        match self {
            VertexChannel::Position | VertexChannel::Normal => 3,
            VertexChannel::TexCoord => 2,
            VertexChannel::Tangent | VertexChannel::Color => 4,
        }
    }
}

/// Describes how vertices are laid out inside a primitive's raw `f32` buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    stride: usize,
    channels: Vec<(VertexChannel, usize)>,
}

impl VertexLayout {
    /// Creates a layout where `channels` are interleaved one after another,
    /// in the given order, without any padding.
    pub fn interleaved(
        channels: impl IntoIterator<Item = VertexChannel>,
    ) -> Self {
        let mut this = Self::default();

        for channel in channels {
            this.channels.push((channel, this.stride));
            this.stride += channel.components();
        }

        this
    }

    /// Position + normal + texture coordinates, the layout triangle meshes
    /// are expected to come with.
    pub fn standard() -> Self {
        Self::interleaved([
            VertexChannel::Position,
            VertexChannel::Normal,
            VertexChannel::TexCoord,
        ])
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn offset(&self, channel: VertexChannel) -> Option<usize> {
        self.channels
            .iter()
            .find(|(ch, _)| *ch == channel)
            .map(|(_, offset)| *offset)
    }

    pub fn has(&self, channel: VertexChannel) -> bool {
        self.offset(channel).is_some()
    }

    /// Returns number of whole vertices stored in a buffer of given length.
    pub fn vertex_count(&self, buffer_len: usize) -> usize {
        if self.stride == 0 {
            0
        } else {
            buffer_len / self.stride
        }
    }

    /// Returns components of `channel` for the `vertex`-th vertex.
    pub fn read<'a>(
        &self,
        buffer: &'a [f32],
        vertex: usize,
        channel: VertexChannel,
    ) -> Option<&'a [f32]> {
        let start = vertex * self.stride + self.offset(channel)?;

        buffer.get(start..start + channel.components())
    }
}

/// A single shape attached to a geometry node.
///
/// Intentionally not `Clone` - a clone would share the handle and so be
/// considered the very same primitive; share it through an `Arc` instead.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Primitive {
    handle: PrimitiveHandle,
    kind: PrimitiveKind,
    layout: VertexLayout,
    #[derivative(Debug = "ignore")]
    vertices: Vec<f32>,
    #[derivative(Debug = "ignore")]
    indices: Vec<u32>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            handle: PrimitiveHandle::next(),
            kind,
            layout: Default::default(),
            vertices: Default::default(),
            indices: Default::default(),
        }
    }

    pub fn sphere() -> Self {
        Self::new(PrimitiveKind::Sphere)
    }

    pub fn cuboid() -> Self {
        Self::new(PrimitiveKind::Cuboid)
    }

    pub fn cylinder() -> Self {
        Self::new(PrimitiveKind::Cylinder)
    }

    pub fn triangles(
        layout: VertexLayout,
        vertices: Vec<f32>,
        indices: Vec<u32>,
    ) -> Self {
        Self::new(PrimitiveKind::Triangles)
            .with_vertices(layout, vertices)
            .with_indices(indices)
    }

    pub fn lines(
        layout: VertexLayout,
        vertices: Vec<f32>,
        indices: Vec<u32>,
    ) -> Self {
        Self::new(PrimitiveKind::Lines)
            .with_vertices(layout, vertices)
            .with_indices(indices)
    }

    pub fn with_vertices(
        mut self,
        layout: VertexLayout,
        vertices: Vec<f32>,
    ) -> Self {
        self.layout = layout;
        self.vertices = vertices;
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn handle(&self) -> PrimitiveHandle {
        self.handle
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count(self.vertices.len())
    }
}
