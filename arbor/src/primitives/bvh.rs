//! Per-primitive BVH, built with binned SAH.
//!
//! Special thanks to:
//! - https://jacco.ompf2.com/2022/04/13/how-to-build-a-bvh-part-1-basics/,
//! - https://github.com/svenstaro/bvh.

use glam::Vec3;

use crate::utils::{Axis, BoundingBox};
use crate::Config;

/// Entry of the flattened per-primitive BVH.
///
/// Nodes are laid out in pre-order: the first child of an internal node sits
/// right after it, the second one is pointed at explicitly and `skip_index`
/// points one past the node's subtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrimTreeNode {
    pub bounds: BoundingBox,
    pub skip_index: u32,
    pub kind: PrimTreeNodeKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimTreeNodeKind {
    Internal {
        second_child: u32,
    },

    /// Covers `prim_count` triangles, whose (already offset) vertex indices
    /// start at `first_index` in the global index array.
    Leaf {
        first_index: u32,
        prim_count: u32,
    },
}

impl PrimTreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PrimTreeNodeKind::Leaf { .. })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BvhTriangle {
    pub indices: [u32; 3],
    pub center: Vec3,
    pub bounds: BoundingBox,
}

impl BvhTriangle {
    pub fn new(indices: [u32; 3], positions: [Vec3; 3]) -> Self {
        Self {
            indices,
            center: positions.iter().copied().sum::<Vec3>() / 3.0,
            bounds: positions.into_iter().collect(),
        }
    }
}

/// Builds BVH over `triangles`, appending its nodes to `nodes` and the
/// triangles' indices (in leaf order, offset by `vertex_base`) to `indices`.
///
/// Returns the root's position within `nodes`.
pub fn build(
    config: &Config,
    triangles: &mut [BvhTriangle],
    vertex_base: u32,
    nodes: &mut Vec<PrimTreeNode>,
    indices: &mut Vec<u32>,
) -> u32 {
    assert!(!triangles.is_empty());

    let mut builder = Builder {
        config,
        vertex_base,
        nodes,
        indices,
    };

    builder.emit(triangles)
}

struct Builder<'a> {
    config: &'a Config,
    vertex_base: u32,
    nodes: &'a mut Vec<PrimTreeNode>,
    indices: &'a mut Vec<u32>,
}

impl Builder<'_> {
    fn emit(&mut self, triangles: &mut [BvhTriangle]) -> u32 {
        let id = self.nodes.len() as u32;
        let bounds: BoundingBox =
            triangles.iter().map(|tri| tri.bounds).collect();

        if triangles.len() <= self.config.max_leaf_triangles() {
            let first_index = self.indices.len() as u32;

            for triangle in triangles.iter() {
                self.indices.extend(
                    triangle.indices.map(|index| index + self.vertex_base),
                );
            }

            self.nodes.push(PrimTreeNode {
                bounds,
                skip_index: id + 1,
                kind: PrimTreeNodeKind::Leaf {
                    first_index,
                    prim_count: triangles.len() as u32,
                },
            });

            return id;
        }

        self.nodes.push(PrimTreeNode {
            bounds,
            skip_index: Default::default(),
            kind: PrimTreeNodeKind::Internal {
                second_child: Default::default(),
            },
        });

        let pivot = partition(triangles, self.config.sah_bins());
        let (left, right) = triangles.split_at_mut(pivot);

        let left_id = self.emit(left);
        let right_id = self.emit(right);

        debug_assert_eq!(id + 1, left_id);

        let skip_index = self.nodes.len() as u32;
        let node = &mut self.nodes[id as usize];

        node.kind = PrimTreeNodeKind::Internal {
            second_child: right_id,
        };

        node.skip_index = skip_index;

        id
    }
}

/// Reorders `triangles` so that `triangles[..pivot]` and `triangles[pivot..]`
/// form two non-empty halves; returns `pivot`.
fn partition(triangles: &mut [BvhTriangle], bins: usize) -> usize {
    if let Some(plane) = find_splitting_plane(triangles, bins) {
        let mut left_idx = 0;
        let mut right_idx = triangles.len();

        while left_idx < right_idx {
            if plane.bin_of(&triangles[left_idx]) <= plane.bin {
                left_idx += 1;
            } else {
                right_idx -= 1;
                triangles.swap(left_idx, right_idx);
            }
        }

        if left_idx > 0 && left_idx < triangles.len() {
            return left_idx;
        }
    }

    // Either all centroids coincide or the heuristic had nothing to offer -
    // fall back to splitting at the median centroid along the longest axis

    let axis = Axis::longest(
        triangles
            .iter()
            .map(|tri| tri.center)
            .collect::<BoundingBox>()
            .extent(),
    );

    let pivot = triangles.len() / 2;

    triangles.select_nth_unstable_by(pivot, |a, b| {
        a.center[axis].total_cmp(&b.center[axis])
    });

    pivot
}

fn find_splitting_plane(
    triangles: &[BvhTriangle],
    bins: usize,
) -> Option<SplittingPlane> {
    let centroid_bb: BoundingBox =
        triangles.iter().map(|tri| tri.center).collect();

    let extent = centroid_bb.extent();
    let mut best: Option<SplittingPlane> = None;

    for axis in Axis::all() {
        if extent[axis] <= 0.0 {
            continue;
        }

        let mut plane = SplittingPlane {
            split_by: axis,
            origin: centroid_bb.min()[axis],
            scale: (bins as f32) / extent[axis],
            bins,
            bin: 0,
            split_cost: f32::MAX,
        };

        let mut bin_counts = vec![0u32; bins];
        let mut bin_bounds = vec![BoundingBox::default(); bins];

        for triangle in triangles {
            let bin = plane.bin_of(triangle);

            bin_counts[bin] += 1;
            bin_bounds[bin] += triangle.bounds;
        }

        // ---

        let mut left_areas = vec![0.0; bins - 1];
        let mut right_areas = vec![0.0; bins - 1];
        let mut left_counts = vec![0; bins - 1];
        let mut right_counts = vec![0; bins - 1];
        let mut left_bb = BoundingBox::default();
        let mut right_bb = BoundingBox::default();
        let mut left_count = 0;
        let mut right_count = 0;

        for i in 0..(bins - 1) {
            left_count += bin_counts[i];
            left_counts[i] = left_count;
            left_bb += bin_bounds[i];
            left_areas[i] = left_bb.half_area();

            right_count += bin_counts[bins - 1 - i];
            right_counts[bins - 2 - i] = right_count;
            right_bb += bin_bounds[bins - 1 - i];
            right_areas[bins - 2 - i] = right_bb.half_area();
        }

        // ---

        for i in 0..(bins - 1) {
            if left_counts[i] == 0 || right_counts[i] == 0 {
                continue;
            }

            let split_cost = (left_counts[i] as f32) * left_areas[i]
                + (right_counts[i] as f32) * right_areas[i];

            let is_current_bin_better =
                best.map_or(true, |best| split_cost < best.split_cost);

            if is_current_bin_better {
                plane.bin = i;
                plane.split_cost = split_cost;

                best = Some(plane);
            }
        }
    }

    best
}

#[derive(Clone, Copy, Debug)]
struct SplittingPlane {
    split_by: Axis,
    origin: f32,
    scale: f32,
    bins: usize,

    /// Triangles falling into bins `0..=bin` go to the left.
    bin: usize,
    split_cost: f32,
}

impl SplittingPlane {
    fn bin_of(&self, triangle: &BvhTriangle) -> usize {
        let bin = (triangle.center[self.split_by] - self.origin) * self.scale;

        (bin as usize).min(self.bins - 1)
    }
}
