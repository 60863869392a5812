use glam::Affine3A;

use crate::normalizer::{normalize, BinaryNode};
use crate::utils::measure;
use crate::{
    AcceleratedNode, Acceleration, Config, MaterialId, Materials, NodeType,
    PrimitiveId, Primitives, SceneNode,
};

/// Compiles a scene into an [`Acceleration`].
///
/// The scene is first normalized into a binary tree and then walked once in
/// pre-order; geometries that cannot be ray-traced (no primitive, no
/// material, unsupported or malformed primitive) are skipped, and so are
/// groups and CSG nodes that end up with no children.
#[derive(Debug, Default)]
pub struct AccelerationBuilder {
    nodes: Vec<AcceleratedNode>,
    materials: Materials,
    primitives: Primitives,
}

impl AccelerationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            nodes: Default::default(),
            materials: Default::default(),
            primitives: Primitives::new(config),
        }
    }

    pub fn build<N>(mut self, root: &N) -> Acceleration
    where
        N: SceneNode,
    {
        log::debug!("Building acceleration");

        let tree = measure("Scene normalized", || normalize(root));

        if let Some(tree) = tree {
            measure("Nodes emitted", || {
                self.emit(&tree, None, Affine3A::IDENTITY);
            });
        }

        let acceleration = Acceleration {
            nodes: self.nodes,
            materials: self.materials,
            primitives: self.primitives,
        };

        if cfg!(debug_assertions) {
            acceleration.assert_valid();
        }

        log::debug!(
            "Acceleration built; nodes = {}, materials = {}, primitives = {}, \
             vertices = {}, prim-tree = {}",
            acceleration.nodes.len(),
            acceleration.materials.len(),
            acceleration.primitives.len(),
            acceleration.primitives.triangles().len(),
            acceleration.primitives.prim_tree().len(),
        );

        acceleration
    }

    /// Emits `node`'s subtree; returns whether anything got emitted.
    fn emit<N>(
        &mut self,
        node: &BinaryNode<'_, N>,
        parent: Option<u32>,
        parent_world: Affine3A,
    ) -> bool
    where
        N: SceneNode,
    {
        let world = parent_world * node.local();

        match node {
            BinaryNode::Geometry { node, .. } => {
                self.emit_geometry(*node, parent, world)
            }

            BinaryNode::Group { .. } => {
                self.emit_branch(NodeType::Group, node, parent, world)
            }

            BinaryNode::Csg { op, .. } => {
                self.emit_branch(NodeType::from_csg(*op), node, parent, world)
            }
        }
    }

    fn emit_geometry<N>(
        &mut self,
        node: &N,
        parent: Option<u32>,
        world: Affine3A,
    ) -> bool
    where
        N: SceneNode,
    {
        let Some(primitive) = node.primitive() else {
            log::trace!("Skipping geometry: no primitive");
            return false;
        };

        let Some(ty) = NodeType::from_primitive(primitive.kind()) else {
            log::trace!(
                "Skipping geometry: unsupported primitive kind {:?}",
                primitive.kind()
            );

            return false;
        };

        let Some(material) = node.material() else {
            log::trace!("Skipping geometry: no material");
            return false;
        };

        let primitive_index = if ty == NodeType::PrimitiveTriangles {
            let Some(id) = self.primitives.register(primitive) else {
                log::trace!("Skipping geometry: primitive got rejected");
                return false;
            };

            Some(id)
        } else {
            None
        };

        let material_index = self.materials.register(material);

        self.push(ty, parent, world, Some(material_index), primitive_index);

        true
    }

    fn emit_branch<N>(
        &mut self,
        ty: NodeType,
        node: &BinaryNode<'_, N>,
        parent: Option<u32>,
        world: Affine3A,
    ) -> bool
    where
        N: SceneNode,
    {
        let (left, right) = node.children();
        let index = self.push(ty, parent, world, None, None);

        let left_emitted =
            left.map_or(false, |left| self.emit(left, Some(index), world));

        let right_start = self.nodes.len() as u32;

        let right_emitted =
            right.map_or(false, |right| self.emit(right, Some(index), world));

        if !left_emitted && !right_emitted {
            log::trace!("Skipping {ty}: no children left");

            self.nodes.truncate(index as usize);

            return false;
        }

        let skip_index = self.nodes.len() as u32;
        let node = &mut self.nodes[index as usize];

        node.second_child_index = right_emitted.then_some(right_start);
        node.skip_index = skip_index;

        true
    }

    fn push(
        &mut self,
        ty: NodeType,
        parent: Option<u32>,
        world: Affine3A,
        material_index: Option<MaterialId>,
        primitive_index: Option<PrimitiveId>,
    ) -> u32 {
        let index = self.nodes.len() as u32;

        self.nodes.push(AcceleratedNode {
            ty,
            world,
            world_inverse: world.inverse(),
            parent_index: parent,
            second_child_index: None,
            skip_index: index + 1,
            material_index,
            primitive_index,
        });

        index
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use glam::{vec3, Quat, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::{CsgOp, Material, Node, Primitive, VertexLayout};

    fn sphere() -> Node {
        Node::geometry()
            .with_primitive(Primitive::sphere())
            .with_material(Material::default())
    }

    fn line_list() -> Primitive {
        Primitive::lines(
            VertexLayout::standard(),
            vec![0.0; 16],
            vec![0, 1],
        )
    }

    fn triangle() -> Primitive {
        #[rustfmt::skip]
        let vertices = vec![
            0.0, 0.0, 0.0, /**/ 0.0, 0.0, 1.0, /**/ 0.0, 0.0,
            1.0, 0.0, 0.0, /**/ 0.0, 0.0, 1.0, /**/ 1.0, 0.0,
            0.0, 1.0, 0.0, /**/ 0.0, 0.0, 1.0, /**/ 0.0, 1.0,
        ];

        Primitive::triangles(VertexLayout::standard(), vertices, vec![0, 1, 2])
    }

    /// Returns `(ty, parent, second child, skip)` of each node.
    fn layout(
        target: &Acceleration,
    ) -> Vec<(NodeType, Option<u32>, Option<u32>, u32)> {
        target
            .nodes()
            .iter()
            .map(|node| {
                (
                    node.ty,
                    node.parent_index,
                    node.second_child_index,
                    node.skip_index,
                )
            })
            .collect()
    }

    #[test]
    fn empty_scene() {
        let target = Acceleration::build(&Node::group([]));

        assert!(target.is_empty());
        assert!(target.materials().is_empty());
        assert!(target.primitives().is_empty());
    }

    #[test]
    fn lone_sphere() {
        let scene = sphere().with_translation(vec3(1.0, 2.0, 3.0));
        let target = Acceleration::build(&scene);

        assert_eq!(1, target.len());

        let node = target.nodes()[0];

        assert_eq!(NodeType::PrimitiveSphere, node.ty);
        assert_eq!(vec3(1.0, 2.0, 3.0), Vec3::from(node.world.translation));

        assert_eq!(
            vec3(-1.0, -2.0, -3.0),
            Vec3::from(node.world_inverse.translation)
        );

        assert_eq!(None, node.parent_index);
        assert_eq!(None, node.second_child_index);
        assert_eq!(1, node.skip_index);
        assert_eq!(Some(MaterialId::new(0)), node.material_index);
        assert_eq!(None, node.primitive_index);
        assert_eq!(1, target.materials().len());
        assert!(target.primitives().is_empty());
    }

    #[test]
    fn lone_sphere_in_a_group() {
        let scene =
            Node::group([sphere().with_translation(vec3(1.0, 2.0, 3.0))]);
        let target = Acceleration::build(&scene);

        assert_eq!(
            vec![(NodeType::PrimitiveSphere, None, None, 1)],
            layout(&target)
        );

        assert_eq!(
            vec3(1.0, 2.0, 3.0),
            Vec3::from(target.nodes()[0].world.translation)
        );
    }

    #[test]
    fn line_list_is_skipped() {
        let scene = Node::geometry()
            .with_primitive(line_list())
            .with_material(Material::default());

        let target = Acceleration::build(&scene);

        assert_eq!(0, target.len());
        assert_eq!(0, target.materials().len());
    }

    #[test]
    fn geometry_without_primitive_is_skipped() {
        let scene = Node::geometry().with_material(Material::default());
        let target = Acceleration::build(&scene);

        assert_eq!(0, target.len());
        assert_eq!(0, target.materials().len());
    }

    #[test]
    fn geometry_without_material_is_skipped() {
        let scene = Node::group([
            Node::geometry().with_primitive(Primitive::sphere()),
            Node::geometry().with_primitive(triangle()),
        ]);

        let target = Acceleration::build(&scene);

        assert!(target.is_empty());
        assert!(target.materials().is_empty());
        assert!(target.primitives().is_empty());
    }

    #[test]
    fn eight_spheres() {
        let scene = Node::group((0..8).map(|_| sphere()));
        let target = Acceleration::build(&scene);

        use NodeType::{Group as G, PrimitiveSphere as S};

        assert_eq!(
            vec![
                (G, None, Some(8), 15),
                (G, Some(0), Some(5), 8),
                (G, Some(1), Some(4), 5),
                (S, Some(2), None, 4),
                (S, Some(2), None, 5),
                (G, Some(1), Some(7), 8),
                (S, Some(5), None, 7),
                (S, Some(5), None, 8),
                (G, Some(0), Some(12), 15),
                (G, Some(8), Some(11), 12),
                (S, Some(9), None, 11),
                (S, Some(9), None, 12),
                (G, Some(8), Some(14), 15),
                (S, Some(12), None, 14),
                (S, Some(12), None, 15),
            ],
            layout(&target)
        );

        let material_indices: Vec<_> = target
            .nodes()
            .iter()
            .filter_map(|node| node.material_index)
            .map(|id| id.get())
            .collect();

        assert_eq!((0..8).collect::<Vec<_>>(), material_indices);
        assert_eq!(8, target.materials().len());
    }

    #[test]
    fn three_children() {
        let scene = Node::group([sphere(), sphere(), sphere()]);
        let target = Acceleration::build(&scene);

        use NodeType::{Group as G, PrimitiveSphere as S};

        assert_eq!(
            vec![
                (G, None, Some(4), 5),
                (G, Some(0), Some(3), 4),
                (S, Some(1), None, 3),
                (S, Some(1), None, 4),
                (S, Some(0), None, 5),
            ],
            layout(&target)
        );
    }

    #[test]
    fn shared_triangle_primitive() {
        let primitive = Arc::new(triangle());

        let scene = Node::group([
            Node::geometry()
                .with_primitive(primitive.clone())
                .with_material(Material::default()),
            Node::geometry()
                .with_primitive(primitive)
                .with_material(Material::default()),
        ]);

        let target = Acceleration::build(&scene);

        assert_eq!(3, target.len());
        assert_eq!(1, target.primitives().prim_tree().len());
        assert_eq!(1, target.primitives().len());
        assert_eq!(3, target.primitives().triangles().len());
        assert_eq!(2, target.materials().len());

        assert_eq!(
            Some(PrimitiveId::new(0)),
            target.nodes()[1].primitive_index
        );

        assert_eq!(
            Some(PrimitiveId::new(0)),
            target.nodes()[2].primitive_index
        );
    }

    #[test]
    fn identical_but_distinct_primitives() {
        let scene = Node::group([
            Node::geometry()
                .with_primitive(triangle())
                .with_material(Material::default()),
            Node::geometry()
                .with_primitive(triangle())
                .with_material(Material::default()),
        ]);

        let target = Acceleration::build(&scene);

        assert_eq!(2, target.primitives().len());
        assert_eq!(2, target.primitives().prim_tree().len());
        assert_eq!(6, target.primitives().triangles().len());
        assert_eq!(&[0, 1, 2, 3, 4, 5], target.primitives().indices());

        assert_eq!(
            Some(PrimitiveId::new(1)),
            target.nodes()[2].primitive_index
        );
    }

    #[test]
    fn degenerate_triangle_primitive() {
        let primitive = Primitive::triangles(
            VertexLayout::standard(),
            vec![0.0; 8],
            vec![0],
        );

        let scene = Node::geometry()
            .with_primitive(primitive)
            .with_material(Material::default());

        let target = Acceleration::build(&scene);

        assert_eq!(0, target.len());
        assert!(target.materials().is_empty());
        assert!(target.primitives().triangles().is_empty());
        assert!(target.primitives().indices().is_empty());
        assert!(target.primitives().index_offsets().is_empty());
        assert!(target.primitives().prim_tree().is_empty());
    }

    #[test]
    fn csg_with_skipped_first_operand() {
        let scene = Node::difference(
            Node::geometry().with_primitive(Primitive::cuboid()),
            sphere(),
        );

        let target = Acceleration::build(&scene);

        assert_eq!(
            vec![
                (NodeType::CsgDifference, None, Some(1), 2),
                (NodeType::PrimitiveSphere, Some(0), None, 2),
            ],
            layout(&target)
        );

        assert_eq!(None, target.first_child(0));
        assert_eq!(Some(1), target.second_child(0));
    }

    #[test]
    fn csg_with_missing_second_operand() {
        let scene = Node::csg(CsgOp::Intersection, Some(sphere()), None);
        let target = Acceleration::build(&scene);

        assert_eq!(
            vec![
                (NodeType::CsgIntersection, None, None, 2),
                (NodeType::PrimitiveSphere, Some(0), None, 2),
            ],
            layout(&target)
        );

        assert_eq!(Some(1), target.first_child(0));
        assert_eq!(None, target.second_child(0));
    }

    #[test]
    fn csg_operands() {
        let cylinder = Node::geometry()
            .with_primitive(Primitive::cylinder())
            .with_material(Material::default());

        let scene = Node::union(Node::group([sphere(), sphere()]), cylinder);
        let target = Acceleration::build(&scene);

        use NodeType::{CsgUnion as U, Group as G, PrimitiveSphere as S};

        assert_eq!(
            vec![
                (U, None, Some(4), 5),
                (G, Some(0), Some(3), 4),
                (S, Some(1), None, 3),
                (S, Some(1), None, 4),
                (NodeType::PrimitiveCylinder, Some(0), None, 5),
            ],
            layout(&target)
        );

        assert_eq!(Some(1), target.first_child(0));
        assert_eq!(Some(4), target.second_child(0));
        assert_eq!(Some(0..5), target.subtree(0));
        assert_eq!(Some(1..4), target.subtree(1));
    }

    #[test]
    fn empty_branches_are_dropped() {
        let unsupported = || {
            Node::geometry()
                .with_primitive(line_list())
                .with_material(Material::default())
        };

        let scene = Node::group([
            Node::group([unsupported(), unsupported()]),
            Node::union(unsupported(), Node::geometry()),
            Node::group([Node::group([unsupported()]), sphere()]),
        ]);

        let target = Acceleration::build(&scene);

        // Every branch but the last one vanishes, which leaves the root with
        // just its second child
        assert_eq!(
            vec![
                (NodeType::Group, None, Some(1), 3),
                (NodeType::Group, Some(0), Some(2), 3),
                (NodeType::PrimitiveSphere, Some(1), None, 3),
            ],
            layout(&target)
        );

        assert_eq!(1, target.materials().len());
    }

    #[test]
    fn transforms_accumulate() {
        let scene = Node::group([
            sphere().with_translation(vec3(1.0, 0.0, 0.0)),
            sphere().with_translation(vec3(2.0, 0.0, 0.0)),
            Node::group([sphere()]).with_local(
                Affine3A::from_scale_rotation_translation(
                    Vec3::splat(2.0),
                    Quat::from_rotation_y(1.0),
                    vec3(0.0, 0.0, 3.0),
                ),
            ),
        ])
        .with_translation(vec3(0.0, 5.0, 0.0));

        let target = Acceleration::build(&scene);
        let nodes = target.nodes();

        assert_eq!(5, nodes.len());

        let translations: Vec<_> = nodes
            .iter()
            .map(|node| Vec3::from(node.world.translation))
            .collect();

        assert_eq!(
            vec![
                vec3(0.0, 5.0, 0.0),
                vec3(0.0, 5.0, 0.0),
                vec3(1.0, 5.0, 0.0),
                vec3(2.0, 5.0, 0.0),
                vec3(0.0, 5.0, 3.0),
            ],
            translations
        );

        for node in nodes {
            let identity = node.world * node.world_inverse;

            for (actual, expected) in identity
                .to_cols_array()
                .into_iter()
                .zip(Affine3A::IDENTITY.to_cols_array())
            {
                assert_relative_eq!(actual, expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn display() {
        let scene = Node::group([
            sphere(),
            Node::geometry()
                .with_primitive(triangle())
                .with_material(Material::default()),
        ]);

        let target = Acceleration::build(&scene);

        let expected = [
            "[0]: group, parent=-, second=2, skip=3, material=-, primitive=-",
            "[1]: sphere, parent=0, second=-, skip=2, material=0, primitive=-",
            "[2]: triangles, parent=0, second=-, skip=3, material=1, \
             primitive=0",
        ];

        assert_eq!(
            expected.map(|line| format!("{line}\n")).concat(),
            target.to_string()
        );
    }

    /// Generates a random scene, returning it together with the number of
    /// geometries in it that are expected to be emitted.
    fn random_scene(rng: &mut StdRng, depth: u32) -> (Node, usize) {
        let shared = Arc::new(triangle());

        fn go(
            rng: &mut StdRng,
            shared: &Arc<Primitive>,
            depth: u32,
        ) -> (Node, usize) {
            let choice = if depth == 0 {
                rng.gen_range(0..6)
            } else {
                rng.gen_range(0..9)
            };

            let translation = vec3(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );

            match choice {
                0 => (sphere().with_translation(translation), 1),

                1 => (
                    Node::geometry()
                        .with_primitive(shared.clone())
                        .with_material(Material::default())
                        .with_translation(translation),
                    1,
                ),

                2 => (
                    Node::geometry()
                        .with_primitive(line_list())
                        .with_material(Material::default()),
                    0,
                ),

                3 => (Node::geometry().with_primitive(Primitive::cuboid()), 0),
                4 => (Node::geometry(), 0),

                5 => (
                    Node::geometry()
                        .with_primitive(Primitive::triangles(
                            VertexLayout::standard(),
                            vec![0.0; 8],
                            vec![0],
                        ))
                        .with_material(Material::default()),
                    0,
                ),

                6 | 7 => {
                    let mut count = 0;

                    let children: Vec<_> = (0..rng.gen_range(0..6))
                        .map(|_| {
                            let (child, child_count) =
                                go(rng, shared, depth - 1);

                            count += child_count;
                            child
                        })
                        .collect();

                    (
                        Node::group(children).with_translation(translation),
                        count,
                    )
                }

                _ => {
                    let mut count = 0;

                    let mut operand = |rng: &mut StdRng| {
                        if rng.gen_bool(0.2) {
                            return None;
                        }

                        let (child, child_count) = go(rng, shared, depth - 1);

                        count += child_count;
                        Some(child)
                    };

                    let lhs = operand(rng);
                    let rhs = operand(rng);

                    (Node::csg(CsgOp::Union, lhs, rhs), count)
                }
            }
        }

        go(rng, &shared, depth)
    }

    #[test]
    fn random_scenes() {
        let mut rng = StdRng::seed_from_u64(1234);

        for _ in 0..200 {
            let (scene, expected_leaves) = random_scene(&mut rng, 5);
            let target = Acceleration::build(&scene);

            target.assert_valid();

            let actual_leaves = target
                .nodes()
                .iter()
                .filter(|node| node.ty.is_primitive())
                .count();

            assert_eq!(expected_leaves, actual_leaves);
            assert_eq!(expected_leaves, target.materials().len());
            assert!(target.primitives().len() <= 1);

            for (index, node) in target.nodes().iter().enumerate().skip(1) {
                let index = index as u32;
                let parent = node.parent_index.unwrap();

                assert!(parent < index);
                assert!(target.subtree(parent).unwrap().contains(&index));
            }

            // Branches with no children never get emitted
            for (index, node) in target.nodes().iter().enumerate() {
                if !node.ty.is_primitive() {
                    assert!(node.skip_index as usize > index + 1);
                }
            }
        }
    }

    #[test]
    fn acceleration_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Acceleration>();
    }
}
