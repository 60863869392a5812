//! Compiles scene graphs into flat acceleration structures for ray tracing.
//!
//! The pipeline goes:
//!
//! - [`normalize()`] rewrites the scene into a binary tree,
//! - [`AccelerationBuilder`] walks that tree in pre-order, skipping geometry
//!   that cannot be ray-traced, registering materials into [`Materials`] and
//!   triangle meshes into [`Primitives`] (which deduplicates them and builds
//!   a small BVH for each one),
//! - [`traverse()`] walks the resulting [`Acceleration`] without recursion
//!   or an explicit stack.
//!
//! ```
//! use arbor::*;
//! use glam::vec3;
//!
//! let scene = Node::group([
//!     Node::geometry()
//!         .with_primitive(Primitive::sphere())
//!         .with_material(Material::default())
//!         .with_translation(vec3(1.0, 2.0, 3.0)),
//! ]);
//!
//! let acceleration = Acceleration::build(&scene);
//!
//! assert_eq!(1, acceleration.len());
//! assert_eq!(NodeType::PrimitiveSphere, acceleration.nodes()[0].ty);
//! ```

mod acceleration;
mod builder;
mod config;
mod material;
mod materials;
mod normalizer;
mod primitive;
mod primitives;
mod scene;
mod traversal;
mod utils;

pub use self::acceleration::*;
pub use self::builder::*;
pub use self::config::*;
pub use self::material::*;
pub use self::materials::*;
pub use self::normalizer::*;
pub use self::primitive::*;
pub use self::primitives::*;
pub use self::scene::*;
pub use self::traversal::*;
pub use self::utils::BoundingBox;
