//! Spatial index: an immutable hierarchy of bounding volumes.
//!
//! The index is loaded eagerly from a single small file and never holds
//! point data. Point blocks are streamed per node by the
//! [`NodeLoader`](crate::loader::NodeLoader) owned by the tree.
//!
//! # Identifiers
//!
//! Nodes are identified by their path from the root: the root is `"r"`, and
//! each level appends the child slot digit (`0..8` for octrees, `0..4` for
//! quadtrees). `"r52"` is child 2 of child 5 of the root.
//!
//! # Module Structure
//!
//! - [`bounds`]: `Bounds` - center/size axis-aligned box
//! - [`shape`]: `TreeShape` - octree/quadtree capability (child slots,
//!   bounding radius, camera distance)
//! - [`record`]: `NodeRecord`, `RecordTable` - per-node metadata and links
//! - [`index`]: `IndexData` - the binary index file
//! - [`source`]: `TreeSource` - tree directory or stored ZIP archive
//! - [`node_tree`]: `NodeTree<S>`, `PointCloudTree` - the loaded tree

pub mod bounds;
pub mod index;
pub mod node_tree;
pub mod record;
pub mod shape;
pub mod source;

// Re-exports
pub use bounds::Bounds;
pub use index::{IndexData, NodeMetaData, TreeType};
pub use node_tree::{NodeTree, PointCloudTree};
pub use record::{NodeRecord, RecordTable};
pub use shape::{Octree, Quadtree, TreeShape};
pub use source::{write_archive, FileRange, TreeArchive, TreeSource};
