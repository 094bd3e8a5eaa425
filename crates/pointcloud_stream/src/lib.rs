//! pointcloud_stream - out-of-core point cloud streaming
//!
//! Renders point clouds that do not fit in memory by keeping only a small
//! spatial index resident and streaming raw point blocks from disk on demand.
//!
//! # Components
//!
//! - **Spatial index** ([`tree`]): octree or quadtree of bounding volumes,
//!   loaded once from `index.pcindex`. No point data. Trees are read from a
//!   directory or from a stored ZIP archive.
//! - **Node loader** ([`loader`]): one background thread per tree that reads
//!   `<identifier>.pcnode` files under a global resident point budget.
//! - **Buffer builder** ([`builder`]): double-buffered render buffer, rebuilt
//!   over several steps so no single frame pays the full copy cost.
//! - **Controller** ([`controller`]): per-frame frustum culling and
//!   projected-size LOD selection that drives the loader and the builder.
//!
//! ```text
//! ┌────────────┐  used ids   ┌────────────┐  ready nodes  ┌───────────────┐  buffer  ┌──────────┐
//! │ Controller ├────────────►│ NodeLoader ├──────────────►│ BufferBuilder ├─────────►│ Renderer │
//! └─────┬──────┘             └────────────┘               └───────────────┘          └──────────┘
//!       │ frustum + LOD
//!       ▼
//!  ┌──────────┐
//!  │ NodeTree │
//!  └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pointcloud_stream::{Camera, NodeTreeController, PointCloudTree, StreamingConfig};
//!
//! let config = StreamingConfig::default();
//! let tree = PointCloudTree::try_load_from_disk("data/lidar", config.point_budget)?;
//! let mut controller = NodeTreeController::new(std::sync::Arc::new(tree), config)?;
//!
//! // Every frame:
//! controller.update(&camera, &mut renderer);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod point;

// Spatial index (records, bounds, tree shapes, index file)
pub mod tree;
pub use tree::{
	Bounds, NodeRecord, Octree, PointCloudTree, Quadtree, RecordTable, TreeArchive, TreeShape, TreeSource, TreeType,
};

// Background node loading
pub mod loader;
pub use loader::{Node, NodeDataState, NodeLoader};

// Double-buffered render buffer construction
pub mod builder;
pub use builder::{BufferBuilder, HostPointBuffer, PointBuffer, TimedBufferBuilder};

// Visibility and LOD selection
pub mod controller;
pub use controller::{Camera, FrameStats, NodeTreeController, PointCloudRenderer, Projection};

// Synthetic dataset generation
pub mod synth;

pub mod metrics;

pub use config::{CullMode, StreamingConfig};
pub use error::{ChildIndexError, ConfigError, NodeLoadError, TreeLoadError};
pub use point::PointCloudPoint;

#[cfg(test)]
pub(crate) mod test_utils;
