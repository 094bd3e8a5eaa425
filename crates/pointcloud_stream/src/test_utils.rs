//! Shared helpers for tests: temporary tree directories and polling.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::loader::io::write_node_file;
use crate::point::PointCloudPoint;
use crate::tree::{IndexData, NodeMetaData, TreeType};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Unique directory under the system temp dir, removed on drop.
pub struct TempDir {
	path: PathBuf,
}

impl TempDir {
	pub fn new(label: &str) -> Self {
		let path = std::env::temp_dir().join(format!(
			"pointcloud_stream_{label}_{}_{}",
			std::process::id(),
			NEXT_DIR.fetch_add(1, Ordering::Relaxed)
		));
		let _ = std::fs::remove_dir_all(&path);
		std::fs::create_dir_all(&path).unwrap();
		Self { path }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Drop for TempDir {
	fn drop(&mut self) {
		let _ = std::fs::remove_dir_all(&self.path);
	}
}

/// Node description for [`write_tree`].
#[derive(Clone, Debug)]
pub struct TestNode {
	pub identifier: &'static str,
	pub point_count: u32,
	pub center: Vec3,
	pub size: Vec3,
}

impl TestNode {
	pub fn new(identifier: &'static str, point_count: u32, center: Vec3, size: Vec3) -> Self {
		Self {
			identifier,
			point_count,
			center,
			size,
		}
	}
}

/// Points of a test node. Colors carry the point's index so copies can be
/// traced back to their source.
pub fn test_points(node: &TestNode) -> Vec<PointCloudPoint> {
	(0..node.point_count)
		.map(|i| PointCloudPoint::new(node.center, i))
		.collect()
}

/// Write an index and one node file per entry.
pub fn write_tree(dir: &Path, tree_type: TreeType, nodes: &[TestNode]) {
	let index = IndexData::new(
		tree_type,
		nodes
			.iter()
			.map(|n| NodeMetaData::new(n.identifier, n.point_count as i32, n.center, n.size))
			.collect(),
	);
	index.write_to_dir(dir).unwrap();
	for node in nodes {
		write_node_file(dir, node.identifier, &test_points(node)).unwrap();
	}
}

/// Full octree of the given depth around the origin.
///
/// Root bounds are 64 units wide; each node stores `points_per_node` points.
pub fn octree_nodes(depth: usize, points_per_node: u32) -> Vec<TestNode> {
	let mut out = Vec::new();
	let mut level: Vec<(String, Vec3, Vec3)> = vec![("r".to_owned(), Vec3::ZERO, Vec3::splat(64.0))];
	for _ in 0..=depth {
		let mut next = Vec::new();
		for (id, center, size) in &level {
			for child in 0..8u8 {
				let offset = crate::tree::shape::octree_offset_vector(child).unwrap();
				next.push((format!("{id}{child}"), *center + offset * *size * 0.25, *size * 0.5));
			}
			out.push(TestNode::new(leak(id), points_per_node, *center, *size));
		}
		level = next;
	}
	out
}

fn leak(s: &str) -> &'static str {
	Box::leak(s.to_owned().into_boxed_str())
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	loop {
		if condition() {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		std::thread::sleep(Duration::from_millis(2));
	}
}

/// Generous timeout for waiting on the background loader.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(5);
