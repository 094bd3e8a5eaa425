//! Deterministic synthetic trees for demos, benchmarks and tests.
//!
//! Every node of a full tree of the requested depth gets the same number of
//! points, scattered uniformly inside its bounds. Point positions and colors
//! depend only on the seed and the node identifier.

use std::path::Path;

use glam::Vec3;
use rayon::prelude::*;

use crate::loader::io::write_node_file;
use crate::point::PointCloudPoint;
use crate::tree::{Bounds, IndexData, NodeMetaData, Octree, Quadtree, TreeShape, TreeType};

/// Parameters of a generated tree.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticTree {
	pub tree_type: TreeType,
	/// Number of levels below the root.
	pub depth: usize,
	pub points_per_node: u32,
	pub bounds: Bounds,
	pub seed: u64,
}

impl SyntheticTree {
	/// A tree of `depth` levels over a 256-unit cube (octree) or a
	/// 256 × 32 × 256 slab (quadtree), centered on the origin.
	pub fn new(tree_type: TreeType, depth: usize, points_per_node: u32) -> Self {
		let size = match tree_type {
			TreeType::Octree => Vec3::splat(256.0),
			TreeType::Quadtree => Vec3::new(256.0, 32.0, 256.0),
		};
		Self {
			tree_type,
			depth,
			points_per_node,
			bounds: Bounds::new(Vec3::ZERO, size),
			seed: 0x5EED,
		}
	}

	/// Index entries of every node, level by level.
	pub fn nodes(&self) -> Vec<NodeMetaData> {
		match self.tree_type {
			TreeType::Octree => self.nodes_for::<Octree>(),
			TreeType::Quadtree => self.nodes_for::<Quadtree>(),
		}
	}

	fn nodes_for<S: TreeShape>(&self) -> Vec<NodeMetaData> {
		let count = i32::try_from(self.points_per_node).unwrap_or(i32::MAX);
		let mut out = Vec::new();
		let mut level = vec![(crate::constants::ROOT_NODE_IDENTIFIER.to_owned(), self.bounds)];

		for depth in 0..=self.depth {
			let mut next = Vec::new();
			for (identifier, bounds) in level {
				if depth < self.depth {
					for child in 0..S::MAX_CHILDREN as u8 {
						if let Ok(child_bounds) = S::child_bounds(&bounds, child) {
							next.push((format!("{identifier}{child}"), child_bounds));
						}
					}
				}
				out.push(NodeMetaData::new(identifier, count, bounds.center, bounds.size));
			}
			level = next;
		}
		out
	}

	/// Points of one node.
	pub fn points_for(&self, node: &NodeMetaData) -> Vec<PointCloudPoint> {
		let bounds = Bounds::new(node.center, node.size);
		let min = bounds.min();
		let mut state = self.seed ^ fnv1a(node.identifier.as_bytes());

		(0..node.point_count.max(0))
			.map(|_| {
				let unit = Vec3::new(unit_f32(&mut state), unit_f32(&mut state), unit_f32(&mut state));
				let [r, g, b, intensity, ..] = splitmix64(&mut state).to_le_bytes();
				PointCloudPoint::new(min + bounds.size * unit, PointCloudPoint::pack_color(r, g, b, intensity))
			})
			.collect()
	}

	/// Write the index and every node file into `dir`.
	///
	/// Node files are generated and written in parallel. Returns the index.
	pub fn write_to_dir(&self, dir: &Path) -> binrw::BinResult<IndexData> {
		let index = IndexData::new(self.tree_type, self.nodes());
		index.write_to_dir(dir)?;
		index
			.nodes
			.par_iter()
			.try_for_each(|node| write_node_file(dir, &node.identifier, &self.points_for(node)))?;

		tracing::info!(
			dir = %dir.display(),
			tree_type = %self.tree_type,
			nodes = index.nodes.len(),
			points_per_node = self.points_per_node,
			"wrote synthetic tree"
		);
		Ok(index)
	}
}

fn fnv1a(bytes: &[u8]) -> u64 {
	bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
		(hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
	})
}

fn splitmix64(state: &mut u64) -> u64 {
	*state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
	let mut z = *state;
	z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
	z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
	z ^ (z >> 31)
}

/// Uniform in `[0, 1)`.
fn unit_f32(state: &mut u64) -> f32 {
	(splitmix64(state) >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::TempDir;
	use crate::tree::PointCloudTree;

	#[test]
	fn test_full_tree_node_count() {
		assert_eq!(SyntheticTree::new(TreeType::Octree, 2, 1).nodes().len(), 1 + 8 + 64);
		assert_eq!(SyntheticTree::new(TreeType::Quadtree, 3, 1).nodes().len(), 1 + 4 + 16 + 64);
		assert_eq!(SyntheticTree::new(TreeType::Octree, 0, 1).nodes().len(), 1);
	}

	#[test]
	fn test_points_inside_node_bounds() {
		let synth = SyntheticTree::new(TreeType::Quadtree, 2, 64);
		for node in synth.nodes() {
			let bounds = Bounds::new(node.center, node.size);
			let points = synth.points_for(&node);
			assert_eq!(points.len(), 64);
			assert!(points.iter().all(|p| bounds.contains_point(p.position())));
		}
	}

	#[test]
	fn test_points_deterministic() {
		let synth = SyntheticTree::new(TreeType::Octree, 1, 16);
		let node = &synth.nodes()[3];
		assert_eq!(synth.points_for(node), synth.points_for(node));

		let other = &synth.nodes()[4];
		assert_ne!(synth.points_for(node), synth.points_for(other));
	}

	#[test]
	fn test_written_tree_loads() {
		let dir = TempDir::new("synth");
		let synth = SyntheticTree::new(TreeType::Octree, 1, 32);
		synth.write_to_dir(dir.path()).unwrap();

		let tree = PointCloudTree::try_load_from_disk(dir.path(), 1_000).unwrap();
		assert_eq!(tree.records().len(), 9);
		assert_eq!(tree.records().total_points(), 9 * 32);

		tree.loader().load_immediate(&["r", "r5"]);
		assert_eq!(tree.loader().resident_points(), 64);
	}
}
