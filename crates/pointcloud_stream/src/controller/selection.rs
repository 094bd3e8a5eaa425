//! Visibility and LOD selection.
//!
//! 1. Walk the tree from the root, pruning nodes outside the frustum.
//! 2. Prune nodes whose projected size is below the threshold. Children are
//!    never larger than their parent, so the whole branch goes.
//! 3. Sort the survivors by projected size, largest first.
//! 4. Accept nodes in order until the next one would exceed the point limit.

use glam::{Affine3A, Mat4, Vec3};

use super::camera::Camera;
use super::frustum::Frustum;
use crate::config::CullMode;
use crate::tree::{NodeRecord, RecordTable, TreeShape};

/// A node that passed culling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleNode {
	/// Index into the tree's record table.
	pub record: usize,
	/// Projected size in pixels.
	pub weight: f32,
	pub point_count: u32,
}

/// Per-frame culling parameters, all in renderer (tree) space.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
	pub frustum: Frustum,
	pub view_multiplier: f32,
	pub orthographic: bool,
	pub camera_position: Vec3,
	pub cull_mode: CullMode,
	pub min_projection: f32,
}

impl ViewState {
	/// `renderer_transform` maps tree space to world space.
	pub fn new(camera: &Camera, renderer_transform: &Affine3A, cull_mode: CullMode, min_projection: f32) -> Self {
		let model = Mat4::from(*renderer_transform);
		Self {
			frustum: Frustum::from_view_proj_matrix(&(camera.view_projection() * model)),
			view_multiplier: camera.view_multiplier(),
			orthographic: camera.is_orthographic(),
			camera_position: renderer_transform.inverse().transform_point3(camera.position),
			cull_mode,
			min_projection,
		}
	}
}

/// Projected size of a record in pixels.
#[inline]
pub fn projected_size<S: TreeShape>(record: &NodeRecord, view: &ViewState) -> f32 {
	let radius = record.bounding_sphere_radius();
	if view.orthographic {
		view.view_multiplier * radius
	} else {
		let distance = S::distance_to(record.bounds(), view.camera_position).max(f32::EPSILON);
		view.view_multiplier * radius / distance
	}
}

/// Append every visible node to `out`, depth first.
pub fn collect_visible<S: TreeShape>(records: &RecordTable, view: &ViewState, out: &mut Vec<VisibleNode>) {
	if records.is_empty() {
		return;
	}
	visit::<S>(records, records.root_index(), view, out);
}

fn visit<S: TreeShape>(records: &RecordTable, index: usize, view: &ViewState, out: &mut Vec<VisibleNode>) {
	let Some(record) = records.get(index) else {
		return;
	};

	if view.cull_mode == CullMode::CameraFrustum && !view.frustum.intersects(record.bounds()) {
		return;
	}

	let weight = projected_size::<S>(record, view);
	if weight < view.min_projection {
		return;
	}

	out.push(VisibleNode {
		record: index,
		weight,
		point_count: record.point_count(),
	});

	for &child in record.child_slots().iter().flatten() {
		visit::<S>(records, child, view, out);
	}
}

/// Sort by descending projected size. Stable for equal weights.
pub fn sort_by_weight(nodes: &mut [VisibleNode]) {
	nodes.sort_by(|a, b| b.weight.total_cmp(&a.weight));
}

/// Greedy prefix of `sorted` whose point total stays within `limit`.
///
/// Stops at the first node that does not fit; nothing after it is taken,
/// even if smaller. Returns the number of accepted nodes and their points.
pub fn select_within_limit(sorted: &[VisibleNode], limit: usize) -> (usize, usize) {
	let mut points = 0usize;
	for (taken, node) in sorted.iter().enumerate() {
		let count = node.point_count as usize;
		if points + count > limit {
			return (taken, points);
		}
		points += count;
	}
	(sorted.len(), points)
}
