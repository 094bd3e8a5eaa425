//! View frustum for visibility culling.

use glam::{Mat4, Vec4};

use crate::tree::Bounds;

/// Six normalized planes `(n, d)` with `n·p + d >= 0` inside.
///
/// Order: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
	pub planes: [Vec4; 6],
}

impl Frustum {
	/// Extract the planes of a view-projection matrix with 0..1 clip depth.
	pub fn from_view_proj_matrix(vp_matrix: &Mat4) -> Self {
		let m = vp_matrix.transpose();

		Self {
			planes: [
				normalize_plane(m.w_axis + m.x_axis),
				normalize_plane(m.w_axis - m.x_axis),
				normalize_plane(m.w_axis + m.y_axis),
				normalize_plane(m.w_axis - m.y_axis),
				normalize_plane(m.z_axis),
				normalize_plane(m.w_axis - m.z_axis),
			],
		}
	}

	/// Whether the box is at least partially inside.
	///
	/// Conservative: boxes near frustum corners may pass although outside.
	pub fn intersects(&self, bounds: &Bounds) -> bool {
		let center = bounds.center;
		let extents = bounds.extents();
		self.planes.iter().all(|plane| {
			let normal = plane.truncate();
			let distance = normal.dot(center) + plane.w;
			let radius = extents.dot(normal.abs());
			distance + radius >= 0.0
		})
	}
}

fn normalize_plane(plane: Vec4) -> Vec4 {
	let length = plane.truncate().length();
	if length > f32::EPSILON {
		plane / length
	} else {
		plane
	}
}
