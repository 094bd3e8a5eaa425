//! Camera description used for culling and LOD.

use glam::{Mat4, Vec3};

/// Projection of the culling camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
	/// Vertical field of view in radians.
	Perspective { fov_y: f32, near: f32, far: f32 },
	/// `half_height` is half the vertical extent of the view volume.
	Orthographic { half_height: f32, near: f32, far: f32 },
}

/// Everything the controller needs to know about the viewer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
	/// Eye position in world space.
	pub position: Vec3,
	/// World-to-view transform (right-handed, looking down -Z).
	pub view: Mat4,
	pub projection: Projection,
	/// Viewport size in pixels.
	pub viewport_width: f32,
	pub viewport_height: f32,
}

impl Camera {
	/// Camera at `eye` looking at `target`.
	pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, projection: Projection, viewport: (f32, f32)) -> Self {
		Self {
			position: eye,
			view: Mat4::look_at_rh(eye, target, up),
			projection,
			viewport_width: viewport.0,
			viewport_height: viewport.1,
		}
	}

	#[inline]
	pub fn aspect_ratio(&self) -> f32 {
		if self.viewport_height > 0.0 {
			self.viewport_width / self.viewport_height
		} else {
			1.0
		}
	}

	#[inline]
	pub fn is_orthographic(&self) -> bool {
		matches!(self.projection, Projection::Orthographic { .. })
	}

	/// Projection matrix with a 0..1 depth range.
	pub fn projection_matrix(&self) -> Mat4 {
		let aspect = self.aspect_ratio();
		match self.projection {
			Projection::Perspective { fov_y, near, far } => Mat4::perspective_rh(fov_y, aspect, near, far),
			Projection::Orthographic { half_height, near, far } => {
				let half_width = half_height * aspect;
				Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
			}
		}
	}

	#[inline]
	pub fn view_projection(&self) -> Mat4 {
		self.projection_matrix() * self.view
	}

	/// Pixels per world unit at unit distance (perspective) or everywhere
	/// (orthographic).
	///
	/// Projected size is `view_multiplier × radius` for orthographic cameras
	/// and `view_multiplier × radius / distance` for perspective ones.
	pub fn view_multiplier(&self) -> f32 {
		let half_viewport = 0.5 * self.viewport_height;
		match self.projection {
			Projection::Perspective { fov_y, .. } => half_viewport / (0.5 * fov_y).tan(),
			Projection::Orthographic { half_height, .. } => half_viewport / half_height,
		}
	}
}
