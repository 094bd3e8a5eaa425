//! StreamingConfig - caller-supplied limits for loading, culling and
//! buffer construction.

use std::time::Duration;

use crate::error::ConfigError;

/// Node culling mode used by the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
	/// Nodes outside the camera frustum are pruned along with their subtree.
	#[default]
	CameraFrustum,
	/// Only projected size decides visibility; the frustum is ignored.
	Distance,
}

/// Configuration for one streamed tree and one renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamingConfig {
	/// Maximum number of points resident in memory for the tree.
	pub point_budget: u64,
	/// Maximum number of points rendered at once. Also the capacity of each
	/// render buffer.
	pub point_limit: usize,
	/// Number of steps a buffer rebuild is spread over.
	pub rebuild_steps: usize,
	/// Minimum projected size of a node, in pixels.
	pub min_projection: f32,
	/// Culling mode.
	pub cull_mode: CullMode,
	/// Minimum wall-clock time between steps of a time-budgeted builder.
	pub min_step_interval: Duration,
}

impl StreamingConfig {
	/// Default configuration.
	pub const DEFAULT: Self = Self {
		point_budget: 10_000_000,
		point_limit: 2_000_000,
		rebuild_steps: 10,
		min_projection: 100.0,
		cull_mode: CullMode::CameraFrustum,
		min_step_interval: Duration::from_millis(16),
	};

	/// Check every field for a usable value.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.point_budget == 0 {
			return Err(ConfigError::ZeroPointBudget);
		}
		if self.point_limit == 0 {
			return Err(ConfigError::ZeroPointLimit);
		}
		if self.rebuild_steps == 0 {
			return Err(ConfigError::ZeroRebuildSteps);
		}
		if !self.min_projection.is_finite() || self.min_projection < 0.0 {
			return Err(ConfigError::InvalidMinProjection(self.min_projection));
		}
		Ok(())
	}

	/// True when a buffer builder built for `other` cannot be reused.
	#[inline]
	pub fn builder_changed(&self, other: &StreamingConfig) -> bool {
		self.point_limit != other.point_limit || self.rebuild_steps != other.rebuild_steps
	}
}

impl Default for StreamingConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
