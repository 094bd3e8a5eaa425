//! Renderer seam.

use crate::builder::PointBuffer;
use crate::tree::Bounds;

/// Receives the published buffer each frame.
///
/// The buffer reference is only valid for the duration of the call; renderers
/// that keep it across frames must copy or bind it there.
pub trait PointCloudRenderer<B: PointBuffer> {
	/// Draw the first `valid_points` records of `buffer`. `bounds` are the
	/// tree's root bounds in renderer space.
	fn set_buffer(&mut self, bounds: Bounds, buffer: &B, valid_points: usize);

	/// Nothing is selected; drop any buffer reference from earlier frames.
	fn clear_buffer(&mut self);
}
