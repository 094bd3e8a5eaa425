//! Render buffer abstraction.

use crate::point::PointCloudPoint;

/// A fixed-capacity buffer of point records owned by the builder.
///
/// Implemented by GPU buffer wrappers in renderers; [`HostPointBuffer`] is
/// the in-memory implementation used headless and in tests.
pub trait PointBuffer {
	/// Number of point records the buffer holds.
	fn capacity(&self) -> usize;

	/// Copy `points` into the buffer starting at record `offset`.
	///
	/// Callers guarantee `offset + points.len() <= capacity()`.
	fn set_data(&mut self, offset: usize, points: &[PointCloudPoint]);

	/// Release the underlying storage. Called once; the buffer is not used
	/// afterwards.
	fn release(&mut self);
}

/// Point buffer backed by host memory.
#[derive(Clone, Debug, Default)]
pub struct HostPointBuffer {
	data: Vec<PointCloudPoint>,
	released: bool,
}

impl HostPointBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			data: vec![PointCloudPoint::default(); capacity],
			released: false,
		}
	}

	/// Whole buffer; only the first `valid` records of a published buffer
	/// are meaningful.
	#[inline]
	pub fn as_slice(&self) -> &[PointCloudPoint] {
		&self.data
	}

	#[inline]
	pub fn is_released(&self) -> bool {
		self.released
	}
}

impl PointBuffer for HostPointBuffer {
	#[inline]
	fn capacity(&self) -> usize {
		self.data.len()
	}

	#[inline]
	fn set_data(&mut self, offset: usize, points: &[PointCloudPoint]) {
		self.data[offset..offset + points.len()].copy_from_slice(points);
	}

	fn release(&mut self) {
		self.data = Vec::new();
		self.released = true;
	}
}
