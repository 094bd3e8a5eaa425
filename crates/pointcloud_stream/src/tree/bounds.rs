//! Axis-aligned bounding box stored as center and size.

use glam::Vec3;

/// Axis-aligned bounding box.
///
/// Stored the way the index file stores it: center and full size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
	/// Center of the box.
	pub center: Vec3,
	/// Full edge lengths of the box.
	pub size: Vec3,
}

impl Bounds {
	/// Create a box from center and size.
	///
	/// # Panics
	/// Debug-asserts that size is non-negative on all axes.
	pub fn new(center: Vec3, size: Vec3) -> Self {
		debug_assert!(
			size.x >= 0.0 && size.y >= 0.0 && size.z >= 0.0,
			"Bounds size must be >= 0 on all axes"
		);
		Self { center, size }
	}

	/// Create a box from its min and max corners.
	pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
		Self::new((min + max) * 0.5, max - min)
	}

	/// Half of the size.
	#[inline]
	pub fn extents(&self) -> Vec3 {
		self.size * 0.5
	}

	/// Minimum corner (inclusive).
	#[inline]
	pub fn min(&self) -> Vec3 {
		self.center - self.extents()
	}

	/// Maximum corner (inclusive).
	#[inline]
	pub fn max(&self) -> Vec3 {
		self.center + self.extents()
	}

	/// Check if the box contains a point (boundary included).
	#[inline]
	pub fn contains_point(&self, point: Vec3) -> bool {
		let min = self.min();
		let max = self.max();
		point.cmpge(min).all() && point.cmple(max).all()
	}

	/// Check if this box overlaps another (touching counts).
	#[inline]
	pub fn overlaps(&self, other: &Bounds) -> bool {
		self.min().cmple(other.max()).all() && self.max().cmpge(other.min()).all()
	}

	/// Smallest box containing both boxes.
	pub fn union(&self, other: &Bounds) -> Bounds {
		Bounds::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
	}
}
