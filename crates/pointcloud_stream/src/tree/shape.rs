//! TreeShape - what differs between octrees and quadtrees.
//!
//! Both shapes share identifiers, records and loading. They differ only in:
//! - maximum number of children (8 vs 4)
//! - which axes are split when choosing a child slot
//! - the bounding sphere radius used for projected size
//! - the distance used for perspective LOD (quadtrees ignore height)
//!
//! # Child slots
//!
//! Octree: bit 0 = +X, bit 1 = +Y, bit 2 = +Z.
//! Quadtree: bit 0 = +X, bit 1 = +Z.
//!
//! A coordinate equal to the parent center selects the positive half. The
//! mapping is part of the on-disk identifier encoding.

use glam::{Vec2, Vec3};

use super::index::TreeType;
use crate::constants::{OCTREE_MAX_CHILDREN, QUADTREE_MAX_CHILDREN};
use crate::error::ChildIndexError;
use crate::tree::Bounds;

/// Shape-specific tree math, resolved at compile time.
pub trait TreeShape: Send + Sync + 'static {
	/// Discriminant stored in the index file.
	const TREE_TYPE: TreeType;

	/// Number of child slots per node.
	const MAX_CHILDREN: usize;

	/// Child slot whose bounds contain `point`.
	fn child_index_of(bounds: &Bounds, point: Vec3) -> u8;

	/// Unscaled direction from a parent center to the center of a child.
	///
	/// Components are `±1` on split axes and `0` elsewhere. Multiply by a
	/// quarter of the parent size to get the actual offset.
	fn offset_vector(child: u8) -> Result<Vec3, ChildIndexError>;

	/// Radius used for projected size estimation.
	fn bounding_radius(bounds: &Bounds) -> f32;

	/// Distance from the node to the camera used for perspective LOD.
	fn distance_to(bounds: &Bounds, camera: Vec3) -> f32;

	/// Bounds of a child slot.
	fn child_bounds(bounds: &Bounds, child: u8) -> Result<Bounds, ChildIndexError> {
		let offset = Self::offset_vector(child)?;
		// Split axes halve, unsplit axes (offset 0) keep their size.
		let scale = Vec3::select(offset.cmpeq(Vec3::ZERO), Vec3::ONE, Vec3::splat(0.5));
		Ok(Bounds::new(
			bounds.center + offset * bounds.size * 0.25,
			bounds.size * scale,
		))
	}
}

/// Eight-way subdivision of 3D space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Octree;

/// Four-way subdivision of the ground (XZ) plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quadtree;

impl TreeShape for Octree {
	const TREE_TYPE: TreeType = TreeType::Octree;
	const MAX_CHILDREN: usize = OCTREE_MAX_CHILDREN;

	#[inline]
	fn child_index_of(bounds: &Bounds, point: Vec3) -> u8 {
		let center = bounds.center;
		let mut result = 0u8;
		if point.x >= center.x {
			result |= 1;
		}
		if point.y >= center.y {
			result |= 1 << 1;
		}
		if point.z >= center.z {
			result |= 1 << 2;
		}
		result
	}

	fn offset_vector(child: u8) -> Result<Vec3, ChildIndexError> {
		if usize::from(child) >= Self::MAX_CHILDREN {
			return Err(ChildIndexError {
				index: child,
				max: Self::MAX_CHILDREN,
			});
		}
		Ok(Vec3::new(
			sign_of_bit(child, 0),
			sign_of_bit(child, 1),
			sign_of_bit(child, 2),
		))
	}

	#[inline]
	fn bounding_radius(bounds: &Bounds) -> f32 {
		bounds.extents().length()
	}

	#[inline]
	fn distance_to(bounds: &Bounds, camera: Vec3) -> f32 {
		bounds.center.distance(camera)
	}
}

impl TreeShape for Quadtree {
	const TREE_TYPE: TreeType = TreeType::Quadtree;
	const MAX_CHILDREN: usize = QUADTREE_MAX_CHILDREN;

	#[inline]
	fn child_index_of(bounds: &Bounds, point: Vec3) -> u8 {
		let center = bounds.center;
		let mut result = 0u8;
		if point.x >= center.x {
			result |= 1;
		}
		if point.z >= center.z {
			result |= 1 << 1;
		}
		result
	}

	fn offset_vector(child: u8) -> Result<Vec3, ChildIndexError> {
		if usize::from(child) >= Self::MAX_CHILDREN {
			return Err(ChildIndexError {
				index: child,
				max: Self::MAX_CHILDREN,
			});
		}
		Ok(Vec3::new(sign_of_bit(child, 0), 0.0, sign_of_bit(child, 1)))
	}

	/// Height is ignored: flat map data is ranked by ground footprint.
	#[inline]
	fn bounding_radius(bounds: &Bounds) -> f32 {
		let extents = bounds.extents();
		Vec2::new(extents.x, extents.z).length()
	}

	/// Distance on the XZ plane; the camera height does not matter.
	#[inline]
	fn distance_to(bounds: &Bounds, camera: Vec3) -> f32 {
		Vec2::new(bounds.center.x, bounds.center.z).distance(Vec2::new(camera.x, camera.z))
	}
}

/// Unit direction from an octree node center to the center of `child`.
#[inline]
pub fn octree_offset_vector(child: u8) -> Result<Vec3, ChildIndexError> {
	Octree::offset_vector(child)
}

/// Unit direction from a quadtree node center to the center of `child` (Y = 0).
#[inline]
pub fn quadtree_offset_vector(child: u8) -> Result<Vec3, ChildIndexError> {
	Quadtree::offset_vector(child)
}

#[inline]
fn sign_of_bit(value: u8, bit: u8) -> f32 {
	if value & (1 << bit) != 0 {
		1.0
	} else {
		-1.0
	}
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;
