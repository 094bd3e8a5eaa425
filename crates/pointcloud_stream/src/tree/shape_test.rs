use glam::Vec3;

use super::*;

fn unit_bounds() -> Bounds {
	Bounds::new(Vec3::ZERO, Vec3::splat(2.0))
}

/// Deterministic sample points spread over a box (no rand dependency).
fn sample_points(bounds: &Bounds, per_axis: u32) -> Vec<Vec3> {
	let mut points = Vec::new();
	let min = bounds.min();
	let step = bounds.size / per_axis as f32;
	for x in 0..per_axis {
		for y in 0..per_axis {
			for z in 0..per_axis {
				// Offset by a fraction so samples never sit on the split plane.
				let p = min + step * (Vec3::new(x as f32, y as f32, z as f32) + Vec3::splat(0.37));
				points.push(p);
			}
		}
	}
	points
}

// =========================================================================
// Child index selection
// =========================================================================

#[test]
fn test_octree_child_index_corners() {
	let bounds = unit_bounds();
	assert_eq!(Octree::child_index_of(&bounds, Vec3::splat(0.5)), 7);
	assert_eq!(Octree::child_index_of(&bounds, Vec3::splat(-0.5)), 0);
	assert_eq!(Octree::child_index_of(&bounds, Vec3::new(0.5, -0.5, -0.5)), 1);
	assert_eq!(Octree::child_index_of(&bounds, Vec3::new(-0.5, 0.5, -0.5)), 2);
	assert_eq!(Octree::child_index_of(&bounds, Vec3::new(-0.5, -0.5, 0.5)), 4);
}

#[test]
fn test_quadtree_child_index_corners() {
	let bounds = unit_bounds();
	assert_eq!(Quadtree::child_index_of(&bounds, Vec3::new(0.5, -0.9, 0.5)), 3);
	assert_eq!(Quadtree::child_index_of(&bounds, Vec3::new(-0.5, 0.9, -0.5)), 0);
	assert_eq!(Quadtree::child_index_of(&bounds, Vec3::new(0.5, 0.0, -0.5)), 1);
	assert_eq!(Quadtree::child_index_of(&bounds, Vec3::new(-0.5, 0.0, 0.5)), 2);
}

/// A coordinate exactly on the center plane selects the positive half.
#[test]
fn test_child_index_center_is_positive() {
	let bounds = unit_bounds();
	assert_eq!(Octree::child_index_of(&bounds, Vec3::ZERO), 7);
	assert_eq!(Quadtree::child_index_of(&bounds, Vec3::ZERO), 3);
}

/// The selected child's bounds must contain the sampled point.
#[test]
fn test_octree_child_index_round_trip() {
	let bounds = Bounds::new(Vec3::new(3.0, -7.0, 11.0), Vec3::new(4.0, 8.0, 2.0));
	for point in sample_points(&bounds, 6) {
		let index = Octree::child_index_of(&bounds, point);
		let child = Octree::child_bounds(&bounds, index).unwrap();
		assert!(
			child.contains_point(point),
			"point {point:?} not inside child {index} ({child:?})"
		);
	}
}

#[test]
fn test_quadtree_child_index_round_trip() {
	let bounds = Bounds::new(Vec3::new(-20.0, 5.0, 40.0), Vec3::new(16.0, 10.0, 16.0));
	for point in sample_points(&bounds, 6) {
		let index = Quadtree::child_index_of(&bounds, point);
		let child = Quadtree::child_bounds(&bounds, index).unwrap();
		assert!(
			child.contains_point(point),
			"point {point:?} not inside child {index} ({child:?})"
		);
	}
}

// =========================================================================
// Offset vectors and child bounds
// =========================================================================

#[test]
fn test_octree_offset_vectors() {
	assert_eq!(octree_offset_vector(0).unwrap(), Vec3::splat(-1.0));
	assert_eq!(octree_offset_vector(7).unwrap(), Vec3::ONE);
	assert_eq!(octree_offset_vector(5).unwrap(), Vec3::new(1.0, -1.0, 1.0));
}

#[test]
fn test_quadtree_offset_vectors_are_flat() {
	for child in 0..4u8 {
		let offset = quadtree_offset_vector(child).unwrap();
		assert_eq!(offset.y, 0.0);
		assert_eq!(offset.x.abs(), 1.0);
		assert_eq!(offset.z.abs(), 1.0);
	}
	assert_eq!(quadtree_offset_vector(2).unwrap(), Vec3::new(-1.0, 0.0, 1.0));
}

#[test]
fn test_offset_vector_out_of_range() {
	assert_eq!(
		octree_offset_vector(8),
		Err(ChildIndexError { index: 8, max: 8 })
	);
	assert_eq!(
		quadtree_offset_vector(4),
		Err(ChildIndexError { index: 4, max: 4 })
	);
}

#[test]
fn test_octree_child_bounds_halves_all_axes() {
	let child = Octree::child_bounds(&unit_bounds(), 7).unwrap();
	assert_eq!(child.center, Vec3::splat(0.5));
	assert_eq!(child.size, Vec3::ONE);
}

#[test]
fn test_quadtree_child_bounds_keeps_height() {
	let parent = Bounds::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(8.0, 10.0, 8.0));
	let child = Quadtree::child_bounds(&parent, 0).unwrap();
	assert_eq!(child.center, Vec3::new(-2.0, 5.0, -2.0));
	assert_eq!(child.size, Vec3::new(4.0, 10.0, 4.0));
}

// =========================================================================
// Radius and distance
// =========================================================================

#[test]
fn test_bounding_radius() {
	let bounds = Bounds::new(Vec3::ZERO, Vec3::new(6.0, 100.0, 8.0));
	// Octree: full 3D half-diagonal
	let expected = Vec3::new(3.0, 50.0, 4.0).length();
	assert!((Octree::bounding_radius(&bounds) - expected).abs() < 1e-4);
	// Quadtree: XZ only
	assert!((Quadtree::bounding_radius(&bounds) - 5.0).abs() < 1e-6);
}

/// Quadtree distance ignores the camera height, octree distance does not.
#[test]
fn test_quadtree_distance_ignores_height() {
	let bounds = Bounds::new(Vec3::new(0.0, 5.0, 0.0), Vec3::splat(2.0));
	let camera = Vec3::new(0.0, 100.0, 3.0);

	let flat = Quadtree::distance_to(&bounds, camera);
	assert!((flat - 3.0).abs() < 1e-6, "quadtree distance was {flat}");

	let full = Octree::distance_to(&bounds, camera);
	let expected = (95.0f32 * 95.0 + 9.0).sqrt();
	assert!((full - expected).abs() < 1e-3, "octree distance was {full}");
}
