//! PointCloudPoint - the record stored on disk, in memory and in render buffers.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// A single point.
///
/// The layout is the on-disk layout of `.pcnode` files: 12 bytes of
/// little-endian position followed by packed RGBA color, where alpha carries
/// the LIDAR intensity. No padding, so node files are plain arrays of this
/// struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointCloudPoint {
	/// Position in tree space.
	pub position: [f32; 3],
	/// Packed color: R in the lowest byte, intensity in the highest.
	pub color: u32,
}

const _: () = assert!(std::mem::size_of::<PointCloudPoint>() == 16);

impl PointCloudPoint {
	/// Size of one record in bytes (on disk and in memory).
	pub const SIZE: usize = std::mem::size_of::<Self>();

	/// Create a point from a position and packed color.
	pub fn new(position: Vec3, color: u32) -> Self {
		Self {
			position: position.to_array(),
			color,
		}
	}

	/// Pack RGB color and intensity into the color field.
	#[inline]
	pub fn pack_color(r: u8, g: u8, b: u8, intensity: u8) -> u32 {
		u32::from_le_bytes([r, g, b, intensity])
	}

	/// Position as a vector.
	#[inline]
	pub fn position(&self) -> Vec3 {
		Vec3::from_array(self.position)
	}

	/// Color channels as `[r, g, b]`.
	#[inline]
	pub fn rgb(&self) -> [u8; 3] {
		let [r, g, b, _] = self.color.to_le_bytes();
		[r, g, b]
	}

	/// LIDAR intensity.
	#[inline]
	pub fn intensity(&self) -> u8 {
		self.color.to_le_bytes()[3]
	}
}

/// Convert records read straight from disk (little-endian) to native order.
///
/// No-op on little-endian targets.
#[inline]
pub fn from_le_in_place(points: &mut [PointCloudPoint]) {
	if cfg!(target_endian = "big") {
		for point in points {
			for coord in &mut point.position {
				*coord = f32::from_bits(u32::from_le(coord.to_bits()));
			}
			point.color = u32::from_le(point.color);
		}
	}
}

/// Convert native records to the little-endian disk layout.
///
/// No-op on little-endian targets.
#[inline]
pub fn to_le_in_place(points: &mut [PointCloudPoint]) {
	if cfg!(target_endian = "big") {
		for point in points {
			for coord in &mut point.position {
				*coord = f32::from_bits(coord.to_bits().to_le());
			}
			point.color = point.color.to_le();
		}
	}
}
