//! Node file I/O (`<identifier>.pcnode`).
//!
//! A node file is a raw little-endian array of [`PointCloudPoint`] records.
//! Its length must be exactly `point_count × 16` bytes, whether it is a file
//! in a tree directory or an entry of a stored archive.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::constants::node_file_name;
use crate::error::NodeLoadError;
use crate::point::{from_le_in_place, to_le_in_place, PointCloudPoint};
use crate::tree::TreeSource;

/// Path of the node file for `identifier` inside a tree directory.
#[inline]
pub fn node_path(dir: &Path, identifier: &str) -> PathBuf {
	dir.join(node_file_name(identifier))
}

/// Read a node's points straight into a preallocated block.
///
/// `block.len()` is the declared point count. The stored data is rejected
/// without touching `block` unless its byte length matches exactly. Works the
/// same for directory files and stored archive entries.
pub fn read_node_points(
	source: &TreeSource,
	identifier: &str,
	block: &mut [PointCloudPoint],
) -> Result<(), NodeLoadError> {
	let name = node_file_name(identifier);
	let io_err = |e: std::io::Error| NodeLoadError::Io {
		identifier: identifier.to_owned(),
		source: e,
	};

	let range = match source.locate(&name) {
		Ok(range) => range,
		Err(e) if e.kind() == ErrorKind::NotFound => {
			return Err(NodeLoadError::MissingFile(source.display_path(&name)))
		}
		Err(e) => return Err(io_err(e)),
	};

	let byte_len = range.len;
	let record_size = PointCloudPoint::SIZE as u64;
	let declared = block.len() as u64;
	if byte_len != declared * record_size {
		return Err(NodeLoadError::SizeMismatch {
			identifier: identifier.to_owned(),
			declared,
			actual: byte_len / record_size,
			byte_len,
		});
	}

	let mut file = range.open().map_err(io_err)?;
	file.read_exact(bytemuck::cast_slice_mut(block)).map_err(io_err)?;
	from_le_in_place(block);
	Ok(())
}

/// Write a node file for `identifier` (directory created if missing).
pub fn write_node_file(dir: &Path, identifier: &str, points: &[PointCloudPoint]) -> std::io::Result<()> {
	std::fs::create_dir_all(dir)?;
	let path = node_path(dir, identifier);
	if cfg!(target_endian = "little") {
		std::fs::write(path, bytemuck::cast_slice::<PointCloudPoint, u8>(points))
	} else {
		let mut owned = points.to_vec();
		to_le_in_place(&mut owned);
		std::fs::write(path, bytemuck::cast_slice::<PointCloudPoint, u8>(&owned))
	}
}
