//! Binary index file (`index.pcindex`).
//!
//! Little-endian layout:
//!
//! ```text
//! magic        [u8; 4]  "PCIX"
//! version      u32      1
//! tree_type    u8       0 = octree, 1 = quadtree
//! node_count   u32
//! node_count × {
//!     id_len       u16
//!     identifier   [u8; id_len]  UTF-8
//!     point_count  i32
//!     center       [f32; 3]
//!     size         [f32; 3]
//! }
//! ```

use std::io::Cursor;
use std::path::Path;

use binrw::{binrw, BinRead, BinWrite};
use glam::Vec3;

use super::source::TreeSource;
use crate::constants::{INDEX_FILE_NAME, INDEX_FORMAT_VERSION};
use crate::error::TreeLoadError;

/// Subdivision scheme of a tree.
#[binrw]
#[brw(repr = u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeType {
	Octree = 0,
	Quadtree = 1,
}

impl std::fmt::Display for TreeType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TreeType::Octree => f.write_str("octree"),
			TreeType::Quadtree => f.write_str("quadtree"),
		}
	}
}

/// One node entry of the index.
#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMetaData {
	#[br(temp)]
	#[bw(try_calc(u16::try_from(identifier.len())))]
	identifier_len: u16,

	#[br(count = identifier_len, try_map = |bytes: Vec<u8>| String::from_utf8(bytes))]
	#[bw(map = |s: &String| s.as_bytes().to_vec())]
	pub identifier: String,

	/// Signed on disk; negative values are rejected when the tree is built.
	pub point_count: i32,

	#[br(map = |v: [f32; 3]| Vec3::from_array(v))]
	#[bw(map = |v: &Vec3| v.to_array())]
	pub center: Vec3,

	#[br(map = |v: [f32; 3]| Vec3::from_array(v))]
	#[bw(map = |v: &Vec3| v.to_array())]
	pub size: Vec3,
}

impl NodeMetaData {
	pub fn new(identifier: impl Into<String>, point_count: i32, center: Vec3, size: Vec3) -> Self {
		Self {
			identifier: identifier.into(),
			point_count,
			center,
			size,
		}
	}
}

/// Parsed index file.
#[binrw]
#[brw(little, magic = b"PCIX")]
#[derive(Clone, Debug, PartialEq)]
pub struct IndexData {
	#[br(temp, assert(version == INDEX_FORMAT_VERSION, "unsupported index version {}", version))]
	#[bw(calc = INDEX_FORMAT_VERSION)]
	version: u32,

	pub tree_type: TreeType,

	#[br(temp)]
	#[bw(try_calc(u32::try_from(nodes.len())))]
	node_count: u32,

	#[br(count = node_count)]
	pub nodes: Vec<NodeMetaData>,
}

impl IndexData {
	pub fn new(tree_type: TreeType, nodes: Vec<NodeMetaData>) -> Self {
		Self { tree_type, nodes }
	}

	/// Read `index.pcindex` from a tree directory.
	pub fn read_from_dir(dir: &Path) -> Result<Self, TreeLoadError> {
		TreeSource::Directory(dir.to_path_buf()).read_index()
	}

	/// Parse an index from memory.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, TreeLoadError> {
		Ok(Self::read(&mut Cursor::new(bytes))?)
	}

	/// Encode the index to memory.
	pub fn to_bytes(&self) -> binrw::BinResult<Vec<u8>> {
		let mut cursor = Cursor::new(Vec::new());
		self.write(&mut cursor)?;
		Ok(cursor.into_inner())
	}

	/// Write the encoded index to an explicit file path.
	pub fn write_to_file(&self, path: &Path) -> binrw::BinResult<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	/// Write `index.pcindex` into a tree directory (created if missing).
	pub fn write_to_dir(&self, dir: &Path) -> binrw::BinResult<()> {
		std::fs::create_dir_all(dir)?;
		self.write_to_file(&dir.join(INDEX_FILE_NAME))
	}
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
