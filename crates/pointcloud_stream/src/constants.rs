//! On-disk naming conventions and loader timing.

use std::time::Duration;

/// Identifier of the root node of every tree.
pub const ROOT_NODE_IDENTIFIER: &str = "r";

/// Extension of per-node point files (`<identifier>.pcnode`).
pub const NODE_FILE_EXTENSION: &str = "pcnode";

/// Name of the index file stored next to the node files.
pub const INDEX_FILE_NAME: &str = "index.pcindex";

/// Magic bytes at the start of an index file.
pub const INDEX_MAGIC: &[u8; 4] = b"PCIX";

/// Current index file format version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Maximum number of children of an octree node.
pub const OCTREE_MAX_CHILDREN: usize = 8;

/// Maximum number of children of a quadtree node.
pub const QUADTREE_MAX_CHILDREN: usize = 4;

/// How long the loader thread waits on an empty queue before re-checking
/// its cancel flag.
pub const LOADER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// File name of the point data for a node.
#[inline]
pub fn node_file_name(identifier: &str) -> String {
	format!("{identifier}.{NODE_FILE_EXTENSION}")
}

/// Parent identifier of a node, or `None` for the root (or an empty string).
///
/// Identifiers encode the path from the root: the parent is the identifier
/// minus its last character.
pub fn parent_identifier(identifier: &str) -> Option<&str> {
	if identifier == ROOT_NODE_IDENTIFIER {
		return None;
	}
	let (last_start, _) = identifier.char_indices().last()?;
	if last_start == 0 {
		return None;
	}
	Some(&identifier[..last_start])
}

/// Child slot encoded by the last character of an identifier.
///
/// Returns `None` for the root or when the last character is not a digit.
pub fn child_slot(identifier: &str) -> Option<u32> {
	if identifier == ROOT_NODE_IDENTIFIER {
		return None;
	}
	identifier.chars().last()?.to_digit(10)
}
