//! Error types.
//!
//! Only [`TreeLoadError`] ever reaches callers of the streaming engine: a
//! tree either opens completely or not at all. [`NodeLoadError`] is produced
//! by the loader thread, logged, and leaves the offending node unpublished.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to open a tree. No partial tree is ever returned.
#[derive(Debug, Error)]
pub enum TreeLoadError {
	#[error("index file not found: {0}")]
	MissingIndex(PathBuf),

	#[error("failed to read index file")]
	Io(#[from] std::io::Error),

	#[error("invalid index data")]
	InvalidIndex(#[from] binrw::Error),

	#[error("invalid tree archive")]
	InvalidArchive(#[from] zip::result::ZipError),

	#[error("archive entry {0} is compressed, only stored entries can be streamed")]
	CompressedEntry(String),

	#[error("archive entry {0} extends past the end of the archive")]
	TruncatedEntry(String),

	#[error("index does not contain a root node")]
	MissingRoot,

	#[error("duplicate node identifier: {0}")]
	DuplicateIdentifier(String),

	#[error("malformed node identifier: {0:?}")]
	InvalidIdentifier(String),

	#[error("parent of node {0} is missing from the index")]
	OrphanNode(String),

	#[error("node {identifier} encodes child index {index}, tree allows 0-{}", .max - 1)]
	InvalidChildIndex {
		identifier: String,
		index: u32,
		max: usize,
	},

	#[error("node {identifier} declares a negative point count ({count})")]
	NegativePointCount { identifier: String, count: i32 },

	#[error("node {identifier} has non-finite or negative bounds")]
	InvalidBounds { identifier: String },
}

/// Failure to load the point block of a single node.
#[derive(Debug, Error)]
pub enum NodeLoadError {
	#[error("data for node not found: {0}")]
	MissingFile(PathBuf),

	#[error("failed to read data for node {identifier}")]
	Io {
		identifier: String,
		#[source]
		source: std::io::Error,
	},

	#[error("mismatch between declared ({declared}) and actual ({actual}) point count for node {identifier} ({byte_len} bytes)")]
	SizeMismatch {
		identifier: String,
		declared: u64,
		actual: u64,
		byte_len: u64,
	},
}

/// Invalid streaming configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	#[error("point budget must be greater than zero")]
	ZeroPointBudget,

	#[error("point limit must be greater than zero")]
	ZeroPointLimit,

	#[error("rebuild steps must be at least 1")]
	ZeroRebuildSteps,

	#[error("minimum projection must be a finite, non-negative number of pixels, got {0}")]
	InvalidMinProjection(f32),
}

/// Child index outside the fixed range of a tree shape.
///
/// This is a contract violation by the caller, not a runtime condition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("child index must be within range 0-{}, got {index}", .max - 1)]
pub struct ChildIndexError {
	pub index: u8,
	pub max: usize,
}
