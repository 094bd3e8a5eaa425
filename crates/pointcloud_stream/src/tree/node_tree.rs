//! Loaded trees: the record table plus the loader streaming its nodes.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use super::index::{IndexData, TreeType};
use super::record::{NodeRecord, RecordTable};
use super::shape::{Octree, Quadtree, TreeShape};
use super::source::{TreeArchive, TreeSource};
use super::Bounds;
use crate::controller::selection::{collect_visible, ViewState, VisibleNode};
use crate::error::TreeLoadError;
use crate::loader::NodeLoader;

/// A tree of a statically known shape.
///
/// Owns exactly one [`NodeLoader`]. Dropping the tree disposes the loader.
pub struct NodeTree<S: TreeShape> {
	source: Arc<TreeSource>,
	records: Arc<RecordTable>,
	loader: Arc<NodeLoader>,
	_shape: PhantomData<S>,
}

impl<S: TreeShape> NodeTree<S> {
	/// Build the tree from a parsed index and start its loader thread.
	pub fn from_index(source: Arc<TreeSource>, index: IndexData, point_budget: u64) -> Result<Self, TreeLoadError> {
		let records = Arc::new(RecordTable::build::<S>(index.nodes)?);
		let loader = NodeLoader::new(Arc::clone(&source), Arc::clone(&records), point_budget)?;
		Ok(Self {
			source,
			records,
			loader: Arc::new(loader),
			_shape: PhantomData,
		})
	}

	/// Directory or archive file the tree is read from.
	#[inline]
	pub fn path_on_disk(&self) -> &Path {
		self.source.path()
	}

	#[inline]
	pub fn source(&self) -> &Arc<TreeSource> {
		&self.source
	}

	#[inline]
	pub fn records(&self) -> &Arc<RecordTable> {
		&self.records
	}

	/// Bounds of the root record.
	#[inline]
	pub fn bounds(&self) -> Bounds {
		*self.records.root().bounds()
	}

	#[inline]
	pub fn loader(&self) -> &Arc<NodeLoader> {
		&self.loader
	}

	/// Stop the loader and drop all resident point data. Idempotent.
	pub fn dispose(&self) {
		self.loader.dispose();
	}
}

impl<S: TreeShape> Drop for NodeTree<S> {
	fn drop(&mut self) {
		if !self.loader.is_disposed() {
			self.dispose();
		}
	}
}

/// A loaded tree of either shape.
pub enum PointCloudTree {
	Octree(NodeTree<Octree>),
	Quadtree(NodeTree<Quadtree>),
}

impl PointCloudTree {
	/// Open the tree stored in `path`: a directory holding `index.pcindex`
	/// plus `.pcnode` files, or a stored ZIP archive with those files at its
	/// top level.
	///
	/// Either the whole index is valid and a tree is returned, or nothing is.
	/// Node data is not touched until it is requested.
	pub fn try_load_from_disk(path: impl AsRef<Path>, point_budget: u64) -> Result<Self, TreeLoadError> {
		let path = path.as_ref();
		let source = TreeSource::open(path).inspect_err(|e| {
			tracing::error!(path = %path.display(), error = %e, "failed to open point cloud tree");
		})?;
		Self::try_load_from_source(source, point_budget)
	}

	/// Open a tree kept below `folder` inside a stored ZIP archive.
	pub fn try_load_from_archive(
		path: impl AsRef<Path>,
		folder: Option<&str>,
		point_budget: u64,
	) -> Result<Self, TreeLoadError> {
		let path = path.as_ref();
		let archive = TreeArchive::open(path, folder).inspect_err(|e| {
			tracing::error!(path = %path.display(), error = %e, "failed to open point cloud archive");
		})?;
		Self::try_load_from_source(TreeSource::Archive(archive), point_budget)
	}

	/// Open a tree from an already resolved source.
	pub fn try_load_from_source(source: TreeSource, point_budget: u64) -> Result<Self, TreeLoadError> {
		let source = Arc::new(source);
		let result = Self::load(Arc::clone(&source), point_budget);
		let path = source.path();
		match &result {
			Ok(tree) => tracing::info!(
				path = %path.display(),
				archive = source.is_archive(),
				tree_type = %tree.tree_type(),
				nodes = tree.records().len(),
				center = ?tree.bounds().center,
				size = ?tree.bounds().size,
				"opened point cloud tree"
			),
			Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to open point cloud tree"),
		}
		result
	}

	fn load(source: Arc<TreeSource>, point_budget: u64) -> Result<Self, TreeLoadError> {
		let index = source.read_index()?;
		Ok(match index.tree_type {
			TreeType::Octree => Self::Octree(NodeTree::from_index(source, index, point_budget)?),
			TreeType::Quadtree => Self::Quadtree(NodeTree::from_index(source, index, point_budget)?),
		})
	}

	pub fn tree_type(&self) -> TreeType {
		match self {
			Self::Octree(_) => Octree::TREE_TYPE,
			Self::Quadtree(_) => Quadtree::TREE_TYPE,
		}
	}

	pub fn path_on_disk(&self) -> &Path {
		match self {
			Self::Octree(t) => t.path_on_disk(),
			Self::Quadtree(t) => t.path_on_disk(),
		}
	}

	pub fn source(&self) -> &Arc<TreeSource> {
		match self {
			Self::Octree(t) => t.source(),
			Self::Quadtree(t) => t.source(),
		}
	}

	pub fn records(&self) -> &Arc<RecordTable> {
		match self {
			Self::Octree(t) => t.records(),
			Self::Quadtree(t) => t.records(),
		}
	}

	pub fn bounds(&self) -> Bounds {
		match self {
			Self::Octree(t) => t.bounds(),
			Self::Quadtree(t) => t.bounds(),
		}
	}

	pub fn loader(&self) -> &Arc<NodeLoader> {
		match self {
			Self::Octree(t) => t.loader(),
			Self::Quadtree(t) => t.loader(),
		}
	}

	pub fn root(&self) -> &NodeRecord {
		self.records().root()
	}

	pub fn record(&self, identifier: &str) -> Option<&NodeRecord> {
		self.records().record(identifier)
	}

	pub fn dispose(&self) {
		self.loader().dispose();
	}

	/// Append every node passing frustum and projected-size tests to `out`.
	///
	/// `out` is not cleared and not sorted.
	pub fn collect_visible(&self, view: &ViewState, out: &mut Vec<VisibleNode>) {
		match self {
			Self::Octree(t) => collect_visible::<Octree>(t.records(), view, out),
			Self::Quadtree(t) => collect_visible::<Quadtree>(t.records(), view, out),
		}
	}
}

#[cfg(test)]
#[path = "node_tree_test.rs"]
mod node_tree_test;
