//! Node records and the identifier-keyed record table.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::index::NodeMetaData;
use super::{Bounds, TreeShape};
use crate::constants::{child_slot, parent_identifier, ROOT_NODE_IDENTIFIER};
use crate::error::TreeLoadError;

/// Metadata of one spatial partition.
///
/// Immutable once the owning [`RecordTable`] is built. Holds no point data.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
	identifier: String,
	point_count: u32,
	bounds: Bounds,
	bounding_sphere_radius: f32,
	/// One slot per possible child, `None` where the child is absent.
	/// Values are indices into the owning table.
	children: SmallVec<[Option<usize>; 8]>,
}

impl NodeRecord {
	fn new<S: TreeShape>(identifier: String, point_count: u32, bounds: Bounds) -> Self {
		Self {
			identifier,
			point_count,
			bounds,
			bounding_sphere_radius: S::bounding_radius(&bounds),
			children: SmallVec::from_elem(None, S::MAX_CHILDREN),
		}
	}

	#[inline]
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	#[inline]
	pub fn point_count(&self) -> u32 {
		self.point_count
	}

	#[inline]
	pub fn bounds(&self) -> &Bounds {
		&self.bounds
	}

	/// Radius used for projected size (XZ-only for quadtrees).
	#[inline]
	pub fn bounding_sphere_radius(&self) -> f32 {
		self.bounding_sphere_radius
	}

	/// Child slots as table indices; length is the shape's child count.
	#[inline]
	pub fn child_slots(&self) -> &[Option<usize>] {
		&self.children
	}

	/// Whether the record has no children at all.
	pub fn is_leaf(&self) -> bool {
		self.children.iter().all(Option::is_none)
	}

	/// Depth below the root (root = 0).
	#[inline]
	pub fn depth(&self) -> usize {
		self.identifier.chars().count().saturating_sub(1)
	}
}

/// All records of a tree keyed by identifier, with child links resolved.
#[derive(Clone, Debug, Default)]
pub struct RecordTable {
	records: Vec<NodeRecord>,
	by_id: HashMap<String, usize>,
	root: usize,
}

impl RecordTable {
	/// Build the table from index entries and link children in one pass.
	///
	/// Fails on negative point counts, non-finite or negative bounds,
	/// duplicate identifiers, a missing root,
	/// nodes whose parent is absent, and child digits outside the shape's
	/// range.
	pub fn build<S: TreeShape>(nodes: Vec<NodeMetaData>) -> Result<Self, TreeLoadError> {
		let mut records = Vec::with_capacity(nodes.len());
		let mut by_id = HashMap::with_capacity(nodes.len());

		for node in nodes {
			let point_count = u32::try_from(node.point_count).map_err(|_| TreeLoadError::NegativePointCount {
				identifier: node.identifier.clone(),
				count: node.point_count,
			})?;
			if !node.center.is_finite() || !node.size.is_finite() || node.size.min_element() < 0.0 {
				return Err(TreeLoadError::InvalidBounds {
					identifier: node.identifier,
				});
			}
			if by_id.contains_key(&node.identifier) {
				return Err(TreeLoadError::DuplicateIdentifier(node.identifier));
			}
			by_id.insert(node.identifier.clone(), records.len());
			records.push(NodeRecord::new::<S>(
				node.identifier,
				point_count,
				Bounds::new(node.center, node.size),
			));
		}

		let root = *by_id.get(ROOT_NODE_IDENTIFIER).ok_or(TreeLoadError::MissingRoot)?;

		// Link pass
		for index in 0..records.len() {
			if index == root {
				continue;
			}
			let identifier = records[index].identifier.as_str();
			let parent_id =
				parent_identifier(identifier).ok_or_else(|| TreeLoadError::OrphanNode(identifier.to_owned()))?;
			let slot =
				child_slot(identifier).ok_or_else(|| TreeLoadError::InvalidIdentifier(identifier.to_owned()))?;
			if slot as usize >= S::MAX_CHILDREN {
				return Err(TreeLoadError::InvalidChildIndex {
					identifier: identifier.to_owned(),
					index: slot,
					max: S::MAX_CHILDREN,
				});
			}
			let parent = *by_id
				.get(parent_id)
				.ok_or_else(|| TreeLoadError::OrphanNode(identifier.to_owned()))?;
			records[parent].children[slot as usize] = Some(index);
		}

		Ok(Self { records, by_id, root })
	}

	/// The root record (identifier `"r"`).
	#[inline]
	pub fn root(&self) -> &NodeRecord {
		&self.records[self.root]
	}

	#[inline]
	pub fn root_index(&self) -> usize {
		self.root
	}

	/// Look up a record by identifier.
	pub fn record(&self, identifier: &str) -> Option<&NodeRecord> {
		self.by_id.get(identifier).map(|&i| &self.records[i])
	}

	/// Table index of an identifier.
	pub fn index_of(&self, identifier: &str) -> Option<usize> {
		self.by_id.get(identifier).copied()
	}

	/// Record at a table index.
	#[inline]
	pub fn get(&self, index: usize) -> Option<&NodeRecord> {
		self.records.get(index)
	}

	/// Present children of a record, in slot order.
	pub fn children<'a>(&'a self, record: &'a NodeRecord) -> impl Iterator<Item = &'a NodeRecord> + 'a {
		record.children.iter().flatten().map(move |&i| &self.records[i])
	}

	/// Parent record, `None` for the root.
	pub fn parent(&self, record: &NodeRecord) -> Option<&NodeRecord> {
		parent_identifier(record.identifier()).and_then(|id| self.record(id))
	}

	pub fn contains(&self, identifier: &str) -> bool {
		self.by_id.contains_key(identifier)
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
		self.records.iter()
	}

	/// Deepest level present in the tree (root only = 0).
	pub fn max_depth(&self) -> usize {
		self.records.iter().map(NodeRecord::depth).max().unwrap_or(0)
	}

	/// Sum of point counts over all records.
	pub fn total_points(&self) -> u64 {
		self.records.iter().map(|r| u64::from(r.point_count)).sum()
	}
}
