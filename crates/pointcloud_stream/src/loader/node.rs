//! Per-node residency state.

use crate::point::PointCloudPoint;

/// Lifecycle of a tracked node.
///
/// `Loading → InMemory → Disposed` for nodes with points, `Empty` for nodes
/// that declare zero points. No other transitions exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeDataState {
	/// Requested, point block not published yet. Failed loads stay here.
	Loading,
	/// Point block fully read and readable.
	InMemory,
	/// Evicted or torn down; the block has been released.
	Disposed,
	/// The node has no points; nothing to load.
	Empty,
}

/// A tracked node and its point block.
#[derive(Debug)]
pub struct Node {
	identifier: String,
	point_count: u32,
	state: NodeDataState,
	points: Option<Box<[PointCloudPoint]>>,
}

impl Node {
	pub(crate) fn loading(identifier: String, point_count: u32) -> Self {
		Self {
			identifier,
			point_count,
			state: NodeDataState::Loading,
			points: None,
		}
	}

	pub(crate) fn empty(identifier: String) -> Self {
		Self {
			identifier,
			point_count: 0,
			state: NodeDataState::Empty,
			points: None,
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
	pub fn state(&self) -> NodeDataState {
		self.state
	}

	/// Point data; empty unless the node is `InMemory`.
	#[inline]
	pub fn points(&self) -> &[PointCloudPoint] {
		match (self.state, &self.points) {
			(NodeDataState::InMemory, Some(points)) => points,
			_ => &[],
		}
	}

	/// Publish a fully read block. Only valid from `Loading`.
	pub(crate) fn publish(&mut self, block: Box<[PointCloudPoint]>) -> bool {
		if self.state != NodeDataState::Loading {
			return false;
		}
		debug_assert_eq!(block.len(), self.point_count as usize);
		self.points = Some(block);
		self.state = NodeDataState::InMemory;
		true
	}

	/// Release the block immediately.
	pub(crate) fn dispose(&mut self) {
		self.points = None;
		self.state = NodeDataState::Disposed;
	}
}
