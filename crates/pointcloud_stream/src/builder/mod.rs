//! BufferBuilder - double-buffered, step-amortized render buffer.
//!
//! Two buffers alternate between *ready* (handed to the renderer) and *under
//! construction*. A rebuild copies the requested nodes into the buffer under
//! construction over `rebuild_steps` calls, so that no single frame pays
//! for the whole copy. The roles swap only after the final step; the ready
//! buffer is never written while it is published.
//!
//! Step `k` of `n` copies nodes until roughly `k/n` of the capacity is
//! filled. The final step copies everything that is left and fits.
//!
//! Nodes that are not `InMemory` when their turn comes are skipped for this
//! rebuild. When a node does not fit in the remaining capacity the rebuild is
//! truncated: the node and everything after it is dropped and a warning is
//! logged.

mod buffer;
mod timed;

pub use buffer::{HostPointBuffer, PointBuffer};
pub use timed::TimedBufferBuilder;

use std::sync::Arc;

use crate::loader::NodeLoader;

/// Which of the two buffers is currently published.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BufferSlot {
	A,
	B,
}

impl BufferSlot {
	#[inline]
	fn other(self) -> Self {
		match self {
			Self::A => Self::B,
			Self::B => Self::A,
		}
	}

	#[inline]
	fn index(self) -> usize {
		match self {
			Self::A => 0,
			Self::B => 1,
		}
	}
}

/// Builds render buffers from resident nodes over several calls.
pub struct BufferBuilder<B: PointBuffer = HostPointBuffer> {
	loader: Arc<NodeLoader>,
	max_buffer_elements: usize,
	rebuild_steps: usize,

	buffers: [B; 2],
	ready: BufferSlot,
	ready_count: usize,

	// Rebuild in progress
	queued_nodes: Vec<String>,
	cursor: usize,
	constructed: usize,
	current_step: usize,
	busy: bool,

	released: bool,
}

impl BufferBuilder<HostPointBuffer> {
	/// Builder with host memory buffers.
	pub fn new(loader: Arc<NodeLoader>, max_buffer_elements: usize, rebuild_steps: usize) -> Self {
		Self::with_allocator(loader, max_buffer_elements, rebuild_steps, HostPointBuffer::new)
	}
}

impl<B: PointBuffer> BufferBuilder<B> {
	/// Builder whose two buffers come from `allocate(capacity)`.
	///
	/// `rebuild_steps` of zero is treated as one.
	pub fn with_allocator(
		loader: Arc<NodeLoader>,
		max_buffer_elements: usize,
		rebuild_steps: usize,
		mut allocate: impl FnMut(usize) -> B,
	) -> Self {
		let buffers = [allocate(max_buffer_elements), allocate(max_buffer_elements)];
		Self {
			loader,
			max_buffer_elements,
			rebuild_steps: rebuild_steps.max(1),
			buffers,
			ready: BufferSlot::A,
			ready_count: 0,
			queued_nodes: Vec::new(),
			cursor: 0,
			constructed: 0,
			current_step: 0,
			busy: false,
			released: false,
		}
	}

	// =========================================================================
	// Building
	// =========================================================================

	/// Advance the rebuild by one step and return the ready buffer.
	///
	/// When idle, `identifiers` starts a new rebuild. While a rebuild is in
	/// progress the argument is ignored; the snapshot taken at the start is
	/// finished first. Returns the ready buffer and its valid point count.
	pub fn get_populated_buffer<S: AsRef<str>>(&mut self, identifiers: &[S]) -> (&B, usize) {
		if !self.released {
			if !self.busy {
				self.start(identifiers);
			}
			self.step();
		}
		self.ready_buffer()
	}

	/// Discard any rebuild in progress and build `identifiers` completely
	/// before returning.
	pub fn get_populated_buffer_immediate<S: AsRef<str>>(&mut self, identifiers: &[S]) -> (&B, usize) {
		if !self.released {
			self.start(identifiers);
			// The final step copies everything that fits.
			self.current_step = self.rebuild_steps - 1;
			self.step();
		}
		self.ready_buffer()
	}

	/// Perform one step of the rebuild in progress, if any.
	///
	/// Returns `true` when the step completed the rebuild and swapped buffers.
	pub fn advance(&mut self) -> bool {
		if self.released || !self.busy {
			return false;
		}
		self.step()
	}

	fn start<S: AsRef<str>>(&mut self, identifiers: &[S]) {
		self.queued_nodes.clear();
		self.queued_nodes
			.extend(identifiers.iter().map(|id| id.as_ref().to_owned()));
		self.cursor = 0;
		self.constructed = 0;
		self.current_step = 0;
		self.busy = true;
	}

	/// Returns `true` when this step published a new buffer.
	#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(step = self.current_step + 1)))]
	fn step(&mut self) -> bool {
		self.current_step += 1;
		let last = self.current_step >= self.rebuild_steps;
		let max = self.max_buffer_elements;
		let target = if last {
			max
		} else {
			step_target(self.current_step, self.rebuild_steps, max)
		};

		let building = &mut self.buffers[self.ready.other().index()];
		while self.cursor < self.queued_nodes.len() && (last || self.constructed < target) {
			let identifier = &self.queued_nodes[self.cursor];
			let constructed = self.constructed;
			let copied = self.loader.try_get_node(identifier, |node| {
				let points = node.points();
				if constructed + points.len() > max {
					return None;
				}
				building.set_data(constructed, points);
				Some(points.len())
			});

			match copied {
				Some(Some(count)) => self.constructed += count,
				Some(None) => {
					tracing::warn!(
						identifier = %identifier,
						capacity = max,
						filled = self.constructed,
						skipped_nodes = self.queued_nodes.len() - self.cursor,
						"Truncating point buffer, requested nodes exceed its capacity"
					);
					self.cursor = self.queued_nodes.len();
					break;
				}
				// Not resident yet; skipped for this rebuild.
				None => {}
			}
			self.cursor += 1;
		}

		if !last {
			return false;
		}

		self.ready = self.ready.other();
		self.ready_count = self.constructed;
		self.busy = false;
		self.current_step = 0;
		true
	}

	// =========================================================================
	// Accessors
	// =========================================================================

	/// Currently published buffer and its valid point count.
	#[inline]
	pub fn ready_buffer(&self) -> (&B, usize) {
		(&self.buffers[self.ready.index()], self.ready_count)
	}

	#[inline]
	pub fn is_busy(&self) -> bool {
		self.busy
	}

	#[inline]
	pub fn max_buffer_elements(&self) -> usize {
		self.max_buffer_elements
	}

	#[inline]
	pub fn rebuild_steps(&self) -> usize {
		self.rebuild_steps
	}

	#[inline]
	pub fn loader(&self) -> &Arc<NodeLoader> {
		&self.loader
	}

	/// Release both buffers. Idempotent; the builder returns an empty
	/// result afterwards.
	pub fn dispose(&mut self) {
		if self.released {
			return;
		}
		for buffer in &mut self.buffers {
			buffer.release();
		}
		self.released = true;
		self.busy = false;
		self.ready_count = 0;
		self.queued_nodes.clear();
	}
}

/// Cumulative point count to reach by `step` of `steps`: `floor(step / steps * max)`.
fn step_target(step: usize, steps: usize, max: usize) -> usize {
	(step as u128 * max as u128 / steps.max(1) as u128) as usize
}

impl<B: PointBuffer> Drop for BufferBuilder<B> {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
