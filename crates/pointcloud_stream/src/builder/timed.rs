//! Time-budgeted builder for callers without a per-frame update.
//!
//! Performs at most one rebuild step per `min_step_interval`. Calls in
//! between are coalesced into nothing. A request made while a rebuild runs
//! is parked and starts once the current rebuild has swapped, so every
//! rebuild completes after at most `rebuild_steps` effective polls.
//!
//! The clock is passed in by the caller.

use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

use super::{BufferBuilder, HostPointBuffer, PointBuffer};
use crate::config::StreamingConfig;
use crate::loader::NodeLoader;

pub struct TimedBufferBuilder<B: PointBuffer = HostPointBuffer> {
	inner: BufferBuilder<B>,
	min_step_interval: Duration,
	last_step: Option<Instant>,
	pending: Option<Vec<String>>,
}

impl TimedBufferBuilder<HostPointBuffer> {
	/// Host memory builder sized and paced by `config`.
	pub fn from_config(loader: Arc<NodeLoader>, config: &StreamingConfig) -> Self {
		Self::new(
			BufferBuilder::new(loader, config.point_limit, config.rebuild_steps),
			config.min_step_interval,
		)
	}
}

impl<B: PointBuffer> TimedBufferBuilder<B> {
	pub fn new(inner: BufferBuilder<B>, min_step_interval: Duration) -> Self {
		Self {
			inner,
			min_step_interval,
			last_step: None,
			pending: None,
		}
	}

	/// Ask for `identifiers` to be built. The latest request wins.
	///
	/// Returns `true` if a buffer was published by the step this call made.
	pub fn request<S: AsRef<str>>(&mut self, identifiers: &[S], now: Instant) -> bool {
		self.pending = Some(identifiers.iter().map(|id| id.as_ref().to_owned()).collect());
		self.poll(now)
	}

	/// Perform one step if the interval since the last step has elapsed.
	///
	/// Returns `true` if the step published a buffer.
	pub fn poll(&mut self, now: Instant) -> bool {
		if let Some(last) = self.last_step {
			if now.saturating_duration_since(last) < self.min_step_interval {
				return false;
			}
		}

		if self.inner.is_busy() {
			self.last_step = Some(now);
			return self.inner.advance();
		}

		match self.pending.take() {
			Some(identifiers) => {
				self.last_step = Some(now);
				self.inner.get_populated_buffer(identifiers.as_slice());
				// Single-step builders publish immediately.
				!self.inner.is_busy()
			}
			None => false,
		}
	}

	/// No rebuild running and nothing parked.
	pub fn is_idle(&self) -> bool {
		!self.inner.is_busy() && self.pending.is_none()
	}

	/// Currently published buffer and its valid point count.
	#[inline]
	pub fn ready_buffer(&self) -> (&B, usize) {
		self.inner.ready_buffer()
	}

	#[inline]
	pub fn inner(&self) -> &BufferBuilder<B> {
		&self.inner
	}

	pub fn min_step_interval(&self) -> Duration {
		self.min_step_interval
	}
}
