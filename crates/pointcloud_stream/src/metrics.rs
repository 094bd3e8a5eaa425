//! Streaming statistics.
//!
//! Compiled in with the `metrics` feature and toggled at runtime through
//! [`COLLECT_METRICS`]. Without the feature every `record_*` call is a no-op.
//!
//! ```ignore
//! use pointcloud_stream::metrics::COLLECT_METRICS;
//!
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//! let avg_cull = controller.metrics().cull_timings.average();
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::controller::FrameStats;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Compile-time feature and runtime toggle combined.
#[inline]
pub fn is_enabled() -> bool {
	#[cfg(feature = "metrics")]
	{
		COLLECT_METRICS.load(Ordering::Relaxed)
	}
	#[cfg(not(feature = "metrics"))]
	{
		false
	}
}

/// Fixed-size history of recent samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
	samples: VecDeque<u64>,
	capacity: usize,
}

impl RollingWindow {
	pub fn new(capacity: usize) -> Self {
		Self {
			samples: VecDeque::with_capacity(capacity),
			capacity: capacity.max(1),
		}
	}

	pub fn push(&mut self, value: u64) {
		if self.samples.len() >= self.capacity {
			self.samples.pop_front();
		}
		self.samples.push_back(value);
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}

	pub fn clear(&mut self) {
		self.samples.clear();
	}

	/// Most recent sample.
	pub fn last(&self) -> Option<u64> {
		self.samples.back().copied()
	}

	pub fn average(&self) -> f64 {
		if self.samples.is_empty() {
			return 0.0;
		}
		self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
	}

	pub fn min_max(&self) -> Option<(u64, u64)> {
		let min = self.samples.iter().min()?;
		let max = self.samples.iter().max()?;
		Some((*min, *max))
	}
}

impl Default for RollingWindow {
	fn default() -> Self {
		Self::new(128) // ~2 seconds at 60fps
	}
}

/// Per-controller statistics, updated every frame.
#[derive(Debug, Clone, Default)]
pub struct StreamingMetrics {
	// Selection
	pub visible_nodes: usize,
	pub used_nodes: usize,
	pub used_points: usize,

	// Buffers and memory
	/// Valid point count of the last published buffer.
	pub valid_points: usize,
	/// Loader resident points at the end of the last frame.
	pub resident_points: u64,

	// Timing (µs)
	pub cull_timings: RollingWindow,
	pub build_timings: RollingWindow,

	pub frames: u64,
}

impl StreamingMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy the counters of a finished frame.
	pub fn record_frame(&mut self, stats: &FrameStats) {
		if !is_enabled() {
			return;
		}
		self.visible_nodes = stats.visible_nodes;
		self.used_nodes = stats.used_nodes;
		self.used_points = stats.used_points;
		self.valid_points = stats.valid_points;
		self.resident_points = stats.resident_points;
		self.frames += 1;
	}

	pub fn record_cull_timing(&mut self, timing_us: u64) {
		if is_enabled() {
			self.cull_timings.push(timing_us);
		}
	}

	pub fn record_build_timing(&mut self, timing_us: u64) {
		if is_enabled() {
			self.build_timings.push(timing_us);
		}
	}

	/// Reset everything but the frame counter.
	pub fn reset(&mut self) {
		let frames = self.frames;
		*self = Self::default();
		self.frames = frames;
	}
}
