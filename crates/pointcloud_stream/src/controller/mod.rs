//! NodeTreeController - per-frame driver of culling, loading and building.
//!
//! Each [`update`](NodeTreeController::update):
//! 1. culls the tree against the camera and ranks nodes by projected size
//! 2. greedily takes the largest nodes until the point limit is reached
//! 3. asks the loader for the taken nodes
//! 4. advances the buffer builder one step
//! 5. hands the ready buffer to the renderer, or clears it when nothing was
//!    taken
//!
//! # Module Structure
//!
//! - [`camera`]: `Camera`, `Projection`
//! - [`frustum`]: `Frustum` - plane extraction and box test
//! - [`selection`]: traversal, sorting and greedy selection
//! - [`renderer`]: `PointCloudRenderer` - where published buffers go

pub mod camera;
pub mod frustum;
pub mod renderer;
pub mod selection;

pub use camera::{Camera, Projection};
pub use frustum::Frustum;
pub use renderer::PointCloudRenderer;
pub use selection::{ViewState, VisibleNode};

use std::sync::Arc;

use glam::Affine3A;
#[cfg(feature = "metrics")]
use web_time::Instant;

use crate::builder::{BufferBuilder, HostPointBuffer, PointBuffer};
use crate::config::StreamingConfig;
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::StreamingMetrics;
use crate::tree::PointCloudTree;

type Allocator<B> = Box<dyn FnMut(usize) -> B + Send>;

/// Counters describing one update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
	/// Nodes that passed frustum and projected-size tests.
	pub visible_nodes: usize,
	/// Nodes taken within the point limit.
	pub used_nodes: usize,
	/// Sum of point counts of the taken nodes.
	pub used_points: usize,
	/// Valid points of the buffer handed to the renderer.
	pub valid_points: usize,
	/// Points resident in the loader after the update.
	pub resident_points: u64,
}

/// Streams one tree into one renderer.
pub struct NodeTreeController<B: PointBuffer = HostPointBuffer> {
	tree: Arc<PointCloudTree>,
	config: StreamingConfig,
	builder: BufferBuilder<B>,
	allocate: Allocator<B>,
	/// Tree space to world space.
	renderer_transform: Affine3A,

	visible: Vec<VisibleNode>,
	used: Vec<String>,
	used_points: usize,

	#[cfg(feature = "metrics")]
	metrics: StreamingMetrics,
}

impl NodeTreeController<HostPointBuffer> {
	/// Controller with host memory buffers.
	pub fn new(tree: Arc<PointCloudTree>, config: StreamingConfig) -> Result<Self, ConfigError> {
		Self::with_allocator(tree, config, HostPointBuffer::new)
	}
}

impl<B: PointBuffer> NodeTreeController<B> {
	/// Controller whose render buffers come from `allocate(capacity)`.
	///
	/// The allocator is kept to recreate buffers when the point limit or the
	/// step count changes.
	pub fn with_allocator(
		tree: Arc<PointCloudTree>,
		config: StreamingConfig,
		allocate: impl FnMut(usize) -> B + Send + 'static,
	) -> Result<Self, ConfigError> {
		config.validate()?;
		let mut allocate: Allocator<B> = Box::new(allocate);
		let builder = Self::create_builder(&tree, &config, &mut allocate);
		Ok(Self {
			tree,
			config,
			builder,
			allocate,
			renderer_transform: Affine3A::IDENTITY,
			visible: Vec::new(),
			used: Vec::new(),
			used_points: 0,
			#[cfg(feature = "metrics")]
			metrics: StreamingMetrics::new(),
		})
	}

	fn create_builder(tree: &PointCloudTree, config: &StreamingConfig, allocate: &mut Allocator<B>) -> BufferBuilder<B> {
		BufferBuilder::with_allocator(
			Arc::clone(tree.loader()),
			config.point_limit,
			config.rebuild_steps,
			allocate,
		)
	}

	// =========================================================================
	// Settings
	// =========================================================================

	/// Replace the configuration.
	///
	/// The buffer builder is recreated when the point limit or the step count
	/// changes; the published buffer is lost in that case. The loader budget
	/// is fixed when the tree is opened and is not affected.
	pub fn set_config(&mut self, config: StreamingConfig) -> Result<(), ConfigError> {
		config.validate()?;
		if config.builder_changed(&self.config) {
			tracing::debug!(
				point_limit = config.point_limit,
				rebuild_steps = config.rebuild_steps,
				"recreating buffer builder"
			);
			self.builder = Self::create_builder(&self.tree, &config, &mut self.allocate);
		}
		self.config = config;
		Ok(())
	}

	/// Set the tree-to-world transform of the renderer.
	pub fn set_renderer_transform(&mut self, transform: Affine3A) {
		self.renderer_transform = transform;
	}

	// =========================================================================
	// Per-frame
	// =========================================================================

	/// Cull and select nodes for `camera` without loading or building.
	///
	/// Returns the identifiers taken within the point limit, largest
	/// projected size first.
	#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
	pub fn cull(&mut self, camera: &Camera) -> &[String] {
		#[cfg(feature = "metrics")]
		let start = Instant::now();

		let view = ViewState::new(
			camera,
			&self.renderer_transform,
			self.config.cull_mode,
			self.config.min_projection,
		);

		self.visible.clear();
		self.tree.collect_visible(&view, &mut self.visible);
		selection::sort_by_weight(&mut self.visible);
		let (taken, points) = selection::select_within_limit(&self.visible, self.config.point_limit);

		let records = self.tree.records();
		self.used.clear();
		self.used.extend(
			self.visible[..taken]
				.iter()
				.filter_map(|node| records.get(node.record))
				.map(|record| record.identifier().to_owned()),
		);
		self.used_points = points;

		#[cfg(feature = "metrics")]
		self.metrics.record_cull_timing(start.elapsed().as_micros() as u64);

		&self.used
	}

	/// Run one frame: cull, request loads, advance the builder one step and
	/// publish the ready buffer to `renderer`.
	pub fn update(&mut self, camera: &Camera, renderer: &mut impl PointCloudRenderer<B>) -> FrameStats {
		self.cull(camera);
		self.publish(renderer, false)
	}

	/// Like [`update`](Self::update), but loads every selected node and builds
	/// the whole buffer before returning.
	pub fn update_immediate(&mut self, camera: &Camera, renderer: &mut impl PointCloudRenderer<B>) -> FrameStats {
		self.cull(camera);
		self.publish(renderer, true)
	}

	fn publish(&mut self, renderer: &mut impl PointCloudRenderer<B>, immediate: bool) -> FrameStats {
		let loader = Arc::clone(self.tree.loader());
		let mut valid_points = 0;

		if self.used.is_empty() {
			renderer.clear_buffer();
		} else {
			#[cfg(feature = "metrics")]
			let start = Instant::now();

			let (buffer, valid) = if immediate {
				loader.load_immediate(self.used.as_slice());
				self.builder.get_populated_buffer_immediate(self.used.as_slice())
			} else {
				loader.request_load(self.used.as_slice());
				self.builder.get_populated_buffer(self.used.as_slice())
			};
			renderer.set_buffer(self.tree.bounds(), buffer, valid);
			valid_points = valid;

			#[cfg(feature = "metrics")]
			self.metrics.record_build_timing(start.elapsed().as_micros() as u64);
		}

		let stats = FrameStats {
			visible_nodes: self.visible.len(),
			used_nodes: self.used.len(),
			used_points: self.used_points,
			valid_points,
			resident_points: loader.resident_points(),
		};

		#[cfg(feature = "metrics")]
		self.metrics.record_frame(&stats);

		stats
	}

	// =========================================================================
	// Accessors
	// =========================================================================

	#[inline]
	pub fn tree(&self) -> &Arc<PointCloudTree> {
		&self.tree
	}

	#[inline]
	pub fn config(&self) -> &StreamingConfig {
		&self.config
	}

	#[inline]
	pub fn renderer_transform(&self) -> &Affine3A {
		&self.renderer_transform
	}

	/// Visible nodes of the last cull, sorted by projected size.
	#[inline]
	pub fn visible_nodes(&self) -> &[VisibleNode] {
		&self.visible
	}

	/// Identifiers taken by the last cull.
	#[inline]
	pub fn used_nodes(&self) -> &[String] {
		&self.used
	}

	#[inline]
	pub fn builder(&self) -> &BufferBuilder<B> {
		&self.builder
	}

	#[cfg(feature = "metrics")]
	#[inline]
	pub fn metrics(&self) -> &StreamingMetrics {
		&self.metrics
	}
}
