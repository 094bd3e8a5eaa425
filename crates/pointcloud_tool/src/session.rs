//! Headless streaming session: an orbiting camera drives the controller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec3;
use pointcloud_stream::{
	Bounds, Camera, FrameStats, HostPointBuffer, NodeTreeController, PointCloudRenderer, PointCloudTree, Projection,
};
use web_time::Instant;

use crate::config::SessionConfig;

/// Renderer stand-in that keeps what a GPU renderer would bind.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
	pub bound_points: usize,
	pub bounds: Option<Bounds>,
	/// Sum of point colors in the bound range, to show the data changes.
	pub checksum: u64,
	pub clears: u32,
}

impl PointCloudRenderer<HostPointBuffer> for HeadlessRenderer {
	fn set_buffer(&mut self, bounds: Bounds, buffer: &HostPointBuffer, valid_points: usize) {
		self.bound_points = valid_points;
		self.bounds = Some(bounds);
		self.checksum = buffer.as_slice()[..valid_points]
			.iter()
			.fold(0u64, |acc, p| acc.wrapping_add(u64::from(p.color)));
	}

	fn clear_buffer(&mut self) {
		self.bound_points = 0;
		self.bounds = None;
		self.checksum = 0;
		self.clears += 1;
	}
}

/// Camera orbiting the tree bounds.
fn orbit_camera(config: &SessionConfig, bounds: &Bounds, frame: u32) -> Camera {
	let cam = &config.camera;
	let extent = bounds.size.max_element().max(1.0);
	let angle = (frame as f32 * cam.degrees_per_frame).to_radians();
	let radius = extent * cam.orbit_scale;
	let eye = bounds.center + Vec3::new(angle.cos() * radius, extent * cam.height_scale, angle.sin() * radius);

	Camera::look_at(
		eye,
		bounds.center,
		Vec3::Y,
		Projection::Perspective {
			fov_y: cam.fov_degrees.to_radians(),
			near: 0.1,
			far: extent * 10.0,
		},
		(cam.viewport[0], cam.viewport[1]),
	)
}

/// Run the configured number of frames and print per-frame stats.
pub fn run(config: &SessionConfig) -> Result<()> {
	let streaming = config.streaming_config();
	let budget = streaming.point_budget;
	let tree = match config.archive_folder.as_deref() {
		Some(folder) => PointCloudTree::try_load_from_archive(&config.data_path, Some(folder), budget),
		None => PointCloudTree::try_load_from_disk(&config.data_path, budget),
	}
	.with_context(|| format!("Failed to open tree: {}", config.data_path.display()))?;
	let tree = Arc::new(tree);
	let bounds = tree.bounds();

	println!(
		"Streaming {} ({} nodes, {} points) for {} frames",
		tree.tree_type(),
		tree.records().len(),
		tree.records().total_points(),
		config.frames
	);

	let mut controller = NodeTreeController::new(Arc::clone(&tree), streaming).context("Invalid streaming config")?;
	let mut renderer = HeadlessRenderer::default();
	let frame_time = Duration::from_millis(config.frame_time_ms);
	let started = Instant::now();

	let mut last = FrameStats::default();
	for frame in 0..config.frames {
		let frame_start = Instant::now();
		let camera = orbit_camera(config, &bounds, frame);
		last = if config.immediate {
			controller.update_immediate(&camera, &mut renderer)
		} else {
			controller.update(&camera, &mut renderer)
		};

		println!(
			"frame {frame:>4}: visible {:>5}  used {:>5} ({:>9} pts)  valid {:>9}  resident {:>10}",
			last.visible_nodes, last.used_nodes, last.used_points, last.valid_points, last.resident_points
		);

		let elapsed = frame_start.elapsed();
		if elapsed < frame_time {
			std::thread::sleep(frame_time - elapsed);
		}
	}

	let metrics = controller.metrics();
	println!(
		"Done in {:.2?}: last valid {} points (checksum {:#x}), avg cull {:.1} µs, avg build {:.1} µs, {} clears",
		started.elapsed(),
		last.valid_points,
		renderer.checksum,
		metrics.cull_timings.average(),
		metrics.build_timings.average(),
		renderer.clears
	);
	log::debug!("final renderer state: {renderer:?}");

	tree.dispose();
	Ok(())
}
