//! Session configuration (TOML).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use pointcloud_stream::{CullMode, StreamingConfig};
use serde::Deserialize;

/// Root configuration of a `stream` session.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
	/// Tree directory or stored ZIP archive, relative to the config file.
	pub data_path: PathBuf,
	/// Folder holding the tree inside an archive.
	#[serde(default)]
	pub archive_folder: Option<String>,
	/// Number of frames to run.
	#[serde(default = "default_frames")]
	pub frames: u32,
	/// Wall-clock time per frame in milliseconds (gives the loader time).
	#[serde(default = "default_frame_time_ms")]
	pub frame_time_ms: u64,
	/// Build every frame completely instead of amortizing.
	#[serde(default)]
	pub immediate: bool,
	#[serde(default)]
	pub camera: CameraConfig,
	#[serde(default)]
	pub streaming: StreamingSection,
}

/// Orbit camera around the tree bounds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
	/// Vertical field of view in degrees.
	pub fov_degrees: f32,
	/// Viewport size in pixels.
	pub viewport: [f32; 2],
	/// Orbit radius as a multiple of the tree's largest extent.
	pub orbit_scale: f32,
	/// Height above the tree center, as a multiple of the largest extent.
	pub height_scale: f32,
	/// Degrees of orbit per frame.
	pub degrees_per_frame: f32,
}

impl Default for CameraConfig {
	fn default() -> Self {
		Self {
			fov_degrees: 60.0,
			viewport: [1920.0, 1080.0],
			orbit_scale: 1.5,
			height_scale: 0.5,
			degrees_per_frame: 2.0,
		}
	}
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CullModeSetting {
	Frustum,
	Distance,
}

/// Maps onto [`StreamingConfig`]; missing fields take its defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamingSection {
	pub point_budget: u64,
	pub point_limit: usize,
	pub rebuild_steps: usize,
	pub min_projection: f32,
	pub cull_mode: CullModeSetting,
	pub min_step_interval_ms: u64,
}

impl Default for StreamingSection {
	fn default() -> Self {
		let defaults = StreamingConfig::default();
		Self {
			point_budget: defaults.point_budget,
			point_limit: defaults.point_limit,
			rebuild_steps: defaults.rebuild_steps,
			min_projection: defaults.min_projection,
			cull_mode: CullModeSetting::Frustum,
			min_step_interval_ms: defaults.min_step_interval.as_millis() as u64,
		}
	}
}

fn default_frames() -> u32 {
	240
}

fn default_frame_time_ms() -> u64 {
	16
}

impl SessionConfig {
	/// Load and validate a session config. `data_path` is resolved against
	/// the config file's directory.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let mut config: SessionConfig = toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;

		if config.frames == 0 {
			anyhow::bail!("frames must be at least 1");
		}
		if !(1.0..180.0).contains(&config.camera.fov_degrees) {
			anyhow::bail!("fov_degrees must be within 1-179, got {}", config.camera.fov_degrees);
		}
		if config.camera.viewport.iter().any(|v| *v <= 0.0) {
			anyhow::bail!("viewport must be positive, got {:?}", config.camera.viewport);
		}
		config
			.streaming_config()
			.validate()
			.context("Invalid [streaming] section")?;

		if config.data_path.is_relative() {
			let base = path.parent().unwrap_or(Path::new("."));
			config.data_path = base.join(&config.data_path);
		}
		Ok(config)
	}

	pub fn streaming_config(&self) -> StreamingConfig {
		let s = &self.streaming;
		StreamingConfig {
			point_budget: s.point_budget,
			point_limit: s.point_limit,
			rebuild_steps: s.rebuild_steps,
			min_projection: s.min_projection,
			cull_mode: match s.cull_mode {
				CullModeSetting::Frustum => CullMode::CameraFrustum,
				CullModeSetting::Distance => CullMode::Distance,
			},
			min_step_interval: Duration::from_millis(s.min_step_interval_ms),
		}
	}
}
