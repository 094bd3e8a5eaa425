//! Benchmarks for per-frame work: culling/selection and buffer building.
//!
//! Workload: a synthetic octree of depth 4 (4681 nodes) written to a temp
//! directory once per process.

use std::path::PathBuf;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use pointcloud_stream::synth::SyntheticTree;
use pointcloud_stream::{
	BufferBuilder, Camera, NodeTreeController, PointCloudTree, Projection, StreamingConfig, TreeType,
};

const DEPTH: usize = 4;
const POINTS_PER_NODE: u32 = 256;

fn dataset_dir() -> PathBuf {
	let dir = std::env::temp_dir().join(format!("pointcloud_stream_bench_{}", std::process::id()));
	if !dir.join("index.pcindex").exists() {
		SyntheticTree::new(TreeType::Octree, DEPTH, POINTS_PER_NODE)
			.write_to_dir(&dir)
			.expect("write bench dataset");
	}
	dir
}

fn camera(distance: f32) -> Camera {
	Camera::look_at(
		Vec3::new(0.0, distance * 0.3, distance),
		Vec3::ZERO,
		Vec3::Y,
		Projection::Perspective {
			fov_y: 60f32.to_radians(),
			near: 0.1,
			far: 5000.0,
		},
		(1920.0, 1080.0),
	)
}

// ============================================================================
// Culling
// ============================================================================

/// Frustum culling, LOD ranking and greedy selection at several distances.
fn bench_cull(c: &mut Criterion) {
	let tree = Arc::new(PointCloudTree::try_load_from_disk(dataset_dir(), 10_000_000).expect("open tree"));
	let config = StreamingConfig {
		min_projection: 20.0,
		..StreamingConfig::default()
	};
	let mut controller = NodeTreeController::new(tree, config).expect("controller");

	let mut group = c.benchmark_group("cull_select");
	for distance in [150.0f32, 400.0, 1200.0] {
		group.bench_with_input(BenchmarkId::from_parameter(distance as u32), &distance, |b, &d| {
			let camera = camera(d);
			b.iter(|| black_box(controller.cull(&camera).len()))
		});
	}
	group.finish();
}

// ============================================================================
// Buffer building
// ============================================================================

/// Full rebuild of a buffer from resident nodes.
fn bench_build(c: &mut Criterion) {
	let tree = PointCloudTree::try_load_from_disk(dataset_dir(), 10_000_000).expect("open tree");
	let ids: Vec<String> = tree.records().iter().take(512).map(|r| r.identifier().to_owned()).collect();
	tree.loader().load_immediate(ids.as_slice());

	let total = ids.len() as u64 * u64::from(POINTS_PER_NODE);
	let mut group = c.benchmark_group("buffer_build");
	group.throughput(Throughput::Elements(total));

	for steps in [1usize, 10] {
		let mut builder = BufferBuilder::new(Arc::clone(tree.loader()), total as usize, steps);
		group.bench_with_input(BenchmarkId::new("steps", steps), &steps, |b, &steps| {
			b.iter(|| {
				let mut valid = 0;
				for _ in 0..steps {
					valid = builder.get_populated_buffer(ids.as_slice()).1;
				}
				black_box(valid)
			})
		});
	}
	group.finish();
}

criterion_group!(benches, bench_cull, bench_build);
criterion_main!(benches);
