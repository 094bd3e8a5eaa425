use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use web_time::Instant;

use super::*;
use crate::point::PointCloudPoint;
use crate::test_utils::{test_points, write_tree, TempDir, TestNode};
use crate::tree::{IndexData, Octree, RecordTable, TreeSource, TreeType};

fn nodes() -> Vec<TestNode> {
	let size = Vec3::splat(2.0);
	vec![
		TestNode::new("r", 4, Vec3::ZERO, Vec3::splat(4.0)),
		TestNode::new("r0", 4, Vec3::splat(-1.0), size),
		TestNode::new("r1", 4, Vec3::new(1.0, -1.0, -1.0), size),
		TestNode::new("r2", 4, Vec3::new(-1.0, 1.0, -1.0), size),
		TestNode::new("r3", 3, Vec3::new(1.0, 1.0, -1.0), size),
	]
}

fn node(id: &str) -> TestNode {
	nodes().into_iter().find(|n| n.identifier == id).unwrap()
}

/// Loader with every node resident.
fn loaded(label: &str) -> (TempDir, Arc<NodeLoader>) {
	let dir = TempDir::new(label);
	write_tree(dir.path(), TreeType::Octree, &nodes());
	let index = IndexData::read_from_dir(dir.path()).unwrap();
	let records = Arc::new(RecordTable::build::<Octree>(index.nodes).unwrap());
	let loader = Arc::new(NodeLoader::new(Arc::new(TreeSource::Directory(dir.path().to_path_buf())), records, 1_000).unwrap());
	loader.load_immediate(&["r", "r0", "r1", "r2", "r3"]);
	(dir, loader)
}

fn expected_points(ids: &[&str]) -> Vec<PointCloudPoint> {
	ids.iter().flat_map(|id| test_points(&node(id))).collect()
}

// =========================================================================
// Completion
// =========================================================================

#[test]
fn test_step_target_is_exact_for_large_limits() {
	assert_eq!(step_target(1, 3, 100), 33);
	assert_eq!(step_target(2, 3, 100), 66);
	assert_eq!(step_target(3, 3, 100), 100);
	// f32 rounds 2^24 + 1 down to 2^24
	assert_eq!(step_target(1, 1, (1 << 24) + 1), (1 << 24) + 1);
	assert_eq!(step_target(1, 2, 100_000_001), 50_000_000);
	assert_eq!(step_target(7, 10, usize::MAX), (usize::MAX as u128 * 7 / 10) as usize);
}

/// `rebuild_steps` calls with a constant set publish every point, and the
/// immediate variant gives the same count in one call.
#[test]
fn test_rebuild_completes_after_all_steps() {
	let (_dir, loader) = loaded("complete");
	let ids = ["r", "r0", "r1", "r3"];

	let mut builder = BufferBuilder::new(Arc::clone(&loader), 100, 3);
	assert_eq!(builder.get_populated_buffer(&ids).1, 0);
	assert_eq!(builder.get_populated_buffer(&ids).1, 0);
	let (buffer, valid) = builder.get_populated_buffer(&ids);
	assert_eq!(valid, 15);
	assert_eq!(&buffer.as_slice()[..valid], expected_points(&ids).as_slice());

	let mut immediate = BufferBuilder::new(loader, 100, 3);
	assert_eq!(immediate.get_populated_buffer_immediate(&ids).1, 15);
}

/// Step k of n fills about k/n of the capacity.
#[test]
fn test_steps_amortize_copying() {
	let (_dir, loader) = loaded("amortize");
	let ids = ["r", "r0", "r1", "r2"];
	let mut builder = BufferBuilder::new(loader, 16, 4);

	for step in 1..=3 {
		builder.get_populated_buffer(&ids);
		assert_eq!(builder.constructed, 4 * step, "after step {step}");
		assert!(builder.is_busy());
	}
	assert_eq!(builder.get_populated_buffer(&ids).1, 16);
	assert!(!builder.is_busy());
}

/// A request made while busy does not disturb the snapshot being built.
#[test]
fn test_snapshot_kept_while_busy() {
	let (_dir, loader) = loaded("snapshot");
	let mut builder = BufferBuilder::new(loader, 100, 2);

	builder.get_populated_buffer(&["r0"]);
	let (_, valid) = builder.get_populated_buffer(&["r1", "r2", "r3"]);
	assert_eq!(valid, 4, "first rebuild contained only r0");

	builder.get_populated_buffer(&["r1", "r2", "r3"]);
	let (_, valid) = builder.get_populated_buffer(&["r1", "r2", "r3"]);
	assert_eq!(valid, 11);
}

/// The published buffer is not written while the next one is built.
#[test]
fn test_ready_buffer_untouched_during_rebuild() {
	let (_dir, loader) = loaded("double_buffer");
	let mut builder = BufferBuilder::new(loader, 8, 2);

	builder.get_populated_buffer_immediate(&["r0", "r1"]);
	let before = builder.ready_buffer().0.as_slice().to_vec();

	let (buffer, valid) = builder.get_populated_buffer(&["r2", "r"]);
	assert_eq!(valid, 8);
	assert_eq!(buffer.as_slice(), before.as_slice());

	let (buffer, valid) = builder.get_populated_buffer(&["r2", "r"]);
	assert_eq!(valid, 8);
	assert_eq!(&buffer.as_slice()[..8], expected_points(&["r2", "r"]).as_slice());
}

#[test]
fn test_immediate_discards_rebuild_in_progress() {
	let (_dir, loader) = loaded("immediate_discard");
	let mut builder = BufferBuilder::new(loader, 100, 5);

	builder.get_populated_buffer(&["r0", "r1"]);
	assert!(builder.is_busy());
	let (_, valid) = builder.get_populated_buffer_immediate(&["r3"]);
	assert_eq!(valid, 3);
	assert!(!builder.is_busy());
}

#[test]
fn test_zero_steps_treated_as_one() {
	let (_dir, loader) = loaded("zero_steps");
	let mut builder = BufferBuilder::new(loader, 100, 0);
	assert_eq!(builder.rebuild_steps(), 1);
	assert_eq!(builder.get_populated_buffer(&["r0"]).1, 4);
}

// =========================================================================
// Partial data
// =========================================================================

/// Requested nodes beyond capacity are dropped, never overflowing.
#[test]
fn test_truncation_never_overflows() {
	let (_dir, loader) = loaded("truncate");
	let mut builder = BufferBuilder::new(loader, 10, 2);
	let ids = ["r", "r0", "r1", "r2"];

	builder.get_populated_buffer(&ids);
	let (buffer, valid) = builder.get_populated_buffer(&ids);
	assert_eq!(valid, 8);
	assert!(valid <= buffer.capacity());

	assert_eq!(builder.get_populated_buffer_immediate(&ids).1, 8);
}

/// Nodes that are not resident are skipped, not waited for.
#[test]
fn test_missing_nodes_skipped() {
	let (_dir, loader) = loaded("skip_missing");
	let mut builder = BufferBuilder::new(loader, 100, 1);
	let (buffer, valid) = builder.get_populated_buffer(&["r0", "r7", "r3"]);
	assert_eq!(valid, 7);
	assert_eq!(&buffer.as_slice()[..7], expected_points(&["r0", "r3"]).as_slice());
}

#[test]
fn test_empty_request_publishes_nothing() {
	let (_dir, loader) = loaded("empty_request");
	let mut builder = BufferBuilder::new(loader, 100, 1);
	builder.get_populated_buffer(&["r0"]);
	let empty: [&str; 0] = [];
	assert_eq!(builder.get_populated_buffer(&empty).1, 0);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_dispose_releases_buffers() {
	let (_dir, loader) = loaded("dispose_builder");
	let mut builder = BufferBuilder::new(loader, 100, 1);
	builder.get_populated_buffer(&["r0"]);

	builder.dispose();
	assert!(builder.buffers.iter().all(HostPointBuffer::is_released));
	assert_eq!(builder.get_populated_buffer(&["r0"]).1, 0);
	builder.dispose();
}

#[test]
fn test_custom_allocator() {
	let (_dir, loader) = loaded("allocator");
	let mut allocated = Vec::new();
	let builder = BufferBuilder::with_allocator(loader, 32, 1, |capacity| {
		allocated.push(capacity);
		HostPointBuffer::new(capacity)
	});
	assert_eq!(allocated, vec![32, 32]);
	assert_eq!(builder.ready_buffer().0.capacity(), 32);
}

// =========================================================================
// TimedBufferBuilder
// =========================================================================

#[test]
fn test_timed_steps_once_per_interval() {
	let (_dir, loader) = loaded("timed");
	let interval = Duration::from_millis(10);
	let mut timed = TimedBufferBuilder::new(BufferBuilder::new(loader, 100, 2), interval);
	let t0 = Instant::now();

	assert!(!timed.request(&["r0", "r1"], t0));
	assert!(timed.inner().is_busy());

	// Coalesced: inside the interval nothing happens.
	assert!(!timed.poll(t0 + Duration::from_millis(3)));
	assert!(!timed.request(&["r0", "r1"], t0 + Duration::from_millis(6)));
	assert!(timed.inner().is_busy());

	assert!(timed.poll(t0 + interval));
	assert_eq!(timed.ready_buffer().1, 8);
}

/// A request parked during a rebuild runs after the swap and completes.
#[test]
fn test_timed_eventually_completes_latest_request() {
	let (_dir, loader) = loaded("timed_latest");
	let interval = Duration::from_millis(5);
	let mut timed = TimedBufferBuilder::new(BufferBuilder::new(loader, 100, 3), interval);
	let t0 = Instant::now();

	timed.request(&["r0"], t0);
	timed.request(&["r1"], t0 + interval);
	timed.request(&["r3"], t0 + interval * 2);
	assert_eq!(timed.ready_buffer().1, 4, "first rebuild finished with r0");

	let mut now = t0 + interval * 2;
	for _ in 0..3 {
		now += interval;
		timed.poll(now);
	}
	assert!(timed.is_idle());
	assert_eq!(timed.ready_buffer().1, 3, "latest request r3 built");
}

#[test]
fn test_timed_from_config() {
	let (_dir, loader) = loaded("timed_config");
	let config = crate::config::StreamingConfig {
		point_limit: 64,
		rebuild_steps: 1,
		min_step_interval: Duration::from_millis(40),
		..Default::default()
	};
	let mut timed = TimedBufferBuilder::from_config(loader, &config);
	assert_eq!(timed.min_step_interval(), Duration::from_millis(40));
	assert_eq!(timed.inner().max_buffer_elements(), 64);

	// Single-step rebuilds publish on the first poll.
	assert!(timed.request(&["r2", "r3"], Instant::now()));
	assert_eq!(timed.ready_buffer().1, 7);
	assert!(timed.is_idle());
}
