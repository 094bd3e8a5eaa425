//! NodeLoader - background streaming of node point blocks.
//!
//! One loader per tree. The render thread calls [`NodeLoader::request_load`]
//! with the identifiers it wants this frame; a single worker thread reads the
//! matching `.pcnode` data from the tree's [`TreeSource`] and publishes each block only once it has been
//! read completely. Readers never observe a partially filled block.
//!
//! # Budget
//!
//! The sum of point counts of `InMemory` nodes is kept under `point_budget`.
//! When a request would exceed it, resident nodes that are not part of the
//! request are evicted. Nodes in the current request are never evicted, so
//! the budget is exceeded when the request alone is larger than it.
//!
//! # Locking
//!
//! - `table`: node table and resident count. Held briefly by the render
//!   thread and by the worker when publishing.
//! - `shutdown`: held by the worker while it processes one job, so that
//!   [`NodeLoader::dispose`] waits for an in-flight read to finish.
//!
//! Lock order is always `shutdown` then `table`.

pub mod io;
pub mod node;

pub use node::{Node, NodeDataState};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use bytemuck::Zeroable;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rayon::prelude::*;

use crate::constants::LOADER_POLL_INTERVAL;
use crate::point::PointCloudPoint;
use crate::tree::{RecordTable, TreeSource};

/// A read request for the worker. The block is allocated by the requester.
struct LoadJob {
	identifier: String,
	block: Box<[PointCloudPoint]>,
}

#[derive(Default)]
struct NodeTable {
	nodes: HashMap<String, Node>,
	/// Sum of point counts of `InMemory` nodes.
	resident_points: u64,
}

struct LoaderShared {
	source: Arc<TreeSource>,
	records: Arc<RecordTable>,
	point_budget: u64,
	table: Mutex<NodeTable>,
	shutdown: Mutex<()>,
	cancel: AtomicBool,
}

/// Streams node point blocks from disk on a background thread.
pub struct NodeLoader {
	shared: Arc<LoaderShared>,
	jobs: Sender<LoadJob>,
	worker: Mutex<Option<JoinHandle<()>>>,
	disposed: AtomicBool,
}

/// Every critical section leaves the table consistent, so a poisoned lock is
/// still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NodeLoader {
	/// Start a loader for the tree stored in `source`.
	pub fn new(source: Arc<TreeSource>, records: Arc<RecordTable>, point_budget: u64) -> std::io::Result<Self> {
		let shared = Arc::new(LoaderShared {
			source,
			records,
			point_budget,
			table: Mutex::new(NodeTable::default()),
			shutdown: Mutex::new(()),
			cancel: AtomicBool::new(false),
		});
		let (jobs, queue) = crossbeam_channel::unbounded();
		let worker_shared = Arc::clone(&shared);
		let worker = std::thread::Builder::new()
			.name("pointcloud-loader".into())
			.spawn(move || worker_loop(&worker_shared, &queue))?;

		Ok(Self {
			shared,
			jobs,
			worker: Mutex::new(Some(worker)),
			disposed: AtomicBool::new(false),
		})
	}

	// =========================================================================
	// Requests
	// =========================================================================

	/// Ensure every identifier is tracked and queued for loading.
	///
	/// Non-blocking. Identifiers already tracked (in any state) are skipped,
	/// as are identifiers unknown to the tree. If the new nodes would push the
	/// resident total over the budget, unrequested resident nodes are evicted
	/// first.
	#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(count = identifiers.len())))]
	pub fn request_load<S: AsRef<str>>(&self, identifiers: &[S]) {
		if self.is_disposed() {
			return;
		}

		let mut queued = Vec::new();
		{
			let mut table = lock(&self.shared.table);
			let mut incoming = 0u64;

			for id in identifiers {
				let id = id.as_ref();
				if let Some(count) = self.track(&mut table, id) {
					incoming += u64::from(count);
					queued.push(LoadJob {
						identifier: id.to_owned(),
						block: allocate_block(count),
					});
				}
			}

			if table.resident_points + incoming > self.shared.point_budget {
				let protected: HashSet<&str> = identifiers.iter().map(AsRef::as_ref).collect();
				evict(&mut table, &protected, incoming, self.shared.point_budget);
			}
		}

		for job in queued {
			// The receiver only goes away after dispose.
			if self.jobs.send(job).is_err() {
				break;
			}
		}
	}

	/// Load every requested node on the calling thread before returning.
	///
	/// Nodes already `InMemory` are kept; everything else that has points is
	/// read in parallel with the same byte-exact checks as the worker. Eviction
	/// then runs as for [`request_load`](Self::request_load).
	#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(count = identifiers.len())))]
	pub fn load_immediate<S: AsRef<str>>(&self, identifiers: &[S]) {
		if self.is_disposed() {
			return;
		}

		let mut wanted: Vec<(String, u32)> = Vec::new();
		{
			let mut table = lock(&self.shared.table);
			for id in identifiers {
				let id = id.as_ref();
				if let Some(count) = self.track(&mut table, id) {
					wanted.push((id.to_owned(), count));
				} else if let Some(node) = table.nodes.get(id) {
					if node.state() == NodeDataState::Loading {
						wanted.push((id.to_owned(), node.point_count()));
					}
				}
			}
		}

		let source = self.shared.source.as_ref();
		let loaded: Vec<(String, Box<[PointCloudPoint]>)> = wanted
			.into_par_iter()
			.filter_map(|(id, count)| {
				let mut block = allocate_block(count);
				match io::read_node_points(source, &id, &mut block) {
					Ok(()) => Some((id, block)),
					Err(e) => {
						tracing::error!(identifier = %id, error = %e, "failed to load node");
						None
					}
				}
			})
			.collect();

		let mut table = lock(&self.shared.table);
		if self.shared.cancel.load(Ordering::Acquire) {
			return;
		}
		for (id, block) in loaded {
			publish(&mut table, &id, block);
		}
		if table.resident_points > self.shared.point_budget {
			let protected: HashSet<&str> = identifiers.iter().map(AsRef::as_ref).collect();
			evict(&mut table, &protected, 0, self.shared.point_budget);
		}
	}

	/// Start tracking `id`. Returns the point count when a load is needed.
	fn track(&self, table: &mut NodeTable, id: &str) -> Option<u32> {
		if table.nodes.contains_key(id) {
			return None;
		}
		let Some(record) = self.shared.records.record(id) else {
			tracing::warn!(identifier = id, "requested node is not part of the tree");
			return None;
		};

		let count = record.point_count();
		if count == 0 {
			table.nodes.insert(id.to_owned(), Node::empty(id.to_owned()));
			return None;
		}
		table.nodes.insert(id.to_owned(), Node::loading(id.to_owned(), count));
		Some(count)
	}

	// =========================================================================
	// Queries
	// =========================================================================

	/// Run `f` on a node if it is `InMemory`.
	///
	/// The table lock is held while `f` runs; keep it short.
	pub fn try_get_node<R>(&self, identifier: &str, f: impl FnOnce(&Node) -> R) -> Option<R> {
		let table = lock(&self.shared.table);
		table
			.nodes
			.get(identifier)
			.filter(|node| node.state() == NodeDataState::InMemory)
			.map(f)
	}

	/// State of a tracked node, `None` when untracked.
	pub fn node_state(&self, identifier: &str) -> Option<NodeDataState> {
		lock(&self.shared.table).nodes.get(identifier).map(Node::state)
	}

	/// Sum of point counts over `InMemory` nodes.
	pub fn resident_points(&self) -> u64 {
		lock(&self.shared.table).resident_points
	}

	/// Number of tracked nodes in any state.
	pub fn tracked_nodes(&self) -> usize {
		lock(&self.shared.table).nodes.len()
	}

	/// Jobs queued for the worker and not picked up yet.
	pub fn pending_jobs(&self) -> usize {
		self.jobs.len()
	}

	#[inline]
	pub fn point_budget(&self) -> u64 {
		self.shared.point_budget
	}

	#[inline]
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	// =========================================================================
	// Teardown
	// =========================================================================

	/// Stop the worker and release every node. Idempotent; repeated calls
	/// only log a warning.
	///
	/// Waits for an in-flight read to finish; its block is dropped instead of
	/// being published.
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			tracing::warn!("loader thread already stopped");
			return;
		}
		self.shared.cancel.store(true, Ordering::Release);

		{
			let _shutdown = lock(&self.shared.shutdown);
			let mut table = lock(&self.shared.table);
			for node in table.nodes.values_mut() {
				node.dispose();
			}
			table.nodes.clear();
			table.resident_points = 0;
		}

		if let Some(handle) = lock(&self.worker).take() {
			if handle.join().is_err() {
				tracing::error!("loader thread panicked");
			}
		}
	}
}

impl Drop for NodeLoader {
	fn drop(&mut self) {
		if !self.is_disposed() {
			self.dispose();
		}
	}
}

// =============================================================================
// Worker
// =============================================================================

fn worker_loop(shared: &LoaderShared, queue: &Receiver<LoadJob>) {
	loop {
		if shared.cancel.load(Ordering::Acquire) {
			break;
		}
		match queue.recv_timeout(LOADER_POLL_INTERVAL) {
			Ok(job) => process_job(shared, job),
			Err(RecvTimeoutError::Timeout) => continue,
			Err(RecvTimeoutError::Disconnected) => break,
		}
	}
	tracing::debug!(source = %shared.source.path().display(), "loader thread exiting");
}

fn process_job(shared: &LoaderShared, job: LoadJob) {
	let LoadJob { identifier, mut block } = job;
	let _shutdown = lock(&shared.shutdown);
	if shared.cancel.load(Ordering::Acquire) {
		return;
	}

	// Evicted or re-created since it was queued.
	let still_loading = lock(&shared.table)
		.nodes
		.get(&identifier)
		.is_some_and(|node| node.state() == NodeDataState::Loading);
	if !still_loading {
		return;
	}

	#[cfg(feature = "profiling")]
	let _span = tracing::info_span!("load_node", identifier = %identifier).entered();

	if let Err(e) = io::read_node_points(&shared.source, &identifier, &mut block) {
		tracing::error!(identifier = %identifier, error = %e, "failed to load node");
		return;
	}

	let mut table = lock(&shared.table);
	if shared.cancel.load(Ordering::Acquire) {
		return;
	}
	publish(&mut table, &identifier, block);
}

// =============================================================================
// Table helpers
// =============================================================================

fn allocate_block(count: u32) -> Box<[PointCloudPoint]> {
	vec![PointCloudPoint::zeroed(); count as usize].into_boxed_slice()
}

/// Move a `Loading` node to `InMemory`. Blocks for other states are dropped.
fn publish(table: &mut NodeTable, identifier: &str, block: Box<[PointCloudPoint]>) {
	let Some(node) = table.nodes.get_mut(identifier) else {
		return;
	};
	if node.publish(block) {
		let count = u64::from(node.point_count());
		table.resident_points += count;
		tracing::debug!(identifier, points = count, resident = table.resident_points, "node loaded");
	}
}

/// Evict unprotected `InMemory` nodes until `resident + incoming <= budget`
/// or no candidates remain. Order follows table iteration.
fn evict(table: &mut NodeTable, protected: &HashSet<&str>, incoming: u64, budget: u64) -> usize {
	let candidates: Vec<String> = table
		.nodes
		.values()
		.filter(|node| node.state() == NodeDataState::InMemory && !protected.contains(node.identifier()))
		.map(|node| node.identifier().to_owned())
		.collect();

	let mut evicted = 0;
	for id in candidates {
		if table.resident_points + incoming <= budget {
			break;
		}
		if let Some(mut node) = table.nodes.remove(&id) {
			table.resident_points -= u64::from(node.point_count());
			node.dispose();
			evicted += 1;
		}
	}

	tracing::debug!(
		evicted,
		resident = table.resident_points,
		incoming,
		budget,
		"evicted nodes over budget"
	);
	evicted
}
