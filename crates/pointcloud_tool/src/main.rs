//! `pcstream` - command line front end for the point cloud streaming engine.
//!
//! - `inspect <PATH>`: summary of a tree directory or archive
//! - `synth <DIR>`: write a deterministic synthetic tree
//! - `pack <DIR> <ARCHIVE>`: pack a tree directory into a stored ZIP archive
//! - `stream --config <FILE>`: headless streaming session
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for loader events.

mod config;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pointcloud_stream::synth::SyntheticTree;
use pointcloud_stream::tree::write_archive;
use pointcloud_stream::{PointCloudTree, TreeType};

use config::SessionConfig;

/// Out-of-core point cloud streaming tool.
#[derive(Parser, Debug)]
#[command(name = "pcstream")]
#[command(about = "Inspect, generate and stream out-of-core point cloud trees")]
struct Args {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print type, node count, depth, total points and bounds of a tree.
	Inspect {
		/// Tree directory (contains index.pcindex) or stored ZIP archive.
		path: PathBuf,
		/// Folder holding the tree inside the archive.
		#[arg(long)]
		folder: Option<String>,
	},
	/// Generate a full synthetic tree.
	Synth {
		/// Output directory.
		dir: PathBuf,
		/// Levels below the root.
		#[arg(short, long, default_value_t = 3)]
		depth: usize,
		/// Points stored in every node.
		#[arg(short, long, default_value_t = 4096)]
		points_per_node: u32,
		/// Generate a quadtree instead of an octree.
		#[arg(long)]
		quadtree: bool,
		/// Seed for point positions and colors.
		#[arg(long)]
		seed: Option<u64>,
	},
	/// Pack a tree directory into a stored (uncompressed) ZIP archive.
	Pack {
		/// Tree directory.
		dir: PathBuf,
		/// Archive to create.
		archive: PathBuf,
		/// Place the tree below this folder inside the archive.
		#[arg(long)]
		folder: Option<String>,
	},
	/// Run a headless streaming session.
	Stream {
		/// Path to session configuration TOML file.
		#[arg(short, long)]
		config: PathBuf,
	},
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	match args.command {
		Command::Inspect { path, folder } => inspect(&path, folder.as_deref()),
		Command::Synth {
			dir,
			depth,
			points_per_node,
			quadtree,
			seed,
		} => {
			let tree_type = if quadtree { TreeType::Quadtree } else { TreeType::Octree };
			let mut synth = SyntheticTree::new(tree_type, depth, points_per_node);
			if let Some(seed) = seed {
				synth.seed = seed;
			}
			let index = synth
				.write_to_dir(&dir)
				.with_context(|| format!("Failed to write synthetic tree: {}", dir.display()))?;
			println!("Wrote {} {} nodes to {}", index.nodes.len(), tree_type, dir.display());
			Ok(())
		}
		Command::Pack { dir, archive, folder } => {
			write_archive(&dir, &archive, folder.as_deref())
				.with_context(|| format!("Failed to pack {} into {}", dir.display(), archive.display()))?;
			// Re-open to check the archive is streamable.
			let tree = PointCloudTree::try_load_from_archive(&archive, folder.as_deref(), 1)
				.with_context(|| format!("Packed archive does not open: {}", archive.display()))?;
			println!("Packed {} nodes into {}", tree.records().len(), archive.display());
			Ok(())
		}
		Command::Stream { config } => {
			println!("Loading config from: {}", config.display());
			let config = SessionConfig::load(&config)?;
			session::run(&config)
		}
	}
}

fn inspect(path: &std::path::Path, folder: Option<&str>) -> Result<()> {
	// Node data is never requested here.
	let tree = match folder {
		Some(folder) => PointCloudTree::try_load_from_archive(path, Some(folder), 1),
		None => PointCloudTree::try_load_from_disk(path, 1),
	}
	.with_context(|| format!("Failed to open tree: {}", path.display()))?;
	let records = tree.records();
	let bounds = tree.bounds();

	println!("Path:         {}", tree.path_on_disk().display());
	println!("Archive:      {}", tree.source().is_archive());
	println!("Type:         {}", tree.tree_type());
	println!("Nodes:        {}", records.len());
	println!("Depth:        {}", records.max_depth());
	println!("Total points: {}", records.total_points());
	println!("Leaf nodes:   {}", records.iter().filter(|r| r.is_leaf()).count());
	println!("Bounds:       center {:?} size {:?}", bounds.center, bounds.size);
	Ok(())
}
