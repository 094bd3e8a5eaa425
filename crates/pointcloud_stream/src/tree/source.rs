//! Tree storage: a plain directory or a stored (uncompressed) ZIP archive.
//!
//! Both kinds resolve a file name (`index.pcindex`, `<identifier>.pcnode`) to
//! a byte range of one file on disk. Readers seek to the range and read it
//! directly, so archive entries are never extracted or copied.
//!
//! Archives may keep the tree under a folder (`<folder>/index.pcindex`);
//! entries outside that folder are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::index::IndexData;
use crate::constants::{INDEX_FILE_NAME, NODE_FILE_EXTENSION};
use crate::error::TreeLoadError;

/// A contiguous byte range of a file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRange {
	pub path: PathBuf,
	pub offset: u64,
	pub len: u64,
}

impl FileRange {
	/// Open the file positioned at the start of the range.
	pub fn open(&self) -> std::io::Result<File> {
		let mut file = File::open(&self.path)?;
		file.seek(SeekFrom::Start(self.offset))?;
		Ok(file)
	}

	/// Read the whole range into memory.
	pub fn read_to_vec(&self) -> std::io::Result<Vec<u8>> {
		let len = usize::try_from(self.len).map_err(|_| std::io::Error::from(ErrorKind::OutOfMemory))?;
		let mut bytes = vec![0; len];
		self.open()?.read_exact(&mut bytes)?;
		Ok(bytes)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArchiveEntry {
	offset: u64,
	len: u64,
}

/// Entry table of a stored ZIP archive holding one tree.
#[derive(Clone, Debug)]
pub struct TreeArchive {
	path: PathBuf,
	entries: HashMap<String, ArchiveEntry>,
}

impl TreeArchive {
	/// Read the central directory of `path` and record where each file's data
	/// starts. With `folder`, only entries below `<folder>/` are kept and the
	/// folder prefix is stripped from their names.
	///
	/// Compressed entries are rejected: node data must be readable in place.
	pub fn open(path: &Path, folder: Option<&str>) -> Result<Self, TreeLoadError> {
		let file = File::open(path)?;
		let archive_len = file.metadata()?.len();
		let mut archive = ZipArchive::new(BufReader::new(file))?;
		let prefix = folder.map(|folder| format!("{}/", folder.trim_end_matches('/')));

		let mut entries = HashMap::with_capacity(archive.len());
		for i in 0..archive.len() {
			let entry = archive.by_index_raw(i)?;
			if entry.is_dir() {
				continue;
			}
			let name = match &prefix {
				Some(prefix) => match entry.name().strip_prefix(prefix.as_str()) {
					Some(name) => name,
					None => continue,
				},
				None => entry.name(),
			};
			if entry.compression() != CompressionMethod::Stored {
				return Err(TreeLoadError::CompressedEntry(entry.name().to_owned()));
			}

			let range = ArchiveEntry {
				offset: entry.data_start(),
				len: entry.size(),
			};
			if range.offset.checked_add(range.len).map_or(true, |end| end > archive_len) {
				return Err(TreeLoadError::TruncatedEntry(entry.name().to_owned()));
			}
			entries.insert(name.to_owned(), range);
		}

		tracing::debug!(path = %path.display(), entries = entries.len(), "read tree archive directory");
		Ok(Self {
			path: path.to_path_buf(),
			entries,
		})
	}

	#[inline]
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Number of files found for the tree.
	#[inline]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Byte range of a stored file, `None` when the archive lacks it.
	pub fn entry(&self, name: &str) -> Option<FileRange> {
		self.entries.get(name).map(|entry| FileRange {
			path: self.path.clone(),
			offset: entry.offset,
			len: entry.len,
		})
	}
}

/// Where the index and node files of a tree are read from.
#[derive(Clone, Debug)]
pub enum TreeSource {
	Directory(PathBuf),
	Archive(TreeArchive),
}

impl TreeSource {
	/// A regular file is opened as an archive with the tree at its top level;
	/// anything else is treated as a tree directory.
	pub fn open(path: &Path) -> Result<Self, TreeLoadError> {
		if path.is_file() {
			Ok(Self::Archive(TreeArchive::open(path, None)?))
		} else {
			Ok(Self::Directory(path.to_path_buf()))
		}
	}

	/// Directory or archive file backing the tree.
	pub fn path(&self) -> &Path {
		match self {
			Self::Directory(dir) => dir,
			Self::Archive(archive) => archive.path(),
		}
	}

	#[inline]
	pub fn is_archive(&self) -> bool {
		matches!(self, Self::Archive(_))
	}

	/// Path used to name a file of this tree in messages.
	pub fn display_path(&self, name: &str) -> PathBuf {
		self.path().join(name)
	}

	/// Resolve a file of the tree. Missing files fail with `NotFound`.
	pub fn locate(&self, name: &str) -> std::io::Result<FileRange> {
		match self {
			Self::Directory(dir) => {
				let path = dir.join(name);
				let len = std::fs::metadata(&path)?.len();
				Ok(FileRange { path, offset: 0, len })
			}
			Self::Archive(archive) => archive.entry(name).ok_or_else(|| {
				std::io::Error::new(
					ErrorKind::NotFound,
					format!("{name} is not stored in {}", archive.path().display()),
				)
			}),
		}
	}

	/// Read and parse the tree's index.
	pub fn read_index(&self) -> Result<IndexData, TreeLoadError> {
		let range = match self.locate(INDEX_FILE_NAME) {
			Ok(range) => range,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				return Err(TreeLoadError::MissingIndex(self.display_path(INDEX_FILE_NAME)));
			}
			Err(e) => return Err(e.into()),
		};
		IndexData::from_bytes(&range.read_to_vec()?)
	}
}

/// Pack the index and node files of a tree directory into a stored ZIP
/// archive, optionally below `folder`. Entries are written in name order.
pub fn write_archive(dir: &Path, archive_path: &Path, folder: Option<&str>) -> ZipResult<()> {
	let mut names = Vec::new();
	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		if !entry.file_type()?.is_file() {
			continue;
		}
		let Ok(name) = entry.file_name().into_string() else {
			continue;
		};
		let is_node = Path::new(&name).extension().is_some_and(|ext| ext == NODE_FILE_EXTENSION);
		if name == INDEX_FILE_NAME || is_node {
			names.push(name);
		}
	}
	names.sort();

	let mut zip = ZipWriter::new(File::create(archive_path)?);
	for name in names {
		let bytes = std::fs::read(dir.join(&name))?;
		let options = SimpleFileOptions::default()
			.compression_method(CompressionMethod::Stored)
			.large_file(bytes.len() as u64 >= u64::from(u32::MAX));
		let entry_name = match folder {
			Some(folder) => format!("{}/{name}", folder.trim_end_matches('/')),
			None => name,
		};
		zip.start_file(entry_name, options)?;
		zip.write_all(&bytes)?;
	}
	zip.finish()?;
	Ok(())
}

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;
