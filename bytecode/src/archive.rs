/*
    This file is part of Stubify.

    Stubify is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    Stubify is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with Stubify. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
*/
//! Stubbing every class of a jar or any other zip archive.
//!
//! Entries are read in order, transformed in parallel, and written back in their original order.
//! Class entries are stubbed. Everything else is copied byte for byte unless resources are skipped.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::constants::CLASS_SUFFIX;
use crate::{ClassFile, Stubber};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Input archive {} does not exist", .0.display())]
    InputNotFound(PathBuf),
    #[error("Malformed class file {entry}")]
    MalformedClassFile {
        entry: String,
        #[source]
        source: crate::Error,
    },
    /// Stubbing or writing a class failed even though it was read fine.
    #[error("Unable to write class file {entry}")]
    UnwritableConstantPool {
        entry: String,
        #[source]
        source: crate::Error,
    },
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// How an archive is rewritten.
#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    /// Store entries uncompressed instead of deflating them.
    pub store: bool,
    /// Leave out every entry that is not a class.
    pub skip_resources: bool,
    /// Worker threads, or the rayon default when `None`.
    pub threads: Option<usize>,
    pub stubber: Stubber,
}

/// An entry as read from the input archive.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
    pub last_modified: Option<DateTime>,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntryKind {
    Class,
    Resource,
    Directory,
}

/// An entry ready to be written to the output archive.
#[derive(Clone, Debug)]
pub struct TransformedEntry {
    pub name: String,
    pub bytes: Vec<u8>,
    pub size: u64,
    /// CRC-32 of `bytes`, computed when entries are stored.
    pub checksum: Option<u32>,
    pub last_modified: Option<DateTime>,
    pub unix_mode: Option<u32>,
    pub kind: EntryKind,
}

/// What a run did.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ArchiveSummary {
    pub classes: usize,
    pub resources: usize,
    pub directories: usize,
    /// Entries left out because resources were skipped.
    pub skipped: usize,
}

/// Parses, stubs and re-serializes one class file.
pub fn stub_class(name: &str, bytes: &[u8], stubber: &Stubber) -> Result<Vec<u8>, ArchiveError> {
    let mut class = ClassFile::parse(bytes).map_err(|source| ArchiveError::MalformedClassFile {
        entry: name.to_owned(),
        source,
    })?;
    stubber
        .stub(&mut class)
        .and_then(|_| class.to_bytes())
        .map_err(|source| ArchiveError::UnwritableConstantPool {
            entry: name.to_owned(),
            source,
        })
}

/// Transforms one entry. Returns `None` when the entry is left out of the output.
pub fn transform_entry(
    entry: ArchiveEntry,
    options: &ArchiveOptions,
) -> Result<Option<TransformedEntry>, ArchiveError> {
    let kind = if entry.is_dir {
        EntryKind::Directory
    } else if entry.name.ends_with(CLASS_SUFFIX) {
        EntryKind::Class
    } else {
        EntryKind::Resource
    };
    let bytes = match kind {
        EntryKind::Class => {
            info!("Processing {}", entry.name);
            stub_class(&entry.name, &entry.bytes, &options.stubber)?
        }
        _ if options.skip_resources => {
            debug!(entry = %entry.name, "skipping resource");
            return Ok(None);
        }
        _ => entry.bytes,
    };
    let checksum = options.store.then(|| crc32fast::hash(&bytes));
    Ok(Some(TransformedEntry {
        name: entry.name,
        size: bytes.len() as u64,
        bytes,
        checksum,
        last_modified: entry.last_modified,
        unix_mode: entry.unix_mode,
        kind,
    }))
}

/// Reads every entry of an archive into memory, in archive order.
pub fn read_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        entries.push(ArchiveEntry {
            name: file.name().to_owned(),
            bytes,
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
            is_dir: file.is_dir(),
        });
    }
    Ok(entries)
}

fn transform_all(
    entries: Vec<ArchiveEntry>,
    options: &ArchiveOptions,
) -> Result<Vec<Option<TransformedEntry>>, ArchiveError> {
    entries
        .into_par_iter()
        .map(|entry| transform_entry(entry, options))
        .collect::<Result<Vec<_>, _>>()
}

fn write_entries(
    output: &Path,
    entries: &[TransformedEntry],
    store: bool,
) -> Result<(), ArchiveError> {
    let method = if store {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflated
    };
    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));
    for entry in entries {
        // an entry without a usable timestamp gets the zip epoch rather than the current time
        let mut options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(entry.last_modified.unwrap_or_default())
            .large_file(entry.size > u32::MAX as u64);
        if let Some(mode) = entry.unix_mode {
            options = options.unix_permissions(mode);
        }
        match entry.kind {
            EntryKind::Directory => writer.add_directory(entry.name.as_str(), options)?,
            EntryKind::Class | EntryKind::Resource => {
                debug_assert_eq!(entry.size, entry.bytes.len() as u64);
                if let Some(checksum) = entry.checksum {
                    debug_assert_eq!(checksum, crc32fast::hash(&entry.bytes));
                }
                writer.start_file(entry.name.as_str(), options)?;
                writer.write_all(&entry.bytes)?;
            }
        }
    }
    writer.finish()?.flush()?;
    Ok(())
}

fn run(
    input: &Path,
    output: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, ArchiveError> {
    let entries = {
        let mut archive = ZipArchive::new(BufReader::new(File::open(input)?))?;
        read_entries(&mut archive)?
    };
    let total = entries.len();
    debug!(entries = total, "read input archive");

    let transformed = match options.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(|| transform_all(entries, options))?,
        None => transform_all(entries, options)?,
    };
    let transformed: Vec<_> = transformed.into_iter().flatten().collect();

    write_entries(output, &transformed, options.store)?;

    let mut summary = ArchiveSummary {
        skipped: total - transformed.len(),
        ..ArchiveSummary::default()
    };
    for entry in &transformed {
        match entry.kind {
            EntryKind::Class => summary.classes += 1,
            EntryKind::Resource => summary.resources += 1,
            EntryKind::Directory => summary.directories += 1,
        }
    }
    Ok(summary)
}

/// Stubs every class in `input` and writes the result to `output`.
///
/// The parent directories of `output` are created and an existing `output` is replaced.
/// If anything fails, no output archive is left behind.
pub fn stubify_archive(
    input: &Path,
    output: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, ArchiveError> {
    if !input.exists() {
        return Err(ArchiveError::InputNotFound(input.to_owned()));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if output.exists() {
        fs::remove_file(output)?;
    }
    match run(input, output, options) {
        Ok(summary) => {
            info!(
                classes = summary.classes,
                resources = summary.resources,
                directories = summary.directories,
                skipped = summary.skipped,
                "Done"
            );
            Ok(summary)
        }
        Err(e) => {
            if output.exists() {
                let _ = fs::remove_file(output);
            }
            Err(e)
        }
    }
}
