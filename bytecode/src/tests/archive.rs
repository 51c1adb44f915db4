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
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::FOO;
use crate::archive::*;
use crate::constants::insn::ATHROW;
use crate::prelude::*;

const README: &[u8] = b"not a class\n";

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    writer
        .add_directory("META-INF/", SimpleFileOptions::default())
        .unwrap();
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

fn read_jar(path: &Path) -> Vec<(String, Vec<u8>, CompressionMethod, u32)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut bytes = vec![];
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_owned(), bytes, file.compression(), file.crc32())
        })
        .collect()
}

#[test]
fn test_store_mode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out").join("nested").join("out.jar");
    write_jar(&input, &[("Foo.class", FOO.as_slice()), ("readme.txt", README)]);

    let options = ArchiveOptions {
        store: true,
        ..ArchiveOptions::default()
    };
    let summary = stubify_archive(&input, &output, &options).unwrap();
    assert_eq!(
        summary,
        ArchiveSummary {
            classes: 1,
            resources: 1,
            directories: 1,
            skipped: 0
        }
    );

    let entries = read_jar(&output);
    let names: Vec<_> = entries.iter().map(|e| e.0.as_str()).collect();
    assert_eq!(names, ["META-INF/", "Foo.class", "readme.txt"]);

    let (_, class, method, crc) = &entries[1];
    assert_eq!(*method, CompressionMethod::Stored);
    assert_eq!(*crc, crc32fast::hash(class));
    let class = ClassFile::parse(class).unwrap();
    assert!(class
        .methods
        .iter()
        .filter_map(Method::code)
        .all(|c| c.code[7] == ATHROW));

    let (_, readme, method, _) = &entries[2];
    assert_eq!(readme.as_slice(), README);
    assert_eq!(*method, CompressionMethod::Stored);
}

#[test]
fn test_deflate_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    write_jar(&input, &[("Foo.class", FOO.as_slice())]);

    let options = ArchiveOptions {
        threads: Some(2),
        ..ArchiveOptions::default()
    };
    stubify_archive(&input, &output, &options).unwrap();
    let entries = read_jar(&output);
    assert_eq!(entries[1].2, CompressionMethod::Deflated);
}

#[test]
fn test_transform_entry() {
    let options = ArchiveOptions {
        store: true,
        ..ArchiveOptions::default()
    };
    let entry = ArchiveEntry {
        name: "Foo.class".into(),
        bytes: FOO.clone(),
        last_modified: None,
        unix_mode: Some(0o100644),
        is_dir: false,
    };
    let out = transform_entry(entry, &options).unwrap().unwrap();
    assert_eq!(out.kind, EntryKind::Class);
    assert_eq!(out.size, out.bytes.len() as u64);
    assert_eq!(out.checksum, Some(crc32fast::hash(&out.bytes)));
    assert_eq!(out.unix_mode, Some(0o100644));

    let entry = ArchiveEntry {
        name: "a/b.properties".into(),
        bytes: README.to_vec(),
        last_modified: None,
        unix_mode: None,
        is_dir: false,
    };
    let out = transform_entry(entry.clone(), &ArchiveOptions::default()).unwrap().unwrap();
    assert_eq!(out.kind, EntryKind::Resource);
    assert_eq!(out.bytes, README);
    assert_eq!(out.checksum, None);

    let skip = ArchiveOptions {
        skip_resources: true,
        ..ArchiveOptions::default()
    };
    assert!(transform_entry(entry, &skip).unwrap().is_none());
}

fn read_metadata(path: &Path) -> Vec<(String, Option<DateTime>, Option<u32>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let file = archive.by_index(i).unwrap();
            (file.name().to_owned(), file.last_modified(), file.unix_mode())
        })
        .collect()
}

#[test]
fn test_timestamps_and_modes_survive() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    let time = DateTime::from_date_and_time(2001, 2, 3, 4, 5, 6).unwrap();
    let mut writer = ZipWriter::new(File::create(&input).unwrap());
    let entries = [("Foo.class", FOO.as_slice(), 0o640), ("run.sh", README, 0o755)];
    for (name, bytes, mode) in entries {
        let options = SimpleFileOptions::default()
            .last_modified_time(time)
            .unix_permissions(mode);
        writer.start_file(name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();

    let options = ArchiveOptions {
        store: true,
        ..ArchiveOptions::default()
    };
    stubify_archive(&input, &output, &options).unwrap();
    let before = read_metadata(&input);
    let after = read_metadata(&output);
    assert_eq!(after, before);
    assert_eq!(after[0].1, Some(time));
    assert_eq!(after[1].1, Some(time));
    assert_eq!(after[0].2.map(|m| m & 0o777), Some(0o640));
    assert_eq!(after[1].2.map(|m| m & 0o777), Some(0o755));
}

#[test]
fn test_unusable_timestamp_becomes_zip_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(&input, &[("Foo.class", FOO.as_slice())]);
    // zero the date of every central directory record, month 0 is not a valid DOS date
    let mut bytes = fs::read(&input).unwrap();
    let mut i = 0;
    while i + 16 <= bytes.len() {
        if bytes[i..i + 4] == *b"PK\x01\x02" {
            bytes[i + 12..i + 16].fill(0);
        }
        i += 1;
    }
    fs::write(&input, bytes).unwrap();
    assert!(read_metadata(&input).iter().all(|e| e.1.is_none()));

    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    stubify_archive(&input, &first, &ArchiveOptions::default()).unwrap();
    stubify_archive(&input, &second, &ArchiveOptions::default()).unwrap();
    assert!(read_metadata(&first)
        .iter()
        .all(|e| e.1 == Some(DateTime::default())));
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_skip_resources() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    write_jar(&input, &[("readme.txt", README), ("Foo.class", FOO.as_slice())]);

    let options = ArchiveOptions {
        skip_resources: true,
        ..ArchiveOptions::default()
    };
    let summary = stubify_archive(&input, &output, &options).unwrap();
    assert_eq!(summary.classes, 1);
    assert_eq!(summary.skipped, 2);
    let entries = read_jar(&output);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "Foo.class");
}

#[test]
fn test_malformed_class_names_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    write_jar(&input, &[("Foo.class", FOO.as_slice()), ("com/example/Bad.class", &b"nope"[..])]);
    fs::write(&output, b"stale").unwrap();

    match stubify_archive(&input, &output, &ArchiveOptions::default()) {
        Err(ArchiveError::MalformedClassFile { entry, source }) => {
            assert_eq!(entry, "com/example/Bad.class");
            assert!(source.is_malformed());
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(!output.exists());
}

#[test]
fn test_input_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.jar");
    let output = dir.path().join("out.jar");
    assert!(matches!(
        stubify_archive(&input, &output, &ArchiveOptions::default()),
        Err(ArchiveError::InputNotFound(path)) if path == input
    ));
    assert!(!output.exists());
}
