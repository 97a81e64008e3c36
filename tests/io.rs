//! Tests for stage input resolution and output layout.

use logbeam::codec::RecordCodec;
use logbeam::diagnostics::MemorySink;
use logbeam::io::{
    SUCCESS_MARKER, create_output_dir, expand_input, mark_success, part_path, read_lines,
    read_records, remove_output, write_encoded_part, write_text_part,
};
use logbeam::record::Location;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_directory_input_skips_markers_and_hidden_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.log"), "b").unwrap();
    fs::write(tmp.path().join("a.log"), "a").unwrap();
    fs::write(tmp.path().join(SUCCESS_MARKER), "").unwrap();
    fs::write(tmp.path().join(".crc"), "").unwrap();
    fs::create_dir(tmp.path().join("nested")).unwrap();

    let files = expand_input(tmp.path()).unwrap();
    assert_eq!(files, vec![tmp.path().join("a.log"), tmp.path().join("b.log")]);
}

#[test]
fn test_glob_and_single_file_input() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("x1.log"), "1\n2").unwrap();
    fs::write(tmp.path().join("x2.log"), "3").unwrap();
    fs::write(tmp.path().join("y.txt"), "4").unwrap();

    let pattern = tmp.path().join("x*.log");
    let files = expand_input(&pattern).unwrap();
    assert_eq!(files.len(), 2);
    let input = read_lines(&files, &MemorySink::new()).unwrap();
    assert_eq!(input.lines, vec!["1", "2", "3"]);
    assert_eq!(input.undecodable, 0);

    let single = expand_input(&tmp.path().join("y.txt")).unwrap();
    assert_eq!(single, vec![tmp.path().join("y.txt")]);
}

#[test]
fn test_empty_match_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(expand_input(&tmp.path().join("*.none")).is_err());
    assert!(expand_input(tmp.path()).is_err());
}

#[test]
fn test_output_directory_must_be_new() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("stage");
    create_output_dir(&dir).unwrap();
    assert!(create_output_dir(&dir).is_err());
}

#[test]
fn test_part_files_and_marker() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("stage");
    create_output_dir(&dir).unwrap();

    let records = vec![
        Location::new("10001", "", "NY", "", ""),
        Location::new("00501", "", "NY", "", ""),
    ];
    let encoded: Vec<Vec<u8>> = records.iter().map(|r| r.to_bytes().unwrap()).collect();
    let written = write_encoded_part(&dir, 0, encoded.iter().map(Vec::as_slice)).unwrap();
    assert_eq!(written, encoded.iter().map(|b| b.len() as u64).sum::<u64>());
    assert_eq!(write_text_part(&dir, 1, ["a", "b"]).unwrap(), 2);
    mark_success(&dir).unwrap();

    assert_eq!(part_path(&dir, 0), dir.join("part-r-00000"));
    assert_eq!(
        fs::read(part_path(&dir, 0)).unwrap(),
        encoded.concat()
    );
    assert_eq!(fs::read_to_string(part_path(&dir, 1)).unwrap(), "a\nb\n");
    assert!(dir.join(SUCCESS_MARKER).exists());

    let back: Vec<Location> = read_records(&[part_path(&dir, 0)]).unwrap();
    assert_eq!(back, records);

    remove_output(&dir).unwrap();
    assert!(!dir.exists());
    remove_output(&dir).unwrap();
}

#[test]
fn test_undecodable_lines_are_skipped_with_warning() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mixed.log");
    fs::write(&path, b"first\r\nbad \xff\xfe bytes\nthird\nref=caf\xe9").unwrap();

    let sink = MemorySink::new();
    let input = read_lines(&[path], &sink).unwrap();
    assert_eq!(input.lines, vec!["first", "third"]);
    assert_eq!(input.undecodable, 2);

    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].message.contains("bad"));
    assert!(warnings[0].cause.as_deref().unwrap().contains("line 2"));
    assert!(warnings[1].message.contains("ref=caf"));
}
