use dseq_core::errors::codes;
use dseq_gen::PositionSource;
use tempfile::tempdir;


#[test]
fn entity_count_matches_qualifying_lines() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_positions(dir.path(), 4);
    let source = PositionSource::open(&path).unwrap();
    assert_eq!(source.entity_count().unwrap(), 4);
}

#[test]
fn rereading_yields_the_same_records() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_positions(dir.path(), 3);
    let source = PositionSource::open(&path).unwrap();
    let first = source.read_all().unwrap();
    let second = source.read_all().unwrap();
    assert_eq!(first, second);
    let indices: Vec<usize> = first.iter().map(|record| record.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(first[2].rotation.z, 30.0);
}

#[test]
fn missing_file_is_source_not_found() {
    let dir = tempdir().unwrap();
    let err = PositionSource::open(dir.path().join("absent.txt")).unwrap_err();
    assert!(err.info().is(codes::SOURCE_NOT_FOUND));
}

#[test]
fn non_utf8_lines_are_skipped_without_ending_the_pass() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("positions.txt");
    let mut body = b"0 1 1 0 1 1 1\n# g".to_vec();
    body.extend_from_slice(&[0xe9, b'n', 0xe9, b'r', 0xe9]);
    body.extend_from_slice(b" header\r\n0 2 2 0 1 1 1\r\n0 3 3 0 1 1 1\n");
    std::fs::write(&path, body).unwrap();

    let source = PositionSource::open(&path).unwrap();
    assert_eq!(source.entity_count().unwrap(), 3);
    let records = source.read_all().unwrap();
    assert_eq!(records[2].position.x, 3.0);
    assert_eq!(records[1].index, 1);
}
