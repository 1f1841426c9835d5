use std::io::Cursor;
use std::path::PathBuf;

use polars::prelude::*;

use crate::errors::ParserError;
use crate::{load_raw, parse_timestamp, parse_timestamps, read_raw_table};

const TIME_COLUMNS: [&str; 6] = [
    "Created time",
    "First response time",
    "Resolution time",
    "Close time",
    "Expected SLA to first response",
    "Expected SLA to resolve",
];

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(path)
}

fn micros(value: &str) -> i64 {
    parse_timestamp(value).unwrap_or_else(|| panic!("fixture timestamp '{value}' did not parse"))
}

#[test]
fn loads_fixture_with_trimmed_headers() {
    let df = load_raw(&fixture("tickets_valid.csv")).expect("load failed");

    assert_eq!(df.height(), 3);
    assert_eq!(df.width(), 12);
    assert_eq!(df.get_column_names()[0].as_str(), "Ticket ID");

    let labels = df.column("SLA For Resolution").unwrap().str().unwrap();
    assert_eq!(labels.get(1), Some(" Met "));
}

#[test]
fn missing_file_is_not_found() {
    let err = load_raw(&fixture("does_not_exist.csv")).unwrap_err();
    assert!(matches!(err, ParserError::NotFound { .. }));
    assert!(err.to_string().contains("does_not_exist.csv"));
}

#[test]
fn empty_cells_become_nulls() {
    let df = read_raw_table(Cursor::new("a,b\n1,\n, x \n")).unwrap();
    let a = df.column("a").unwrap().str().unwrap();
    let b = df.column("b").unwrap().str().unwrap();

    assert_eq!(a.get(0), Some("1"));
    assert_eq!(a.get(1), None);
    assert_eq!(b.get(0), None);
    assert_eq!(b.get(1), Some(" x "));
}

#[test]
fn whitespace_only_cells_are_null() {
    let df = read_raw_table(Cursor::new("Ticket ID,b\n   ,1\n7,\t\n")).unwrap();
    let ids = df.column("Ticket ID").unwrap().str().unwrap();
    let b = df.column("b").unwrap().str().unwrap();

    assert_eq!(ids.get(0), None);
    assert_eq!(ids.get(1), Some("7"));
    assert_eq!(b.get(1), None);
}

#[test]
fn header_only_input_gives_empty_frame() {
    let df = read_raw_table(Cursor::new("Ticket ID,Status\n")).unwrap();
    assert_eq!(df.height(), 0);
    assert_eq!(df.width(), 2);
}

#[test]
fn duplicate_trimmed_headers_are_rejected() {
    let err = read_raw_table(Cursor::new("Status, Status\nOpen,Open\n")).unwrap_err();
    match err {
        ParserError::DuplicateColumn { column } => assert_eq!(column, "Status"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ragged_rows_are_csv_errors() {
    let err = read_raw_table(Cursor::new("a,b\n1,2\n3\n")).unwrap_err();
    assert!(matches!(err, ParserError::Csv(_)));
}

#[test]
fn parse_timestamp_accepts_supported_formats() {
    let expected = micros("2024-01-01T00:10:00");

    assert_eq!(parse_timestamp("2024-01-01 00:10:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-01T00:10"), Some(expected));
    assert_eq!(parse_timestamp(" 2024-01-01 00:10 "), Some(expected));
    assert_eq!(parse_timestamp("01/01/2024 00:10:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-01T01:10:00+01:00"), Some(expected));
    assert_eq!(
        parse_timestamp("2024-01-01T00:10:00.500"),
        Some(expected + 500_000)
    );
    assert_eq!(
        parse_timestamp("2024-01-01"),
        Some(expected - 10 * 60 * 1_000_000)
    );
    assert_eq!(parse_timestamp("not a time"), None);
    assert_eq!(parse_timestamp("2024-13-01 00:00:00"), None);
}

#[test]
fn instants_outside_nanosecond_range_are_rejected() {
    assert!(parse_timestamp("2262-04-11 00:00:00").is_some());
    assert!(parse_timestamp("1677-09-22 00:00:00").is_some());
    assert_eq!(parse_timestamp("2262-04-12 00:00:00"), None);
    assert_eq!(parse_timestamp("1677-09-20 00:00:00"), None);
    assert_eq!(parse_timestamp("+200000-01-01T00:00:00"), None);

    let df = read_raw_table(Cursor::new("Created time\n2024-01-01\n9999-12-31\n")).unwrap();
    match parse_timestamps(&df, &["Created time"]).unwrap_err() {
        ParserError::InvalidTimestamp { column, row, value } => {
            assert_eq!(column, "Created time");
            assert_eq!(row, 2);
            assert_eq!(value, "9999-12-31");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parses_time_columns_in_place() -> PolarsResult<()> {
    let raw = load_raw(&fixture("tickets_valid.csv")).expect("load failed");
    let parsed = parse_timestamps(&raw, &TIME_COLUMNS).expect("parse failed");

    assert_eq!(parsed.get_column_names(), raw.get_column_names());
    for name in TIME_COLUMNS {
        assert_eq!(
            parsed.column(name)?.dtype(),
            &DataType::Datetime(TimeUnit::Microseconds, None)
        );
    }

    let created = parsed.column("Created time")?.datetime()?;
    assert_eq!(created.get(0), Some(micros("2024-01-01T00:00:00")));
    assert_eq!(created.get(2), Some(micros("2024-01-03T10:00:00")));

    let status = parsed.column("Status")?.str()?;
    assert_eq!(status.get(2), Some("In Progress"));
    Ok(())
}

#[test]
fn missing_time_column_is_reported_before_parsing() {
    let raw = load_raw(&fixture("tickets_bad_timestamp.csv")).unwrap();
    let mut columns = TIME_COLUMNS.to_vec();
    columns.push("Reopened time");

    let err = parse_timestamps(&raw, columns.as_slice()).unwrap_err();
    match err {
        ParserError::MissingColumn { column } => assert_eq!(column, "Reopened time"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unparseable_value_names_column_row_and_value() {
    let raw = load_raw(&fixture("tickets_bad_timestamp.csv")).unwrap();
    let err = parse_timestamps(&raw, &TIME_COLUMNS).unwrap_err();

    match err {
        ParserError::InvalidTimestamp { column, row, value } => {
            assert_eq!(column, "First response time");
            assert_eq!(row, 2);
            assert_eq!(value, "yesterday");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_values_are_counted_per_column() {
    let raw = load_raw(&fixture("tickets_missing_close.csv")).unwrap();
    let err = parse_timestamps(&raw, &TIME_COLUMNS).unwrap_err();

    match &err {
        ParserError::MissingTimestamps { missing } => {
            assert_eq!(missing.len(), TIME_COLUMNS.len());
            assert_eq!(missing[3], ("Close time".to_string(), 2));
            assert!(missing
                .iter()
                .filter(|(name, _)| name != "Close time")
                .all(|(_, count)| *count == 0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Close time=2"));
}
