use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::info;

use crate::errors::ParserError;

static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Microsecond range a nanosecond timestamp can hold (1677-09-21 to 2262-04-11).
const MIN_MICROS: i64 = i64::MIN / 1_000;
const MAX_MICROS: i64 = i64::MAX / 1_000;

/// Parses one raw timestamp into microseconds since the Unix epoch.
///
/// Values carrying a UTC offset are normalized to UTC; naive values are taken
/// as-is. A bare date means midnight. Instants outside the nanosecond range
/// are rejected.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    parse_micros(value.trim()).filter(|micros| (MIN_MICROS..=MAX_MICROS).contains(micros))
}

fn parse_micros(trimmed: &str) -> Option<i64> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().and_utc().timestamp_micros());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_micros())
}

/// Replaces each named column with a `Datetime(µs)` column in place.
///
/// Every column is checked for presence before any value is parsed. Nulls
/// survive parsing and are reported together once all columns are done.
pub fn parse_timestamps<S: AsRef<str>>(
    df: &DataFrame,
    time_columns: &[S],
) -> Result<DataFrame, ParserError> {
    info!("Parsing timestamp columns to datetime");
    for name in time_columns {
        let name = name.as_ref();
        if df.column(name).is_err() {
            return Err(ParserError::MissingColumn {
                column: name.to_string(),
            });
        }
    }

    let mut output = df.clone();
    for name in time_columns {
        let name = name.as_ref();
        let parsed = parse_column(df.column(name)?, name)?;
        output.with_column(parsed)?;
    }

    let mut missing = Vec::with_capacity(time_columns.len());
    for name in time_columns {
        let name = name.as_ref();
        missing.push((name.to_string(), output.column(name)?.null_count()));
    }
    if missing.iter().any(|(_, count)| *count != 0) {
        return Err(ParserError::MissingTimestamps { missing });
    }

    info!("Timestamp parsing OK (no missing timestamps)");
    Ok(output)
}

fn parse_column(column: &Column, name: &str) -> Result<Series, ParserError> {
    let as_text = column.cast(&DataType::String)?;
    let text = as_text.str()?;

    let mut micros: Vec<Option<i64>> = Vec::with_capacity(text.len());
    for (idx, value) in text.into_iter().enumerate() {
        match value {
            None => micros.push(None),
            Some(raw) => {
                let parsed = parse_timestamp(raw).ok_or_else(|| ParserError::InvalidTimestamp {
                    column: name.to_string(),
                    row: idx + 1,
                    value: raw.to_string(),
                })?;
                micros.push(Some(parsed));
            }
        }
    }

    Ok(Series::new(name.into(), micros).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?)
}
