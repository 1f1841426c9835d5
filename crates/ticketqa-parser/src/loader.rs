use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::errors::ParserError;

/// Reads a raw ticket export from disk.
///
/// Header names are trimmed; cell values are kept verbatim except that empty
/// cells become nulls. Every column comes back as a string column.
pub fn load_raw(path: &Path) -> Result<DataFrame, ParserError> {
    info!(path = %path.display(), "Loading raw data");
    if !path.exists() {
        return Err(ParserError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|source| ParserError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = read_raw_table(file)?;
    info!(rows = df.height(), columns = df.width(), "Loaded raw data");
    Ok(df)
}

pub fn read_raw_table<R: Read>(reader: R) -> Result<DataFrame, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut seen = HashSet::with_capacity(headers.len());
    for name in &headers {
        if !seen.insert(name.as_str()) {
            return Err(ParserError::DuplicateColumn {
                column: name.clone(),
            });
        }
    }

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in values.iter_mut().zip(record.iter()) {
            if field.trim().is_empty() {
                column.push(None);
            } else {
                column.push(Some(field.to_string()));
            }
        }
    }

    build_string_frame(&headers, values)
}

fn build_string_frame(
    headers: &[String],
    values: Vec<Vec<Option<String>>>,
) -> Result<DataFrame, ParserError> {
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (name, data) in headers.iter().zip(values) {
        let utf8: Vec<Option<&str>> = data.iter().map(|v| v.as_deref()).collect();
        columns.push(Series::new(name.as_str().into(), utf8).into());
    }
    Ok(DataFrame::new(columns)?)
}
