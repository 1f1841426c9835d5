use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// What was persisted by [`write_processed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: usize,
    /// blake3 hex digest of the written file.
    pub digest: String,
}

/// Serializes the frame as CSV with a header row and no index column.
pub fn render_csv(df: &DataFrame, datetime_format: &str) -> Result<Vec<u8>> {
    let mut clone = df.clone();
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_datetime_format(Some(datetime_format.to_string()))
        .finish(&mut clone)?;
    Ok(buffer)
}

/// Writes the processed dataset, creating parent directories as needed.
///
/// Bytes go to a sibling `.tmp` file first and are renamed into place, so the
/// destination either holds a complete dataset or is untouched.
pub fn write_processed(df: &DataFrame, path: &Path, datetime_format: &str) -> Result<WriteSummary> {
    let bytes = render_csv(df, datetime_format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = staging_path(path);
    if let Err(err) = fs::write(&tmp_path, &bytes).and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    let summary = WriteSummary {
        path: path.to_path_buf(),
        rows: df.height(),
        bytes: bytes.len(),
        digest: blake3::hash(&bytes).to_hex().to_string(),
    };
    info!(
        path = %summary.path.display(),
        rows = summary.rows,
        bytes = summary.bytes,
        digest = %summary.digest,
        "Saved processed dataset"
    );
    Ok(summary)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
