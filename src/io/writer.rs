use std::io::{BufWriter, Write};
use std::path::Path;

use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::errors::{PrepError, Result};

/// NaN in float columns becomes null, which CSV writes as an empty field.
fn nan_as_null(df: &DataFrame) -> Result<DataFrame> {
    let floats: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_float())
        .map(|c| col(c.name().clone()).fill_nan(lit(NULL)))
        .collect();
    if floats.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(floats).collect()?)
}

/// Writes `df` as CSV with a header row and no index column. Missing and
/// NaN values are left empty.
pub fn write_csv_to<W: Write>(df: &DataFrame, writer: W) -> Result<()> {
    let mut out = nan_as_null(df)?;
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut out)
        .map_err(|e| PrepError::polars("CSV write failed", e))
}

/// Writes into a temporary file next to `path` and renames it into place,
/// so a failed write never leaves a partial CSV behind.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let with_path = |e: PrepError| e.with_context("path", path.display().to_string());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir).map_err(|e| with_path(PrepError::io("create", e)))?;
    let mut writer = BufWriter::new(tmp);
    write_csv_to(df, &mut writer).map_err(with_path)?;
    let tmp = writer
        .into_inner()
        .map_err(|e| with_path(PrepError::io("flush", e.into_error())))?;
    tmp.persist(path)
        .map_err(|e| with_path(PrepError::io("rename", e.error)))?;
    Ok(())
}
