use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::correction::{correct_offsets, JoinPoints};
use crate::errors::{PrepError, Result};
use crate::loader::spectrum_frame;

/// A data line holds a tab and exactly two whitespace separated floats.
pub fn parse_data_line(line: &str) -> Option<(f64, f64)> {
    if !line.contains('\t') {
        return None;
    }
    let mut parts = line.split_whitespace();
    let (x, y) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some((x.parse().ok()?, y.parse().ok()?))
}

/// Collects the data lines of an ASD export. Lines are decoded lossily since
/// instrument headers are not always UTF-8.
pub fn parse_asd<R: BufRead>(mut reader: R) -> std::io::Result<(Vec<f64>, Vec<f64>)> {
    let (mut xs, mut ys) = (Vec::new(), Vec::new());
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if let Some((x, y)) = parse_data_line(&String::from_utf8_lossy(&buf)) {
            xs.push(x);
            ys.push(y);
        }
    }
    Ok((xs, ys))
}

/// Spectrum of an ASD `.txt` file, splice corrected when `correction` is set.
pub fn extract_spectrum_from_txt(path: &Path, correction: Option<&JoinPoints>) -> Result<DataFrame> {
    let path_str = path.display().to_string();
    let with_path = |e: PrepError| {
        e.with_context("operation", "extract_spectrum_from_txt")
            .with_context("path", path_str.as_str())
    };
    let file = File::open(path).map_err(|e| with_path(PrepError::io("open", e)))?;
    let (x, y) = parse_asd(BufReader::new(file)).map_err(|e| with_path(PrepError::io("read", e)))?;
    debug!(file = %path_str, points = x.len(), "read ASD spectrum");
    let df = spectrum_frame(x, y).map_err(with_path)?;
    match correction {
        Some(joins) => correct_offsets(&df, joins).map_err(with_path),
        None => Ok(df),
    }
}
