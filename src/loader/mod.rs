//! Spectrum extraction from instrument files.
//!
//! Every loader returns a two column polars frame, `x` then `y`, both
//! `Float64`, in file order.

pub mod asd;
pub mod scam;

use std::path::Path;

use polars::prelude::*;

use crate::correction::JoinPoints;
use crate::errors::{PrepError, Result};

pub use asd::extract_spectrum_from_txt;
pub use scam::{extract_spectrum_from_fits, FitsLayout};

pub const X_COLUMN: &str = "x";
pub const Y_COLUMN: &str = "y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumKind {
    /// SCAM binary table `.fits`
    Scam,
    /// ASD `.txt` export
    Asd,
}

impl SpectrumKind {
    /// Classifies by the last extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("fits") {
            Some(SpectrumKind::Scam)
        } else if ext.eq_ignore_ascii_case("txt") {
            Some(SpectrumKind::Asd)
        } else {
            None
        }
    }
}

pub fn spectrum_frame(x: Vec<f64>, y: Vec<f64>) -> Result<DataFrame> {
    if x.len() != y.len() {
        return Err(PrepError::validation(format!(
            "wavelength and value lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    Ok(DataFrame::new(vec![
        Column::new(X_COLUMN.into(), x),
        Column::new(Y_COLUMN.into(), y),
    ])?)
}

/// Reads one input file. `correction` only applies to ASD files.
pub fn read_spectrum(
    path: &Path,
    kind: SpectrumKind,
    layout: &FitsLayout,
    correction: Option<&JoinPoints>,
) -> Result<DataFrame> {
    match kind {
        SpectrumKind::Scam => extract_spectrum_from_fits(path, layout),
        SpectrumKind::Asd => extract_spectrum_from_txt(path, correction),
    }
}
