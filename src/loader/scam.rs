use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PrepError, Result};
use crate::fits::HduList;
use crate::loader::spectrum_frame;

/// Where a SCAM file keeps its spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitsLayout {
    pub spectra_extension: String,
    pub spectra_column: String,
    pub wavelength_extension: String,
    pub wavelength_column: String,
}

impl Default for FitsLayout {
    fn default() -> Self {
        Self {
            spectra_extension: "Spectra".to_string(),
            spectra_column: "I_F_Atm".to_string(),
            wavelength_extension: "Wavelength".to_string(),
            wavelength_column: "Wavelength (um)".to_string(),
        }
    }
}

/// Reflectance against wavelength (µm) from a SCAM `.fits` file.
pub fn extract_spectrum_from_fits(path: &Path, layout: &FitsLayout) -> Result<DataFrame> {
    let path_str = path.display().to_string();
    let with_path = |e: PrepError| {
        e.with_context("operation", "extract_spectrum_from_fits")
            .with_context("path", path_str.as_str())
    };
    let hdul = HduList::from_path(path).map_err(|e| with_path(e.into()))?;
    let wavelength = hdul
        .table(&layout.wavelength_extension)
        .and_then(|t| t.column_f64(&layout.wavelength_column))
        .map_err(|e| with_path(e.into()))?;
    let reflectance = hdul
        .table(&layout.spectra_extension)
        .and_then(|t| t.column_f64(&layout.spectra_column))
        .map_err(|e| with_path(e.into()))?;
    debug!(file = %path_str, hdus = hdul.len(), points = wavelength.len(), "read SCAM spectrum");
    spectrum_frame(wavelength, reflectance).map_err(with_path)
}
