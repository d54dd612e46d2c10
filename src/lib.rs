//! Convert SCAM `.fits` and ASD `.txt` spectra into two column (`x`, `y`)
//! CSV files for plotting.
//!
//! The usual entry point is [`io::preprocess_folder`], which converts every
//! recognised file in a folder into a sibling `<folder>_processed/` folder.
//! The single-file loaders live in [`loader`], the splice correction for ASD
//! spectra in [`correction`], and a small binary-table FITS reader in
//! [`fits`].

pub mod cli;
pub mod config;
pub mod correction;
pub mod errors;
pub mod fits;
pub mod io;
pub mod loader;
pub mod logging;

pub use config::Config;
pub use correction::{correct_offsets, JoinPair, JoinPoints};
pub use errors::{PrepError, PrepErrorKind, Result};
pub use io::{preprocess_folder, FileOutcome, ProcessOptions, ProcessReport};
pub use loader::{extract_spectrum_from_fits, extract_spectrum_from_txt, FitsLayout};
