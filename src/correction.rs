//! Splice correction for ASD spectra.
//!
//! ASD field spectrometers stitch three detectors together (VNIR, SWIR1,
//! SWIR2). Each detector has its own offset, which shows up as a step in
//! the spectrum at the two join wavelengths. The correction shifts the
//! SWIR segments so each join is continuous with the segment before it.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{PrepError, Result};
use crate::loader::{X_COLUMN, Y_COLUMN};

/// Last wavelength of one detector and first wavelength of the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinPair(pub f64, pub f64);

impl FromStr for JoinPair {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| format!("expected two wavelengths as 'A,B', got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("bad wavelength '{}': {e}", v.trim()))
        };
        Ok(JoinPair(parse(a)?, parse(b)?))
    }
}

impl fmt::Display for JoinPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinPoints {
    pub join1: JoinPair,
    pub join2: JoinPair,
}

impl Default for JoinPoints {
    fn default() -> Self {
        Self {
            join1: JoinPair(1000.0, 1001.0),
            join2: JoinPair(1800.0, 1801.0),
        }
    }
}

/// First `y` whose `x` equals `x` exactly.
fn y_at(df: &DataFrame, x: f64) -> Result<f64> {
    let hit = df
        .clone()
        .lazy()
        .filter(col(X_COLUMN).eq(lit(x)))
        .select([col(Y_COLUMN)])
        .limit(1)
        .collect()?;
    hit.column(Y_COLUMN)?
        .f64()?
        .get(0)
        .ok_or_else(|| {
            PrepError::validation(format!("join wavelength {x} not present in spectrum"))
                .with_context("operation", "correct_offsets")
        })
}

fn shifted(df: &DataFrame, rows: Expr, offset: f64) -> Result<DataFrame> {
    Ok(df
        .clone()
        .lazy()
        .filter(rows)
        .with_column((col(Y_COLUMN) - lit(offset)).alias(Y_COLUMN))
        .collect()?)
}

/// Removes the detector steps at `joins.join1` and `joins.join2`.
///
/// Rows up to `join1.0` are kept as is. Rows from `join1.1` through
/// `join2.0` are shifted by the step at the first join, rows past `join2.0`
/// by the step between the corrected `join2.0` value and `join2.1`. Rows
/// strictly between `join1.0` and `join1.1` are dropped.
pub fn correct_offsets(df: &DataFrame, joins: &JoinPoints) -> Result<DataFrame> {
    let JoinPoints {
        join1: JoinPair(a0, a1),
        join2: JoinPair(b0, b1),
    } = *joins;

    let d1 = y_at(df, a1)? - y_at(df, a0)?;
    let mut corrected = shifted(df, col(X_COLUMN).lt_eq(lit(a0)), 0.0)?;
    let middle = shifted(
        df,
        col(X_COLUMN).gt_eq(lit(a1)).and(col(X_COLUMN).lt_eq(lit(b0))),
        d1,
    )?;
    corrected.vstack_mut(&middle)?;

    let d2 = y_at(df, b1)? - y_at(&corrected, b0)?;
    let tail = shifted(df, col(X_COLUMN).gt(lit(b0)), d2)?;
    corrected.vstack_mut(&tail)?;
    corrected.as_single_chunk();
    Ok(corrected)
}
