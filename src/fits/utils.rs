use std::io::{Seek, SeekFrom};

use crate::fits::error::FitsReadError;
use crate::fits::header::Header;

pub const FITS_BLOCK_SIZE: usize = 2880;

fn too_large(what: &str) -> FitsReadError {
    FitsReadError::Parse(format!("{what} does not fit in memory addressing"))
}

/// Rounds a byte count up to a whole number of FITS blocks.
pub fn padded_len(nbytes: usize) -> Result<usize, FitsReadError> {
    nbytes
        .div_ceil(FITS_BLOCK_SIZE)
        .checked_mul(FITS_BLOCK_SIZE)
        .ok_or_else(|| too_large("padded data unit"))
}

/// Moves `reader` forward by `nbytes`.
pub fn skip_bytes<R: Seek>(reader: &mut R, nbytes: usize) -> Result<(), FitsReadError> {
    if nbytes > 0 {
        let offset = i64::try_from(nbytes).map_err(|_| too_large("data unit"))?;
        reader.seek(SeekFrom::Current(offset))?;
    }
    Ok(())
}

pub fn nbytes_from_bitpix(bitpix: i64) -> Result<usize, FitsReadError> {
    match bitpix {
        8 => Ok(1),
        16 => Ok(2),
        32 | -32 => Ok(4),
        64 | -64 => Ok(8),
        other => Err(FitsReadError::Parse(format!("invalid BITPIX {other}"))),
    }
}

pub(crate) fn non_negative(header: &Header, key: &str) -> Result<usize, FitsReadError> {
    let v = header
        .get_int(key)
        .ok_or_else(|| FitsReadError::Parse(format!("Missing {key}")))?;
    usize::try_from(v).map_err(|_| FitsReadError::Parse(format!("{key} is negative: {v}")))
}

/// Size in bytes of the data unit described by `header`, without padding.
///
/// `|BITPIX| / 8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`, where random
/// groups (`GROUPS = T`) leave `NAXIS1` out of the product. Sizes that
/// overflow `usize` are a parse error.
pub fn data_size(header: &Header) -> Result<usize, FitsReadError> {
    let naxis = non_negative(header, "NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }
    let bytes = nbytes_from_bitpix(
        header
            .get_int("BITPIX")
            .ok_or_else(|| FitsReadError::Parse("Missing BITPIX".into()))?,
    )?;
    let groups = header.get_bool("GROUPS").unwrap_or(false);
    let mut nelem = 1usize;
    for i in 1..=naxis {
        if groups && i == 1 {
            continue;
        }
        nelem = nelem
            .checked_mul(non_negative(header, &format!("NAXIS{i}"))?)
            .ok_or_else(|| too_large("NAXISn product"))?;
    }
    let pcount = header.get_int("PCOUNT").unwrap_or(0).max(0) as usize;
    let gcount = header.get_int("GCOUNT").unwrap_or(1).max(0) as usize;
    pcount
        .checked_add(nelem)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes))
        .ok_or_else(|| too_large("data unit size"))
}
