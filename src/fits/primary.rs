use std::io::{Read, Seek};

use crate::fits::error::FitsReadError;
use crate::fits::header::Header;
use crate::fits::utils::{data_size, padded_len, skip_bytes};

#[derive(Debug, Clone)]
pub struct PrimaryHdu {
    pub header: Header,
}

impl PrimaryHdu {
    /// Reads the primary header and skips its data unit.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self, FitsReadError> {
        let header = Header::read_from(reader)?;
        if header.iter().next().map(|c| c.keyword.as_str()) != Some("SIMPLE") {
            return Err(FitsReadError::Parse(
                "not a FITS file: first card is not SIMPLE".into(),
            ));
        }
        skip_bytes(reader, padded_len(data_size(&header)?)?)?;
        Ok(PrimaryHdu { header })
    }
}
