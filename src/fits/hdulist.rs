use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::fits::bintable::BinTable;
use crate::fits::error::FitsReadError;
use crate::fits::header::Header;
use crate::fits::primary::PrimaryHdu;
use crate::fits::utils::{data_size, padded_len, skip_bytes};

const XTENSION: &[u8] = b"XTENSION";

/// True when the next bytes start another extension header. Trailing
/// padding or junk after the last HDU ends the list.
fn next_is_extension<R: Read + Seek>(reader: &mut R) -> Result<bool, FitsReadError> {
    let mut buf = Vec::with_capacity(XTENSION.len());
    reader
        .by_ref()
        .take(XTENSION.len() as u64)
        .read_to_end(&mut buf)?;
    reader.seek(SeekFrom::Current(-(buf.len() as i64)))?;
    Ok(buf == XTENSION)
}

#[derive(Debug)]
pub enum Hdu {
    Primary(PrimaryHdu),
    BinTable(BinTable),
    /// Any other extension; only its header is kept.
    Other(Header),
}

impl Hdu {
    pub fn header(&self) -> &Header {
        match self {
            Hdu::Primary(p) => &p.header,
            Hdu::BinTable(t) => &t.header,
            Hdu::Other(h) => h,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.header().get_str("EXTNAME")
    }

    pub fn kind(&self) -> &str {
        match self {
            Hdu::Primary(_) => "PRIMARY",
            Hdu::BinTable(_) => "BINTABLE",
            Hdu::Other(h) => h.get_str("XTENSION").unwrap_or("UNKNOWN"),
        }
    }
}

#[derive(Debug, Default)]
pub struct HduList {
    pub hdus: Vec<Hdu>,
}

impl HduList {
    pub fn from_path(path: &Path) -> Result<Self, FitsReadError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::from_reader(&mut reader)
    }

    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self, FitsReadError> {
        let mut hdus = vec![Hdu::Primary(PrimaryHdu::read_from(reader)?)];
        while next_is_extension(reader)? {
            let header = Header::read_from(reader)?;
            let xtension = header
                .get_str("XTENSION")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or_default();
            if xtension == "BINTABLE" {
                hdus.push(Hdu::BinTable(BinTable::read_from(header, reader)?));
            } else {
                skip_bytes(reader, padded_len(data_size(&header)?)?)?;
                hdus.push(Hdu::Other(header));
            }
        }
        Ok(HduList { hdus })
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hdu> {
        self.hdus.iter()
    }

    /// Binary table whose `EXTNAME` is `name`; exact match wins over a
    /// case-insensitive one.
    pub fn table(&self, name: &str) -> Result<&BinTable, FitsReadError> {
        let tables = || {
            self.hdus.iter().filter_map(|h| match h {
                Hdu::BinTable(t) => Some(t),
                _ => None,
            })
        };
        tables()
            .find(|t| t.name() == Some(name))
            .or_else(|| {
                tables().find(|t| t.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            })
            .ok_or_else(|| FitsReadError::MissingExtension(name.to_string()))
    }
}
