use std::io::{self, Read, Seek};

use crate::fits::error::FitsReadError;
use crate::fits::header::Header;
use crate::fits::utils::{data_size, non_negative, padded_len, skip_bytes};

/// Binary table field types, keyed by their `TFORM` code letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Logical,
    Bit,
    Byte,
    Int16,
    Int32,
    Int64,
    Char,
    Float32,
    Float64,
    Complex32,
    Complex64,
    Descriptor32,
    Descriptor64,
}

impl FieldType {
    pub fn from_code(code: char) -> Option<Self> {
        let t = match code.to_ascii_uppercase() {
            'L' => FieldType::Logical,
            'X' => FieldType::Bit,
            'B' => FieldType::Byte,
            'I' => FieldType::Int16,
            'J' => FieldType::Int32,
            'K' => FieldType::Int64,
            'A' => FieldType::Char,
            'E' => FieldType::Float32,
            'D' => FieldType::Float64,
            'C' => FieldType::Complex32,
            'M' => FieldType::Complex64,
            'P' => FieldType::Descriptor32,
            'Q' => FieldType::Descriptor64,
            _ => return None,
        };
        Some(t)
    }

    /// Bytes occupied by a cell holding `repeat` elements, `None` on overflow.
    pub fn width(self, repeat: usize) -> Option<usize> {
        match self {
            FieldType::Bit => Some(repeat.div_ceil(8)),
            FieldType::Logical | FieldType::Byte | FieldType::Char => Some(repeat),
            FieldType::Int16 => repeat.checked_mul(2),
            FieldType::Int32 | FieldType::Float32 => repeat.checked_mul(4),
            FieldType::Int64 | FieldType::Float64 | FieldType::Complex32 => repeat.checked_mul(8),
            FieldType::Complex64 => repeat.checked_mul(16),
            FieldType::Descriptor32 => repeat.checked_mul(8),
            FieldType::Descriptor64 => repeat.checked_mul(16),
        }
    }
}

/// Parses a `TFORMn` value such as `1D`, `E`, `16A` or `1PE(300)`.
pub fn parse_tform(tform: &str) -> Result<(usize, FieldType), FitsReadError> {
    let s = tform.trim();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let repeat = if digits == 0 {
        1
    } else {
        s[..digits]
            .parse::<usize>()
            .map_err(|e| FitsReadError::Parse(format!("bad TFORM '{tform}': {e}")))?
    };
    let code = s[digits..]
        .chars()
        .next()
        .ok_or_else(|| FitsReadError::Parse(format!("TFORM '{tform}' has no type code")))?;
    let field_type = FieldType::from_code(code)
        .ok_or_else(|| FitsReadError::Parse(format!("unknown TFORM type code in '{tform}'")))?;
    Ok((repeat, field_type))
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub format: String,
    pub field_type: FieldType,
    pub repeat: usize,
    pub offset: usize,
    /// Cell size in bytes.
    pub width: usize,
    pub scale: f64,
    pub zero: f64,
    pub null: Option<i64>,
}

/// Widens through the shortest decimal form of `v`, so `0.1f32` becomes
/// `0.1` rather than `0.10000000149011612`.
fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(v as f64)
}

impl Field {
    fn scaled(&self, raw: f64) -> f64 {
        raw * self.scale + self.zero
    }

    fn scaled_int(&self, raw: i64) -> f64 {
        if self.null == Some(raw) {
            f64::NAN
        } else {
            self.scaled(raw as f64)
        }
    }

    fn decode_into(&self, cell: &[u8], out: &mut Vec<f64>) -> Result<(), FitsReadError> {
        match self.field_type {
            FieldType::Logical => out.extend(cell.iter().map(|b| match b {
                b'T' => 1.0,
                b'F' => 0.0,
                _ => f64::NAN,
            })),
            FieldType::Byte => out.extend(cell.iter().map(|b| self.scaled_int(*b as i64))),
            FieldType::Int16 => out.extend(
                cell.chunks_exact(2)
                    .map(|c| self.scaled_int(i16::from_be_bytes([c[0], c[1]]) as i64)),
            ),
            FieldType::Int32 => out.extend(cell.chunks_exact(4).map(|c| {
                self.scaled_int(i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as i64)
            })),
            FieldType::Int64 => out.extend(cell.chunks_exact(8).map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                self.scaled_int(i64::from_be_bytes(b))
            })),
            FieldType::Float32 => out.extend(
                cell.chunks_exact(4)
                    .map(|c| self.scaled(widen_f32(f32::from_be_bytes([c[0], c[1], c[2], c[3]])))),
            ),
            FieldType::Float64 => out.extend(cell.chunks_exact(8).map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                self.scaled(f64::from_be_bytes(b))
            })),
            _ => {
                return Err(FitsReadError::Unsupported(format!(
                    "column '{}' has non-numeric TFORM '{}'",
                    self.name, self.format
                )))
            }
        }
        Ok(())
    }
}

/// A `BINTABLE` extension with its main table loaded in memory. The heap,
/// if any, is skipped.
#[derive(Debug, Clone)]
pub struct BinTable {
    pub header: Header,
    row_len: usize,
    nrows: usize,
    fields: Vec<Field>,
    data: Vec<u8>,
}

impl BinTable {
    /// Builds the table from an already read extension header; `reader` must
    /// sit at the start of the data unit and is left at the next HDU.
    pub fn read_from<R: Read + Seek>(header: Header, reader: &mut R) -> Result<Self, FitsReadError> {
        let row_len = non_negative(&header, "NAXIS1")?;
        let nrows = non_negative(&header, "NAXIS2")?;
        let tfields = header.get_int("TFIELDS").unwrap_or(0).max(0) as usize;

        let mut fields = Vec::with_capacity(tfields);
        let mut offset = 0usize;
        for i in 1..=tfields {
            let format = header
                .get_str(&format!("TFORM{i}"))
                .ok_or_else(|| FitsReadError::Parse(format!("Missing TFORM{i}")))?
                .to_string();
            let (repeat, field_type) = parse_tform(&format)?;
            let width = field_type
                .width(repeat)
                .ok_or_else(|| FitsReadError::Parse(format!("TFORM{i} '{format}' is too wide")))?;
            let field = Field {
                name: header
                    .get_str(&format!("TTYPE{i}"))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("col{i}")),
                format,
                field_type,
                repeat,
                offset,
                width,
                scale: header.get_float(&format!("TSCAL{i}")).unwrap_or(1.0),
                zero: header.get_float(&format!("TZERO{i}")).unwrap_or(0.0),
                null: header.get_int(&format!("TNULL{i}")),
            };
            offset = offset
                .checked_add(width)
                .ok_or_else(|| FitsReadError::Parse("TFORM widths overflow".into()))?;
            fields.push(field);
        }
        if offset > row_len {
            return Err(FitsReadError::Parse(format!(
                "TFORM widths sum to {offset} bytes but NAXIS1 is {row_len}"
            )));
        }

        let table_len = row_len.checked_mul(nrows).ok_or_else(|| {
            FitsReadError::Parse(format!("NAXIS1 {row_len} x NAXIS2 {nrows} overflows"))
        })?;
        let padded = padded_len(data_size(&header)?)?;
        // The buffer grows with what the stream delivers, not with NAXIS2.
        let mut data = Vec::new();
        reader
            .by_ref()
            .take(table_len as u64)
            .read_to_end(&mut data)?;
        if data.len() < table_len {
            return Err(FitsReadError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("table holds {} of {table_len} bytes", data.len()),
            )));
        }
        skip_bytes(reader, padded.saturating_sub(table_len))?;

        Ok(BinTable {
            header,
            row_len,
            nrows,
            fields,
            data,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.header.get_str("EXTNAME")
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks a column up by `TTYPE`, exact match first, then ignoring ASCII case.
    pub fn field(&self, name: &str) -> Result<&Field, FitsReadError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| FitsReadError::MissingColumn {
                extension: self.name().unwrap_or("").to_string(),
                column: name.to_string(),
            })
    }

    /// All values of a numeric column, row by row, with vector cells
    /// flattened in order. `TSCAL`/`TZERO` are applied and integer `TNULL`
    /// values become NaN.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, FitsReadError> {
        let field = self.field(name)?;
        let mut out = Vec::new();
        if self.row_len == 0 {
            return Ok(out);
        }
        for row in self.data.chunks_exact(self.row_len) {
            field.decode_into(&row[field.offset..field.offset + field.width], &mut out)?;
        }
        Ok(out)
    }
}
