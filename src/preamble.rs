//! Waveform preamble parsing.
//!
//! The preamble is the instrument's `WFMP?` answer: sixteen `;`-separated
//! positional fields describing how the following curve must be scaled.
//!
//! | Index | Field   | Meaning                         |
//! |-------|---------|---------------------------------|
//! | 0     | BYT_NR  | data width in bytes             |
//! | 1     | BIT_NR  | bits per point                  |
//! | 2     | ENCDG   | `ASC` / `BIN`                   |
//! | 3     | BN_FMT  | `RI` (signed) / `RP` (unsigned) |
//! | 4     | BYT_OR  | byte order                      |
//! | 5     | NR_PT   | number of points                |
//! | 6     | WFID    | waveform identifier             |
//! | 7     | PT_FMT  | point format                    |
//! | 8     | XINCR   | x increment                     |
//! | 9     | PT_OFF  | x offset (points)               |
//! | 10    | XZERO   | x of the first point            |
//! | 11    | XUNIT   | x unit                          |
//! | 12    | YMULT   | y multiplier                    |
//! | 13    | YZERO   | y zero                          |
//! | 14    | YOFF    | y offset (ADC counts)           |
//! | 15    | YUNIT   | y unit                          |

use std::str::FromStr;

pub const PREAMBLE_FIELD_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Binary,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Ascii => "ASCII",
            Encoding::Binary => "BINARY",
        }
    }
}

impl FromStr for Encoding {
    type Err = PreambleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" | "ASCII" | "ASCI" => Ok(Encoding::Ascii),
            "BIN" | "BINARY" => Ok(Encoding::Binary),
            _ => Err(PreambleParseError::UnknownEncoding(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    /// Signed integer.
    Ri,
    /// Unsigned integer.
    Rp,
}

impl FromStr for BinaryFormat {
    type Err = PreambleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RI" => Ok(BinaryFormat::Ri),
            "RP" => Ok(BinaryFormat::Rp),
            _ => Err(PreambleParseError::UnknownBinaryFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreambleParseError {
    #[error("field count mismatch: expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("malformed numeric field {field}: '{value}'")]
    MalformedNumber { field: &'static str, value: String },

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("unknown binary format '{0}'")]
    UnknownBinaryFormat(String),
}

impl PreambleParseError {
    pub fn reason(&self) -> &'static str {
        match self {
            PreambleParseError::FieldCount { .. } => "field count mismatch",
            PreambleParseError::MalformedNumber { .. } => "malformed numeric field",
            PreambleParseError::UnknownEncoding(_) => "unknown encoding",
            PreambleParseError::UnknownBinaryFormat(_) => "unknown binary format",
        }
    }

    /// Name of the offending field, if the failure is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PreambleParseError::MalformedNumber { field, .. } => Some(*field),
            PreambleParseError::UnknownEncoding(_) => Some("encoding"),
            PreambleParseError::UnknownBinaryFormat(_) => Some("binary_format"),
            PreambleParseError::FieldCount { .. } => None,
        }
    }
}

/// Snapshot of the acquisition settings that apply to one curve transfer.
///
/// [`WaveformPreamble::parse`] fills every field or fails; it never hands
/// out a partially parsed record.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformPreamble {
    pub data_channel: String,
    pub data_width: u32,
    pub bits_per_point: u32,
    pub encoding: Encoding,
    pub binary_format: BinaryFormat,
    pub byte_order: String,
    pub number_of_points: usize,
    pub waveform_id: String,
    pub point_format: String,
    pub x_increment: f64,
    pub x_offset: i64,
    pub x_zero: f64,
    pub x_unit: String,
    pub y_multiplier: f64,
    pub y_zero: f64,
    pub y_offset: f64,
    pub y_unit: String,
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, PreambleParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| PreambleParseError::MalformedNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_finite(field: &'static str, value: &str) -> Result<f64, PreambleParseError> {
    let parsed: f64 = parse_field(field, value)?;
    if !parsed.is_finite() {
        return Err(PreambleParseError::MalformedNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn strip_quotes(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

impl WaveformPreamble {
    /// Parse a raw `WFMP?` record. `data_channel` is the `DAT:SOU?` answer
    /// read alongside it.
    pub fn parse(data_channel: &str, raw: &str) -> Result<Self, PreambleParseError> {
        let fields: Vec<&str> = raw.trim().split(';').collect();
        Self::from_fields(data_channel, &fields)
    }

    fn from_fields(data_channel: &str, fields: &[&str]) -> Result<Self, PreambleParseError> {
        if fields.len() < PREAMBLE_FIELD_COUNT {
            return Err(PreambleParseError::FieldCount {
                expected: PREAMBLE_FIELD_COUNT,
                actual: fields.len(),
            });
        }

        let x_unit = match strip_quotes(fields[11]).as_str() {
            "s" => "Seconds".to_string(),
            other => other.to_string(),
        };

        Ok(Self {
            data_channel: data_channel.trim().to_string(),
            data_width: parse_field("data_width", fields[0])?,
            bits_per_point: parse_field("bits_per_point", fields[1])?,
            encoding: fields[2].parse()?,
            binary_format: fields[3].parse()?,
            byte_order: fields[4].trim().to_string(),
            number_of_points: parse_field("number_of_points", fields[5])?,
            waveform_id: strip_quotes(fields[6]),
            point_format: fields[7].trim().to_string(),
            x_increment: parse_finite("x_increment", fields[8])?,
            x_offset: parse_field("x_offset", fields[9])?,
            x_zero: parse_finite("x_zero", fields[10])?,
            x_unit,
            y_multiplier: parse_finite("y_multiplier", fields[12])?,
            y_zero: parse_finite("y_zero", fields[13])?,
            y_offset: parse_finite("y_offset", fields[14])?,
            y_unit: strip_quotes(fields[15]),
        })
    }

    /// Convert one ADC code to a physical value.
    pub fn to_physical(&self, raw: i64) -> f64 {
        self.y_zero + self.y_multiplier * (raw as f64 - self.y_offset)
    }
}
