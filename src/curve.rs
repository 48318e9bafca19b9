use crate::autoscale::time_axis;
use crate::preamble::{Encoding, PreambleParseError, WaveformPreamble, PREAMBLE_FIELD_COUNT};
use polars::prelude::*;

pub const TIME_COLUMN_NAME: &str = "time";
pub const VALUE_COLUMN_NAME: &str = "value";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveDecodeError {
    #[error("non-integer sample '{token}' at index {index}")]
    NonIntegerSample { index: usize, token: String },

    #[error("curve has {actual} points but the preamble declares {declared}")]
    PointCountMismatch { declared: usize, actual: usize },

    #[error("{} curves cannot be decoded as text", .0.as_str())]
    UnsupportedEncoding(Encoding),
}

impl CurveDecodeError {
    pub fn reason(&self) -> &'static str {
        match self {
            CurveDecodeError::NonIntegerSample { .. } => "non-integer sample",
            CurveDecodeError::PointCountMismatch { .. } => "point count mismatch",
            CurveDecodeError::UnsupportedEncoding(_) => "unsupported encoding",
        }
    }
}

/// What to do when the number of decoded samples differs from the
/// preamble's `number_of_points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurvePolicy {
    /// Trust the instrument; don't compare.
    #[default]
    Trusted,
    /// Log a warning and return the curve anyway.
    Surface,
    /// Fail with [`CurveDecodeError::PointCountMismatch`].
    Strict,
}

impl CurvePolicy {
    /// Compare a decoded curve against the preamble's declared point count.
    pub fn check(
        self,
        samples: Vec<f64>,
        preamble: &WaveformPreamble,
    ) -> Result<Vec<f64>, CurveDecodeError> {
        let declared = preamble.number_of_points;
        if samples.len() != declared {
            match self {
                CurvePolicy::Trusted => {}
                CurvePolicy::Surface => log::warn!(
                    "Curve has {} points, preamble declares {}",
                    samples.len(),
                    declared
                ),
                CurvePolicy::Strict => {
                    return Err(CurveDecodeError::PointCountMismatch {
                        declared,
                        actual: samples.len(),
                    })
                }
            }
        }
        Ok(samples)
    }
}

/// Decode a comma-separated list of ADC codes into physical values.
///
/// Output has exactly one value per input token. Empty input decodes to an
/// empty curve. Only `ASC` preambles are accepted.
pub fn decode_curve(raw: &str, preamble: &WaveformPreamble) -> Result<Vec<f64>, CurveDecodeError> {
    if preamble.encoding != Encoding::Ascii {
        return Err(CurveDecodeError::UnsupportedEncoding(preamble.encoding));
    }

    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .enumerate()
        .map(|(index, token)| {
            token
                .trim()
                .parse::<i64>()
                .map(|code| preamble.to_physical(code))
                .map_err(|_| CurveDecodeError::NonIntegerSample {
                    index,
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Split a combined `WAVF?` response into its preamble and curve parts.
///
/// The curve starts after the sixteenth `;`. A response without one is
/// returned whole as the preamble with an empty curve.
pub fn split_waveform_response(raw: &str) -> (&str, &str) {
    let raw = raw.trim();
    match raw.match_indices(';').nth(PREAMBLE_FIELD_COUNT - 1) {
        Some((pos, _)) => (&raw[..pos], &raw[pos + 1..]),
        None => (raw, ""),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WaveformParseError {
    #[error("Invalid preamble: {0}")]
    Preamble(#[from] PreambleParseError),

    #[error("Invalid curve: {0}")]
    Curve(#[from] CurveDecodeError),
}

/// A preamble together with the curve it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub preamble: WaveformPreamble,
    pub samples: Vec<f64>,
}

impl Waveform {
    /// Parse a combined `WAVF?` response: the sixteen preamble fields
    /// followed by one more `;`-separated field holding the curve.
    pub fn parse(data_channel: &str, raw: &str) -> Result<Self, WaveformParseError> {
        let (preamble, curve) = split_waveform_response(raw);
        let preamble = WaveformPreamble::parse(data_channel, preamble)?;
        let samples = decode_curve(curve, &preamble)?;
        Ok(Self { preamble, samples })
    }

    /// Time of every sample, starting at zero.
    pub fn times(&self) -> Vec<f64> {
        time_axis(self.samples.len(), self.preamble.x_increment)
    }

    /// Time and physical value columns.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        df!(
            TIME_COLUMN_NAME => self.times(),
            VALUE_COLUMN_NAME => self.samples.clone()
        )
    }
}
