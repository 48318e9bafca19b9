#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutoscaleError {
    #[error("empty input: no magnitude can be chosen")]
    EmptyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiPrefix {
    None,
    Milli,
    Micro,
    Nano,
}

impl SiPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiPrefix::None => "",
            SiPrefix::Milli => "milli",
            SiPrefix::Micro => "micro",
            SiPrefix::Nano => "nano",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            SiPrefix::None => 1.0,
            SiPrefix::Milli => 1e3,
            SiPrefix::Micro => 1e6,
            SiPrefix::Nano => 1e9,
        }
    }

    /// Band selection on the largest magnitude. Boundaries belong to the
    /// band below them, e.g. exactly `1.0` is milli.
    pub fn for_magnitude(max: f64) -> Self {
        if max > 1.0 {
            SiPrefix::None
        } else if max > 1e-3 {
            SiPrefix::Milli
        } else if max > 1e-6 {
            SiPrefix::Micro
        } else if max > 1e-9 {
            SiPrefix::Nano
        } else {
            SiPrefix::None
        }
    }
}

/// Rescale `values` so the largest magnitude reads comfortably.
///
/// Returns a new vector; the input is left untouched.
pub fn autoscale(values: &[f64]) -> Result<(Vec<f64>, SiPrefix), AutoscaleError> {
    if values.is_empty() {
        return Err(AutoscaleError::EmptyInput);
    }

    let max = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let prefix = SiPrefix::for_magnitude(max);
    let scaled = match prefix {
        SiPrefix::None => values.to_vec(),
        _ => values.iter().map(|v| v * prefix.multiplier()).collect(),
    };
    Ok((scaled, prefix))
}

/// Values ready for display along one plot axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledAxis {
    pub values: Vec<f64>,
    /// Base unit with the chosen prefix, e.g. `milliSeconds`.
    pub unit: String,
}

impl ScaledAxis {
    pub fn new(values: &[f64], unit: &str) -> Result<Self, AutoscaleError> {
        let (values, prefix) = autoscale(values)?;
        Ok(Self {
            values,
            unit: format!("{}{}", prefix.as_str(), unit),
        })
    }
}

/// `x[i] = i * x_increment` for every point in a record.
pub fn time_axis(points: usize, x_increment: f64) -> Vec<f64> {
    (0..points).map(|i| i as f64 * x_increment).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::tests::TDS_PREAMBLE;

    #[test]
    fn test_empty_input_fails() {
        assert_eq!(autoscale(&[]), Err(AutoscaleError::EmptyInput));
    }

    #[test]
    fn test_milli_band() {
        let (scaled, prefix) = autoscale(&[0.0005]).unwrap();
        assert_eq!(prefix, SiPrefix::Micro);
        assert_eq!(scaled, vec![500.0]);

        let (scaled, prefix) = autoscale(&[0.5]).unwrap();
        assert_eq!(prefix.as_str(), "milli");
        assert_eq!(scaled, vec![500.0]);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(SiPrefix::for_magnitude(1.5), SiPrefix::None);
        assert_eq!(SiPrefix::for_magnitude(1.0), SiPrefix::Milli);
        assert_eq!(SiPrefix::for_magnitude(0.0009999), SiPrefix::Micro);
        assert_eq!(SiPrefix::for_magnitude(1e-3), SiPrefix::Micro);
        assert_eq!(SiPrefix::for_magnitude(1e-6), SiPrefix::Nano);
        assert_eq!(SiPrefix::for_magnitude(1e-9), SiPrefix::None);
        assert_eq!(SiPrefix::for_magnitude(0.0), SiPrefix::None);
    }

    #[test]
    fn test_one_volt_is_milli() {
        let (scaled, prefix) = autoscale(&[1.0]).unwrap();
        assert_eq!(prefix, SiPrefix::Milli);
        assert_eq!(scaled, vec![1000.0]);
    }

    #[test]
    fn test_large_and_tiny_values_unchanged() {
        let values = [3.0, -12.5];
        assert_eq!(autoscale(&values).unwrap(), (values.to_vec(), SiPrefix::None));

        let values = [1e-12, 0.0];
        assert_eq!(autoscale(&values).unwrap(), (values.to_vec(), SiPrefix::None));
    }

    #[test]
    fn test_negative_values_use_magnitude() {
        let values = vec![-0.002, 0.001];
        let (scaled, prefix) = autoscale(&values).unwrap();
        assert_eq!(prefix, SiPrefix::Milli);
        assert!((scaled[0] + 2.0).abs() < 1e-9);
        assert!((scaled[1] - 1.0).abs() < 1e-9);
        assert_eq!(values, vec![-0.002, 0.001]);
    }

    #[test]
    fn test_scaled_axis_unit() {
        let axis = ScaledAxis::new(&[0.0, 2.5e-6, 5.0e-6], "Seconds").unwrap();
        assert_eq!(axis.unit, "microSeconds");
        assert_eq!(axis.values.len(), 3);
    }

    #[test]
    fn test_time_axis() {
        let preamble = crate::preamble::WaveformPreamble::parse("CH1", TDS_PREAMBLE).unwrap();
        let times = time_axis(preamble.number_of_points, preamble.x_increment);
        assert_eq!(times.len(), 2500);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[1], 2.0e-6);
        let axis = ScaledAxis::new(&times, &preamble.x_unit).unwrap();
        assert_eq!(axis.unit, "milliSeconds");
    }
}
