use crate::autoscale::{AutoscaleError, ScaledAxis};
use crate::curve::{split_waveform_response, CurveDecodeError, CurvePolicy, Waveform};
use crate::identity::{DeviceIdentity, DeviceProfile, DeviceRegistry, ResolveError, ResolvedDevice};
use crate::preamble::{PreambleParseError, WaveformPreamble};
use crate::transport::{Transport, TransportError};
use crate::trigger::{poll_trigger_until_fired, PollConfig, PollError, TriggerState};
use polars::prelude::{DataFrame, PolarsError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    Sample,
    Peak,
    Average,
}

impl AcquisitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMode::Sample => "SAMPLE",
            AcquisitionMode::Peak => "PEAK",
            AcquisitionMode::Average => "AVERAGE",
        }
    }
}

/// Averaging depths accepted by `ACQ:NUMAV`.
pub const AVERAGE_COUNTS: [u32; 4] = [4, 16, 64, 128];

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Identification failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Invalid preamble: {0}")]
    Preamble(#[from] PreambleParseError),

    #[error("Invalid curve: {0}")]
    Curve(#[from] CurveDecodeError),

    #[error("Cannot scale axis: {0}")]
    Autoscale(#[from] AutoscaleError),

    #[error("Waiting for trigger failed: {0}")]
    Trigger(#[from] PollError<TransportError>),

    #[error("Invalid value {value} for {setting}")]
    InvalidSetting { setting: &'static str, value: String },

    #[error("DataFrame error: {0}")]
    DataFrame(#[from] PolarsError),
}

/// Both axes of a capture, scaled for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub x: ScaledAxis,
    pub y: ScaledAxis,
}

/// A connected, identified oscilloscope.
///
/// Owns its transport exclusively. Every acquisition re-reads the preamble
/// first; no acquisition state is kept between calls.
#[derive(Debug)]
pub struct Oscilloscope<T: Transport> {
    transport: T,
    identity: DeviceIdentity,
    profile: DeviceProfile,
    curve_policy: CurvePolicy,
    poll_config: PollConfig,
}

impl<T: Transport> Oscilloscope<T> {
    pub fn new(transport: T, device: ResolvedDevice) -> Self {
        Self {
            transport,
            identity: device.identity,
            profile: device.profile,
            curve_policy: CurvePolicy::default(),
            poll_config: PollConfig::default(),
        }
    }

    /// Identify the instrument behind `transport` and wrap it.
    ///
    /// On failure the transport is handed back so the caller can close or
    /// reuse it.
    pub fn connect(mut transport: T, registry: &DeviceRegistry) -> Result<Self, (T, ScopeError)> {
        let idn = match transport.query("*IDN?") {
            Ok(idn) => idn,
            Err(e) => return Err((transport, e.into())),
        };
        match registry.resolve(&idn) {
            Ok(device) => {
                log::info!("Connected to {}", device.identity);
                Ok(Self::new(transport, device))
            }
            Err(e) => Err((transport, e.into())),
        }
    }

    pub fn with_curve_policy(mut self, policy: CurvePolicy) -> Self {
        self.curve_policy = policy;
        self
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.transport.write(command)
    }

    pub fn read(&mut self) -> Result<String, TransportError> {
        Ok(self.transport.read()?.trim().to_string())
    }

    pub fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.transport.query(command)
    }

    /// Read the active data channel and the current preamble.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn fetch_preamble(&mut self) -> Result<WaveformPreamble, ScopeError> {
        let channel = self.transport.query("DAT:SOU?")?;
        let raw = self.transport.query("WFMP?")?;
        let preamble = (self.profile.parse_preamble)(&channel, &raw)?;
        log::debug!(
            "Preamble for {}: {} points, {} {}/pt",
            preamble.data_channel,
            preamble.number_of_points,
            preamble.x_increment,
            preamble.x_unit
        );
        Ok(preamble)
    }

    /// Fresh preamble plus the curve acquired right after it.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn fetch_capture(&mut self) -> Result<Waveform, ScopeError> {
        let preamble = self.fetch_preamble()?;
        let raw = self.transport.query("CURV?")?;
        let samples = (self.profile.decode_curve)(&raw, &preamble)?;
        let samples = self.curve_policy.check(samples, &preamble)?;
        Ok(Waveform { preamble, samples })
    }

    /// Curve in physical units.
    pub fn fetch_curve(&mut self) -> Result<Vec<f64>, ScopeError> {
        Ok(self.fetch_capture()?.samples)
    }

    /// Capture as a time/value [`DataFrame`].
    pub fn fetch_dataframe(&mut self) -> Result<DataFrame, ScopeError> {
        Ok(self.fetch_capture()?.to_dataframe()?)
    }

    /// Raw `WAVF?` response.
    pub fn fetch_waveform_raw(&mut self) -> Result<String, TransportError> {
        self.transport.query("WAVF?")
    }

    /// Preamble and curve from a single `WAVF?` round trip.
    pub fn fetch_waveform(&mut self) -> Result<Waveform, ScopeError> {
        let channel = self.transport.query("DAT:SOU?")?;
        let raw = self.fetch_waveform_raw()?;
        let (preamble, curve) = split_waveform_response(&raw);
        let preamble = (self.profile.parse_preamble)(&channel, preamble)?;
        let samples = (self.profile.decode_curve)(curve, &preamble)?;
        let samples = self.curve_policy.check(samples, &preamble)?;
        Ok(Waveform { preamble, samples })
    }

    /// Acquire a curve and scale both axes for display.
    pub fn plot_data(&mut self) -> Result<PlotData, ScopeError> {
        let waveform = self.fetch_capture()?;
        Ok(PlotData {
            x: ScaledAxis::new(&waveform.times(), &waveform.preamble.x_unit)?,
            y: ScaledAxis::new(&waveform.samples, &waveform.preamble.y_unit)?,
        })
    }

    pub fn check_trigger(&mut self) -> Result<TriggerState, TransportError> {
        Ok(TriggerState::from(self.transport.query("TRIG:STATE?")?.as_str()))
    }

    /// Block until the trigger fires, `is_cancelled` returns true, or the
    /// configured poll bounds run out.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn poll_trigger<C>(&mut self, is_cancelled: C) -> Result<TriggerState, PollError<TransportError>>
    where
        C: FnMut() -> bool,
    {
        let config = self.poll_config.clone();
        poll_trigger_until_fired(|| self.check_trigger(), is_cancelled, &config)
    }

    /// Wait for a trigger, then acquire and scale the capture.
    pub fn triggered_plot_data<C>(&mut self, is_cancelled: C) -> Result<PlotData, ScopeError>
    where
        C: FnMut() -> bool,
    {
        self.poll_trigger(is_cancelled)?;
        self.plot_data()
    }

    /// Vendor, model, serial, active channel and encoding.
    pub fn describe(&mut self) -> Result<String, ScopeError> {
        let preamble = self.fetch_preamble()?;
        Ok(format!(
            "{}. Output on {} in {} format.",
            self,
            preamble.data_channel,
            preamble.encoding.as_str()
        ))
    }

    fn set_param(&mut self, command: &str) -> Result<(), TransportError> {
        log::debug!("Setting {}", command);
        self.transport.write(command)
    }

    fn get_param(&mut self, command: &str) -> Result<String, TransportError> {
        Ok(self.transport.query(command)?.trim_matches('\'').to_string())
    }

    pub fn acquisition_params(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ?")
    }

    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), TransportError> {
        self.set_param(&format!("ACQ:MOD {}", mode.as_str()))
    }

    pub fn acquisition_mode(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ:MOD?")
    }

    pub fn number_of_acquisitions(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ:NUMAC?")
    }

    /// Acquisitions averaged together in [`AcquisitionMode::Average`].
    pub fn set_acqs_for_average(&mut self, acqs: u32) -> Result<(), ScopeError> {
        if !AVERAGE_COUNTS.contains(&acqs) {
            return Err(ScopeError::InvalidSetting {
                setting: "ACQ:NUMAV",
                value: acqs.to_string(),
            });
        }
        Ok(self.set_param(&format!("ACQ:NUMAV {}", acqs))?)
    }

    pub fn acqs_for_average(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ:NUMAV?")
    }

    /// `OFF | ON | RUN | STOP | <NR1>`
    pub fn set_acq_state(&mut self, state: &str) -> Result<(), TransportError> {
        self.set_param(&format!("ACQ:STATE {}", state))
    }

    pub fn acq_state(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ:STATE?")
    }

    /// `RUNSTOP | SEQUENCE`
    pub fn set_acq_stop(&mut self, stop: &str) -> Result<(), TransportError> {
        self.set_param(&format!("ACQ:STOPA {}", stop))
    }

    pub fn acq_stop(&mut self) -> Result<String, TransportError> {
        self.get_param("ACQ:STOPA?")
    }

    /// Run the internal self calibration and return its result.
    pub fn calibrate(&mut self) -> Result<String, TransportError> {
        self.get_param("*CAL?")
    }

    pub fn abort_calibrate(&mut self) -> Result<(), TransportError> {
        self.set_param("CAL:ABO")
    }

    pub fn continue_calibrate(&mut self) -> Result<(), TransportError> {
        self.set_param("CAL:CONTINUE")
    }

    pub fn factory_calibrate(&mut self) -> Result<(), TransportError> {
        self.set_param("CAL:FAC")
    }

    pub fn internal_calibrate(&mut self) -> Result<(), TransportError> {
        self.set_param("CAL:INTERNAL")
    }

    /// `PASS` or `FAIL` for the last calibration.
    pub fn cal_status(&mut self) -> Result<String, TransportError> {
        self.get_param("CAL:STATUS?")
    }

    pub fn diagnostic_result(&mut self) -> Result<String, TransportError> {
        self.get_param("DIA:RESUL:FLA?")
    }

    pub fn diagnostic_log(&mut self) -> Result<String, TransportError> {
        Ok(self.get_param("DIA:RESUL:LOG?")?.trim().to_string())
    }

    /// First entry of the error log; empty when the log is empty.
    pub fn first_error(&mut self) -> Result<String, TransportError> {
        self.get_param("ERRLOG:FIRST?")
    }

    pub fn next_error(&mut self) -> Result<String, TransportError> {
        self.get_param("ERRLOG:NEXT?")
    }

    pub fn cursor(&mut self) -> Result<String, TransportError> {
        self.get_param("CURS?")
    }

    pub fn all_events(&mut self) -> Result<String, TransportError> {
        self.get_param("ALLE?")
    }
}

impl<T: Transport> fmt::Display for Oscilloscope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Oscilloscope. Serial Number: {}",
            self.identity.vendor, self.identity.model, self.identity.serial
        )
    }
}
