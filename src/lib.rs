//! # ScopeOut RS
//!
//! A Rust library for discovering bench oscilloscopes and retrieving their
//! captured waveforms in physical units.
//!
//! The library identifies instruments from their `*IDN?` answer, reads the
//! waveform preamble that describes the current acquisition, decodes raw ADC
//! curves into volts and seconds, and scales them for display.
//!
//! ## Features
//!
//! - **Device discovery**: Uses `serialport` to find USB instruments and a
//!   [`DeviceRegistry`] to match them to a supported model
//! - **Typed preamble**: All-or-nothing parsing of the `WFMP?` record
//! - **Curve decoding**: ADC codes to physical values, re-reading the preamble
//!   before every curve
//! - **Display scaling**: SI prefix selection (milli, micro, nano) per axis
//! - **Trigger polling**: Bounded, cancellable wait for a trigger
//! - **DataFrame output**: Uses `polars` for exporting captures
//!
//! ## Examples
//!
//! ### Finding a scope and reading a curve
//!
//! ```rust,no_run
//! use scopeout_rs::ScopeFinder;
//!
//! let scopes = ScopeFinder::default().find_serial_scopes()?;
//! if let Some(mut scope) = scopes.into_iter().next() {
//!     println!("{}", scope);
//!     let volts = scope.fetch_curve()?;
//!     println!("Captured {} samples", volts.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Decoding without hardware
//!
//! ```rust
//! use scopeout_rs::{autoscale, decode_curve, SiPrefix, WaveformPreamble};
//!
//! let preamble = WaveformPreamble::parse(
//!     "CH1",
//!     "1;8;ASC;RP;MSB;3;\"Ch1\";Y;1.0E-3;0;0.0;\"s\";1.0E-3;0.0;1.28E2;\"Volts\"",
//! )?;
//! let volts = decode_curve("128,228,28", &preamble)?;
//! let (scaled, prefix) = autoscale(&volts)?;
//! assert_eq!(prefix, SiPrefix::Milli);
//! assert_eq!(scaled.len(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Waiting for a trigger
//!
//! ```rust,no_run
//! use scopeout_rs::{DeviceRegistry, Oscilloscope, PollConfig, SerialTransport, TransportConfig};
//! use std::time::Duration;
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", TransportConfig::default())?;
//! let mut scope = Oscilloscope::connect(transport, &DeviceRegistry::new())
//!     .map_err(|(_, e)| e)?
//!     .with_poll_config(PollConfig::default().with_max_wait(Duration::from_secs(5)));
//!
//! let plot = scope.triggered_plot_data(|| false)?;
//! println!("x in {}, y in {}", plot.x.unit, plot.y.unit);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod autoscale;
pub mod curve;
pub mod identity;
pub mod oscilloscope;
pub mod preamble;
pub mod scope_finder;
pub mod transport;
pub mod trigger;

// Re-export the main types for convenience
pub use autoscale::{autoscale, time_axis, AutoscaleError, ScaledAxis, SiPrefix};

pub use curve::{decode_curve, CurveDecodeError, CurvePolicy, Waveform, WaveformParseError};

pub use identity::{
    DeviceIdentity, DeviceProfile, DeviceRegistry, IdentityParseError, ResolveError,
    ResolvedDevice, UnsupportedDevice,
};

pub use oscilloscope::{AcquisitionMode, Oscilloscope, PlotData, ScopeError};

pub use preamble::{BinaryFormat, Encoding, PreambleParseError, WaveformPreamble};

pub use scope_finder::{Discovery, ScopeFinder};

pub use transport::{SerialTransport, Transport, TransportConfig, TransportError};

pub use trigger::{poll_trigger_until_fired, PollConfig, PollError, TriggerState};
