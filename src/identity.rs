//! Instrument identification and the table of supported models.
//!
//! An `*IDN?` answer is a comma-separated record (`vendor,model,serial,...`).
//! The model field selects a [`DeviceProfile`] from a [`DeviceRegistry`];
//! the profile then knows how to split the remaining fields and how to
//! interpret the model's preamble and curve data. New instrument families
//! are added with [`DeviceRegistry::register`].
//!
//! | Model      | Vendor     | Encoding |
//! |------------|------------|----------|
//! | TDS 2024B  | Tektronix  | ASCII    |

use crate::curve::{self, CurveDecodeError};
use crate::preamble::{PreambleParseError, WaveformPreamble};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (serial {}, firmware {})",
            self.vendor, self.model, self.serial, self.firmware
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("identification has {actual} fields, expected at least {expected}")]
    FieldCount { expected: usize, actual: usize },

    #[error("malformed firmware field '{0}'")]
    MalformedFirmware(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported device: {vendor} {model}")]
pub struct UnsupportedDevice {
    pub vendor: String,
    pub model: String,
    pub idn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedDevice),

    #[error("Malformed identification '{idn}': {source}")]
    Malformed {
        idn: String,
        source: IdentityParseError,
    },
}

pub type IdentityParser = fn(&[&str]) -> Result<DeviceIdentity, IdentityParseError>;
pub type PreambleParser = fn(&str, &str) -> Result<WaveformPreamble, PreambleParseError>;
pub type CurveDecoder = fn(&str, &WaveformPreamble) -> Result<Vec<f64>, CurveDecodeError>;

/// How to talk to one model: identification layout plus the preamble/curve
/// pair used for every acquisition.
#[derive(Clone)]
pub struct DeviceProfile {
    /// Model string exactly as it appears in `*IDN?` (e.g. "TDS 2024B").
    pub model: &'static str,
    pub description: &'static str,
    pub parse_identity: IdentityParser,
    pub parse_preamble: PreambleParser,
    pub decode_curve: CurveDecoder,
}

impl fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("model", &self.model)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl DeviceProfile {
    pub fn tds2024b() -> Self {
        Self {
            model: "TDS 2024B",
            description: "Tektronix TDS 2024B digital storage oscilloscope",
            parse_identity: parse_tektronix_identity,
            parse_preamble: WaveformPreamble::parse,
            decode_curve: curve::decode_curve,
        }
    }
}

/// Tektronix layout: `vendor,model,serial,CF:<config> FV:<firmware>`.
///
/// The firmware version is the second whitespace token of the last field
/// with its three-character `FV:` tag removed.
pub fn parse_tektronix_identity(fields: &[&str]) -> Result<DeviceIdentity, IdentityParseError> {
    if fields.len() < 4 {
        return Err(IdentityParseError::FieldCount {
            expected: 4,
            actual: fields.len(),
        });
    }

    let last = fields[fields.len() - 1];
    let firmware = last
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.get(3..))
        .filter(|firmware| !firmware.is_empty())
        .ok_or_else(|| IdentityParseError::MalformedFirmware(last.to_string()))?;

    Ok(DeviceIdentity {
        vendor: fields[0].trim().to_string(),
        model: fields[1].trim().to_string(),
        serial: fields[2].trim().to_string(),
        firmware: firmware.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct ResolvedDevice {
    pub identity: DeviceIdentity,
    pub profile: DeviceProfile,
}

/// Model string to [`DeviceProfile`] lookup.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    profiles: HashMap<String, DeviceProfile>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DeviceProfile::tds2024b());
        registry
    }
}

impl DeviceRegistry {
    /// Registry with every built-in profile.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Add a profile, returning the one it replaced for the same model.
    pub fn register(&mut self, profile: DeviceProfile) -> Option<DeviceProfile> {
        self.profiles.insert(profile.model.to_string(), profile)
    }

    pub fn lookup(&self, model: &str) -> Option<&DeviceProfile> {
        self.profiles.get(model.trim())
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Resolve a raw `*IDN?` answer to an identity and its profile.
    pub fn resolve(&self, idn: &str) -> Result<ResolvedDevice, ResolveError> {
        let idn = idn.trim();
        let fields: Vec<&str> = idn.split(',').collect();
        let model = fields.get(1).map(|m| m.trim()).unwrap_or("");

        let profile = self.lookup(model).ok_or_else(|| UnsupportedDevice {
            vendor: fields[0].trim().to_string(),
            model: model.to_string(),
            idn: idn.to_string(),
        })?;

        let identity = (profile.parse_identity)(&fields).map_err(|source| ResolveError::Malformed {
            idn: idn.to_string(),
            source,
        })?;

        log::debug!("Resolved {} to profile '{}'", identity, profile.description);
        Ok(ResolvedDevice {
            identity,
            profile: profile.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TDS_IDN: &str = "TEKTRONIX,TDS 2024B,C010947,CF:91.1CT FV:v22.11\n";

    #[test]
    fn test_resolve_tds2024b() {
        let resolved = DeviceRegistry::new().resolve(TDS_IDN).unwrap();
        assert_eq!(
            resolved.identity,
            DeviceIdentity {
                vendor: "TEKTRONIX".to_string(),
                model: "TDS 2024B".to_string(),
                serial: "C010947".to_string(),
                firmware: "v22.11".to_string(),
            }
        );
        assert_eq!(resolved.profile.model, "TDS 2024B");
    }

    #[test]
    fn test_unknown_model_is_unsupported() {
        let err = DeviceRegistry::new()
            .resolve("TEKTRONIX,TDS 1002,C000001,CF:91.1CT FV:v1.00")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::Unsupported(UnsupportedDevice {
                vendor: "TEKTRONIX".to_string(),
                model: "TDS 1002".to_string(),
                idn: "TEKTRONIX,TDS 1002,C000001,CF:91.1CT FV:v1.00".to_string(),
            })
        );
    }

    #[test]
    fn test_garbage_is_unsupported() {
        assert!(matches!(
            DeviceRegistry::new().resolve(""),
            Err(ResolveError::Unsupported(_))
        ));
    }

    #[test]
    fn test_malformed_firmware_field() {
        let err = DeviceRegistry::new()
            .resolve("TEKTRONIX,TDS 2024B,C010947,CF:91.1CT")
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Malformed {
                source: IdentityParseError::MalformedFirmware(_),
                ..
            }
        ));

        let err = DeviceRegistry::new()
            .resolve("TEKTRONIX,TDS 2024B,C010947,CF:91.1CT FV:")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::Malformed {
                idn: "TEKTRONIX,TDS 2024B,C010947,CF:91.1CT FV:".to_string(),
                source: IdentityParseError::MalformedFirmware("CF:91.1CT FV:".to_string()),
            }
        );

        let err = DeviceRegistry::new().resolve("TEKTRONIX,TDS 2024B").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Malformed {
                source: IdentityParseError::FieldCount { actual: 2, .. },
                ..
            }
        ));
    }

    fn parse_plain_identity(fields: &[&str]) -> Result<DeviceIdentity, IdentityParseError> {
        Ok(DeviceIdentity {
            vendor: fields[0].to_string(),
            model: fields[1].to_string(),
            serial: fields.get(2).unwrap_or(&"").to_string(),
            firmware: fields.get(3).unwrap_or(&"").to_string(),
        })
    }

    #[test]
    fn test_registered_profile_is_resolved() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.lookup("DS1054Z").is_none());

        let replaced = registry.register(DeviceProfile {
            model: "DS1054Z",
            description: "Rigol DS1054Z",
            parse_identity: parse_plain_identity,
            parse_preamble: WaveformPreamble::parse,
            decode_curve: curve::decode_curve,
        });
        assert!(replaced.is_none());

        let resolved = registry.resolve("RIGOL TECHNOLOGIES,DS1054Z,DS1ZA0001,00.04.04").unwrap();
        assert_eq!(resolved.identity.serial, "DS1ZA0001");
        assert_eq!(resolved.identity.firmware, "00.04.04");
        assert_eq!(registry.models().count(), 2);

        // TDS still resolves alongside it.
        assert!(registry.resolve(TDS_IDN).is_ok());
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        assert!(matches!(
            DeviceRegistry::empty().resolve(TDS_IDN),
            Err(ResolveError::Unsupported(_))
        ));
    }
}
