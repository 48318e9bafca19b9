use crate::identity::{DeviceRegistry, ResolveError};
use crate::oscilloscope::{Oscilloscope, ScopeError};
use crate::transport::{SerialTransport, Transport, TransportConfig, TransportError};

/// Outcome of identifying a batch of instruments.
#[derive(Debug)]
pub struct Discovery<T: Transport> {
    pub scopes: Vec<Oscilloscope<T>>,
    /// Instruments that answered but could not be used, with the reason.
    pub rejected: Vec<(T, ScopeError)>,
}

impl<T: Transport> Discovery<T> {
    pub fn unsupported_count(&self) -> usize {
        self.rejected
            .iter()
            .filter(|(_, e)| matches!(e, ScopeError::Resolve(ResolveError::Unsupported(_))))
            .count()
    }
}

/// Finds supported oscilloscopes among connected instruments.
#[derive(Debug, Clone, Default)]
pub struct ScopeFinder {
    registry: DeviceRegistry,
    config: TransportConfig,
}

impl ScopeFinder {
    pub fn new(registry: DeviceRegistry, config: TransportConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    /// Identify every transport in turn. A failing or unsupported
    /// instrument never stops the rest of the batch.
    pub fn identify_all<T, I>(&self, transports: I) -> Discovery<T>
    where
        T: Transport,
        I: IntoIterator<Item = T>,
    {
        let mut discovery = Discovery {
            scopes: Vec::new(),
            rejected: Vec::new(),
        };

        for transport in transports {
            match Oscilloscope::connect(transport, &self.registry) {
                Ok(scope) => discovery.scopes.push(scope),
                Err((transport, e)) => {
                    log::warn!("Skipping instrument: {}", e);
                    discovery.rejected.push((transport, e));
                }
            }
        }

        log::debug!(
            "Discovery found {} scope(s), rejected {} instrument(s)",
            discovery.scopes.len(),
            discovery.rejected.len()
        );
        discovery
    }

    /// Open every USB serial port and keep the ones with a supported scope.
    pub fn find_serial_scopes(&self) -> Result<Vec<Oscilloscope<SerialTransport>>, TransportError> {
        let mut transports = Vec::new();
        for port in SerialTransport::usb_ports()? {
            match SerialTransport::open(&port, self.config.clone()) {
                Ok(transport) => transports.push(transport),
                Err(e) => log::warn!("Cannot open {}: {}", port, e),
            }
        }

        if transports.is_empty() {
            log::info!("No USB instruments detected");
        }
        Ok(self.identify_all(transports).scopes)
    }
}
