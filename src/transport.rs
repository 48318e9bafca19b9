use serialport::{SerialPort, SerialPortType};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// A duplex text channel to a single instrument.
///
/// Implementations own their bus handle exclusively. `read` must return one
/// complete response (without its terminator) or fail with
/// [`TransportError::Timeout`] once the configured bus timeout elapses.
pub trait Transport {
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    fn read(&mut self) -> Result<String, TransportError>;

    /// Write `command` and read back the trimmed response.
    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.write(command)?;
        Ok(self.read()?.trim().to_string())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn read(&mut self) -> Result<String, TransportError> {
        (**self).read()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Bus(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: no response after {timeout:?} (received so far: '{partial}')")]
    Timeout { timeout: Duration, partial: String },

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub baud_rate: u32,
    /// Upper bound for a single `read()`.
    pub timeout: Duration,
    pub terminator: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(1),
            terminator: b'\n',
        }
    }
}

impl TransportConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Line-oriented transport over a serial / USB virtual COM port.
pub struct SerialTransport {
    serial: Box<dyn SerialPort>,
    config: TransportConfig,
    port: String,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port)
            .field("config", &self.config)
            .finish()
    }
}

impl SerialTransport {
    /// Open `port` and discard anything left in its buffers.
    pub fn open(port: &str, config: TransportConfig) -> Result<Self, TransportError> {
        log::debug!("Opening {} at {} baud", port, config.baud_rate);
        let serial = serialport::new(port, config.baud_rate)
            .timeout(Duration::from_millis(10))
            .open()?;

        let mut transport = Self {
            serial,
            config,
            port: port.to_string(),
        };
        transport.flush()?;
        Ok(transport)
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.serial.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    /// Names of all USB serial ports currently present on the host.
    pub fn usb_ports() -> Result<Vec<String>, TransportError> {
        let ports = serialport::available_ports()?
            .into_iter()
            .filter(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
            .map(|p| p.port_name)
            .collect();
        Ok(ports)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        log::trace!("{} <- {}", self.port, command);
        let command_with_newline = format!("{}\n", command);
        self.serial.write_all(command_with_newline.as_bytes())?;
        Ok(())
    }

    fn read(&mut self) -> Result<String, TransportError> {
        let mut response = Vec::new();
        let now = Instant::now();

        loop {
            let mut byte = [0u8; 1];
            match self.serial.read_exact(&mut byte) {
                Ok(()) => {
                    if byte[0] == self.config.terminator {
                        break;
                    }
                    response.push(byte[0]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    if now.elapsed() >= self.config.timeout {
                        return Err(TransportError::Timeout {
                            timeout: self.config.timeout,
                            partial: String::from_utf8_lossy(&response).to_string(),
                        });
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        let response = String::from_utf8(response)?;
        log::trace!("{} -> {}", self.port, response);
        Ok(response.trim_end_matches('\r').to_string())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted transport: each `write` is matched against the next expected
    /// command and queues its canned response for the following `read`.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        expectations: VecDeque<(String, Option<String>)>,
        pending: VecDeque<String>,
        pub sent: Vec<String>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn expect(mut self, command: &str, response: &str) -> Self {
            self.expectations
                .push_back((command.to_string(), Some(response.to_string())));
            self
        }

        /// A command that produces no response.
        pub fn expect_write(mut self, command: &str) -> Self {
            self.expectations.push_back((command.to_string(), None));
            self
        }

        /// A query whose response never arrives.
        pub fn expect_silence(self, command: &str) -> Self {
            self.expect_write(command)
        }

        pub fn is_exhausted(&self) -> bool {
            self.expectations.is_empty()
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, command: &str) -> Result<(), TransportError> {
            self.sent.push(command.to_string());
            let (expected, response) = self.expectations.pop_front().ok_or_else(|| {
                TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    format!("unexpected command '{}'", command),
                ))
            })?;
            assert_eq!(expected, command, "mock transport got the wrong command");
            if let Some(response) = response {
                self.pending.push_back(response);
            }
            Ok(())
        }

        fn read(&mut self) -> Result<String, TransportError> {
            self.pending.pop_front().ok_or(TransportError::Timeout {
                timeout: Duration::from_millis(0),
                partial: String::new(),
            })
        }
    }
}
