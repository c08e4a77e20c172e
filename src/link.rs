use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use crate::drivers::command::OutboundCommand;
use crate::drivers::error::DriverError;
use crate::drivers::source::ByteSource;

/// Serial connection settings for the acquisition device.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            read_timeout_ms: 50,
        }
    }
}

impl LinkConfig {
    /// Loads settings from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read link config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse link config {}", path.display()))
    }
}

/// Serial-port-backed byte source for the acquisition device.
///
/// Owns the read direction of the connection; an independent write handle
/// for the control context comes from [`SerialLink::command_port`].
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialLink {
    /// Opens the configured port at the device's fixed 8N1 framing.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .with_context(|| format!("failed to open serial port {}", config.port))?;
        info!("connected to {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port: Some(port),
            name: config.port.clone(),
        })
    }

    /// Independent write handle over the same connection, so outbound
    /// commands are not serialized behind the ingestion poll loop.
    pub fn command_port(&self) -> Result<CommandPort> {
        let port = self
            .port
            .as_ref()
            .ok_or(DriverError::PortClosed)?
            .try_clone()
            .context("failed to clone serial handle for the write direction")?;
        Ok(CommandPort { port })
    }
}

impl ByteSource for SerialLink {
    fn read_available(&mut self) -> Result<Vec<u8>, DriverError> {
        let port = self.port.as_mut().ok_or(DriverError::PortClosed)?;
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        let mut chunk = vec![0u8; pending];
        port.read_exact(&mut chunk)?;
        Ok(chunk)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        let port = self.port.as_mut().ok_or(DriverError::PortClosed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("closed serial port {}", self.name);
        }
    }
}

/// Write half used by the control context for device commands.
pub struct CommandPort {
    port: Box<dyn SerialPort>,
}

impl CommandPort {
    /// Encodes one control intent and writes it to the device.
    pub fn send(&mut self, command: OutboundCommand) -> Result<(), DriverError> {
        debug!("sending {command:?}: {:02X?}", command.encode());
        self.port.write_all(command.encode())?;
        self.port.flush()?;
        Ok(())
    }

    /// Writes an operator-supplied raw payload.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        debug!("sending raw payload {bytes:02X?}");
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}

/// Names of the serial ports currently present on the host.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_device() {
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert!(config.port.is_empty());
    }

    #[test]
    fn config_json_round_trips_and_fills_defaults() {
        let parsed: LinkConfig = serde_json::from_str(r#"{"port":"/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(parsed.port, "/dev/ttyUSB0");
        assert_eq!(parsed.baud_rate, 9600);

        let full: LinkConfig =
            serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();
        assert_eq!(full.port, parsed.port);
        assert_eq!(full.read_timeout_ms, parsed.read_timeout_ms);
    }
}
