use clap::ArgMatches;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::output::OutputFormat;
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeout_ms: u64,

    // Caller-side retry policy; the transaction engine never retries
    pub max_retries: u32,
    pub retry_delay_ms: u64,

    // Output settings
    pub format: OutputFormat,

    // Connection settings, last so it serializes as a trailing [serial] table
    pub serial: SerialConfig,
}

/// Line parameters of the serial connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    #[serde(skip)]
    pub port: String,
    pub baud_rate: u32,
    pub parity: ParityConfig,
    pub data_bits: u8,
    pub stop_bits: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityConfig {
    None,
    Even,
    Odd,
}

impl From<ParityConfig> for serialport::Parity {
    fn from(parity: ParityConfig) -> Self {
        match parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        }
    }
}

impl std::str::FromStr for ParityConfig {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(ParityConfig::None),
            "even" | "e" => Ok(ParityConfig::Even),
            "odd" | "o" => Ok(ParityConfig::Odd),
            other => Err(ModbusError::ConfigError(format!("unknown parity '{}'", other))),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        // 9600 8N1, the usual RS-485 meter setting
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            parity: ParityConfig::None,
            data_bits: 8,
            stop_bits: 1,
        }
    }
}

impl SerialConfig {
    pub fn serial_data_bits(&self) -> Result<serialport::DataBits, ModbusError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(ModbusError::ConfigError(format!(
                "data bits must be 5-8, got {}",
                other
            ))),
        }
    }

    pub fn serial_stop_bits(&self) -> Result<serialport::StopBits, ModbusError> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            other => Err(ModbusError::ConfigError(format!(
                "stop bits must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            max_retries: 0,
            retry_delay_ms: 100,
            format: OutputFormat::Hex,
            serial: SerialConfig::default(),
        }
    }
}

impl Config {
    /// Builds the effective configuration: defaults, then the `--config`
    /// file if given, then explicit command line options.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ModbusError> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = matches.get_one::<String>("device") {
            config.serial.port = port.clone();
        }
        if let Some(baud) = matches.get_one::<u32>("baud") {
            config.serial.baud_rate = *baud;
        }
        if let Some(parity) = matches.get_one::<String>("parity") {
            config.serial.parity = parity.parse()?;
        }
        if let Some(data_bits) = matches.get_one::<u8>("data-bits") {
            config.serial.data_bits = *data_bits;
        }
        if let Some(stop_bits) = matches.get_one::<u8>("stop-bits") {
            config.serial.stop_bits = *stop_bits;
        }
        if let Some(timeout) = matches.get_one::<u64>("timeout") {
            config.timeout_ms = *timeout;
        }
        if let Some(retries) = matches.get_one::<u32>("retries") {
            config.max_retries = *retries;
        }
        if let Some(delay) = matches.get_one::<u64>("retry-delay") {
            config.retry_delay_ms = *delay;
        }
        if let Some(format) = matches.get_one::<String>("format") {
            config.format = format.parse()?;
        }

        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModbusError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ModbusError::ConfigError(format!("TOML error: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.serial.baud_rate == 0 {
            return Err(ModbusError::ConfigError("baud rate must be non-zero".into()));
        }
        self.serial.serial_data_bits()?;
        self.serial.serial_stop_bits()?;
        if self.timeout_ms == 0 {
            return Err(ModbusError::ConfigError("timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
