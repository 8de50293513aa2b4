use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::ModbusError;

/// Registers returned by one successful transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterReading {
    pub slave_id: u8,
    pub start_address: u16,
    pub values: Vec<u16>,
    pub timestamp: DateTime<Utc>,
}

impl RegisterReading {
    pub fn new(slave_id: u8, start_address: u16, values: Vec<u16>) -> Self {
        Self {
            slave_id,
            start_address,
            values,
            timestamp: Utc::now(),
        }
    }

    /// `(register address, value)` pairs in request order.
    pub fn addressed(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.start_address as u32 + i as u32, *v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Hex,
    Decimal,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn formatter(&self) -> Box<dyn DataFormatter> {
        match self {
            OutputFormat::Hex => Box::new(HexFormatter),
            OutputFormat::Decimal => Box::new(DecimalFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(OutputFormat::Hex),
            "decimal" | "dec" => Ok(OutputFormat::Decimal),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ModbusError::ConfigError(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

pub trait DataFormatter: Send + Sync {
    /// Renders a reading, trailing newline included.
    fn format(&self, reading: &RegisterReading) -> String;
}

/// `0x1234 0xabcd`, the classic output of this tool.
pub struct HexFormatter;

impl DataFormatter for HexFormatter {
    fn format(&self, reading: &RegisterReading) -> String {
        let mut output = reading
            .values
            .iter()
            .map(|v| format!("0x{:x}", v))
            .collect::<Vec<_>>()
            .join(" ");
        output.push('\n');
        output
    }
}

pub struct DecimalFormatter;

impl DataFormatter for DecimalFormatter {
    fn format(&self, reading: &RegisterReading) -> String {
        let mut output = reading
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        output.push('\n');
        output
    }
}

pub struct JsonFormatter;

impl DataFormatter for JsonFormatter {
    fn format(&self, reading: &RegisterReading) -> String {
        let json_data = serde_json::json!({
            "slave_id": reading.slave_id,
            "start_address": reading.start_address,
            "timestamp": reading.timestamp.to_rfc3339(),
            "registers": reading.values,
        });

        let mut output = serde_json::to_string(&json_data).unwrap_or_default();
        output.push('\n');
        output
    }
}

pub struct CsvFormatter;

impl DataFormatter for CsvFormatter {
    fn format(&self, reading: &RegisterReading) -> String {
        let timestamp = reading.timestamp.to_rfc3339();
        let mut csv = String::from("Slave,Register,Value,Timestamp\n");

        for (address, value) in reading.addressed() {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                reading.slave_id, address, value, timestamp
            ));
        }
        csv
    }
}
