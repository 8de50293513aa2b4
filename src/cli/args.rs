use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::modbus::protocol::{MAX_READ_REGISTERS, MAX_SLAVE_ID, MIN_SLAVE_ID};

/// Which registers to read, taken from the positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTarget {
    pub slave_id: u8,
    pub start_address: u16,
    pub count: u16,
}

impl ReadTarget {
    /// `None` when the positionals are absent (only possible with `--list-ports`).
    pub fn from_matches(matches: &ArgMatches) -> Option<Self> {
        Some(Self {
            slave_id: *matches.get_one::<u8>("slave_id")?,
            start_address: *matches.get_one::<u16>("start_address")?,
            count: *matches.get_one::<u16>("count")?,
        })
    }
}

pub fn build_cli() -> Command {
    Command::new("read485")
        .version(crate::VERSION)
        .about("Read Modbus RTU holding registers over a serial line and print them in hex")
        .arg(
            Arg::new("device")
                .value_name("DEVICE")
                .help("Serial device, e.g. /dev/ttyUSB0")
                .required_unless_present("list-ports"),
        )
        .arg(
            Arg::new("slave_id")
                .value_name("SLAVE_ID")
                .help("Slave address (1-247)")
                .value_parser(parse_slave_id)
                .required_unless_present("list-ports"),
        )
        .arg(
            Arg::new("start_address")
                .value_name("START_ADDRESS")
                .help("First register address (decimal or 0x-prefixed hex)")
                .value_parser(parse_address)
                .required_unless_present("list-ports"),
        )
        .arg(
            Arg::new("count")
                .value_name("COUNT")
                .help("Number of registers to read (1-125)")
                .value_parser(parse_count)
                .required_unless_present("list-ports"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("baud")
                .short('b')
                .long("baud")
                .value_name("RATE")
                .help("Baud rate [default: 9600]")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("parity")
                .long("parity")
                .help("Parity [default: none]")
                .value_parser(["none", "even", "odd"]),
        )
        .arg(
            Arg::new("data-bits")
                .long("data-bits")
                .value_name("BITS")
                .help("Data bits [default: 8]")
                .value_parser(value_parser!(u8).range(5..=8)),
        )
        .arg(
            Arg::new("stop-bits")
                .long("stop-bits")
                .value_name("BITS")
                .help("Stop bits [default: 1]")
                .value_parser(value_parser!(u8).range(1..=2)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Response timeout in milliseconds [default: 500]")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("retries")
                .short('r')
                .long("retries")
                .value_name("N")
                .help("Attempts to repeat after a timeout, CRC or line error [default: 0]")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("retry-delay")
                .long("retry-delay")
                .value_name("MS")
                .help("Pause between attempts in milliseconds [default: 100]")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Output format [default: hex]")
                .value_parser(["hex", "decimal", "json", "csv"]),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (repeatable)")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .help("List available serial ports and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|_| format!("'{}' is not a number", s))
}

fn parse_in_range(s: &str, min: u32, max: u32) -> Result<u32, String> {
    let value = parse_number(s)?;
    if value < min || value > max {
        return Err(format!("{} is not in {}-{}", value, min, max));
    }
    Ok(value)
}

fn parse_slave_id(s: &str) -> Result<u8, String> {
    parse_in_range(s, MIN_SLAVE_ID as u32, MAX_SLAVE_ID as u32).map(|v| v as u8)
}

fn parse_address(s: &str) -> Result<u16, String> {
    parse_in_range(s, 0, u16::MAX as u32).map(|v| v as u16)
}

fn parse_count(s: &str) -> Result<u16, String> {
    parse_in_range(s, 1, MAX_READ_REGISTERS as u32).map(|v| v as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("17"), Ok(17));
        assert_eq!(parse_number("0x033F"), Ok(0x033F));
        assert_eq!(parse_number("0X10"), Ok(16));
        assert!(parse_number("abc").is_err());
        assert!(parse_number("-1").is_err());
        assert!(parse_number("").is_err());
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(parse_slave_id("247"), Ok(247));
        assert!(parse_slave_id("0").is_err());
        assert!(parse_slave_id("248").is_err());
        assert_eq!(parse_count("125"), Ok(125));
        assert!(parse_count("126").is_err());
        assert!(parse_count("0").is_err());
        assert_eq!(parse_address("65535"), Ok(65535));
        assert!(parse_address("65536").is_err());
    }
}
