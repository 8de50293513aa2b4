use clap::error::ErrorKind as ClapErrorKind;
use std::io::Write;

use read485::cli::{build_cli, ReadTarget};
use read485::config::ParityConfig;
use read485::{Config, ModbusError, OutputFormat};

fn parse(args: &[&str]) -> Result<clap::ArgMatches, clap::Error> {
    build_cli().try_get_matches_from(std::iter::once("read485").chain(args.iter().copied()))
}

#[test]
fn test_positional_arguments() {
    let matches = parse(&["/dev/ttyUSB0", "17", "0x0006", "2"]).unwrap();
    let target = ReadTarget::from_matches(&matches).unwrap();
    assert_eq!(target.slave_id, 17);
    assert_eq!(target.start_address, 6);
    assert_eq!(target.count, 2);

    let config = Config::from_matches(&matches).unwrap();
    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.format, OutputFormat::Hex);
}

#[test]
fn test_missing_arguments_are_usage_errors() {
    let err = parse(&["/dev/ttyUSB0", "17", "6"]).unwrap_err();
    assert_eq!(err.kind(), ClapErrorKind::MissingRequiredArgument);
}

#[test]
fn test_out_of_range_arguments_are_usage_errors() {
    for args in [
        ["/dev/ttyUSB0", "0", "6", "2"],
        ["/dev/ttyUSB0", "248", "6", "2"],
        ["/dev/ttyUSB0", "17", "65536", "2"],
        ["/dev/ttyUSB0", "17", "6", "0"],
        ["/dev/ttyUSB0", "17", "6", "126"],
        ["/dev/ttyUSB0", "seventeen", "6", "2"],
    ] {
        let err = parse(&args).unwrap_err();
        assert_eq!(err.kind(), ClapErrorKind::ValueValidation, "{:?}", args);
    }
}

#[test]
fn test_list_ports_needs_no_positionals() {
    let matches = parse(&["--list-ports"]).unwrap();
    assert!(matches.get_flag("list-ports"));
    assert!(ReadTarget::from_matches(&matches).is_none());
}

#[test]
fn test_command_line_overrides_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
timeout_ms = 1000
max_retries = 3
format = "json"

[serial]
baud_rate = 19200
parity = "Even"
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap();
    let matches = parse(&[
        "--config", path, "--baud", "38400", "-t", "250", "/dev/ttyS1", "1", "0", "10",
    ])
    .unwrap();
    let config = Config::from_matches(&matches).unwrap();

    assert_eq!(config.serial.port, "/dev/ttyS1");
    assert_eq!(config.serial.baud_rate, 38400);
    assert_eq!(config.serial.parity, ParityConfig::Even);
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.format, OutputFormat::Json);
}

#[test]
fn test_invalid_config_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[serial]\ndata_bits = 9\n").unwrap();

    let path = file.path().to_str().unwrap();
    let matches = parse(&["-c", path, "/dev/ttyS1", "1", "0", "10"]).unwrap();
    assert!(matches!(
        Config::from_matches(&matches),
        Err(ModbusError::ConfigError(_))
    ));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("read485.toml");

    let mut config = Config::default();
    config.serial.stop_bits = 2;
    config.format = OutputFormat::Csv;
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.serial.stop_bits, 2);
    assert_eq!(loaded.format, OutputFormat::Csv);
}
