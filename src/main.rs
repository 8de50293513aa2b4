use anyhow::{Context, Result};
use clap::error::ErrorKind as ClapErrorKind;
use log::debug;
use std::io::{self, Write};
use std::process;

use read485::cli::commands::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};
use read485::cli::{build_cli, exit_code_for, list_serial_ports, read_registers, ReadTarget};
use read485::{Config, ModbusError};

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if matches.get_flag("list-ports") {
        let listing = list_serial_ports()?;
        stdout.write_all(listing.as_bytes()).context("writing port list")?;
        return Ok(());
    }

    let config = Config::from_matches(matches)?;
    let target = ReadTarget::from_matches(matches)
        .ok_or_else(|| ModbusError::InvalidArgument("missing register arguments".into()))?;
    debug!("Read target: {:?}", target);

    let output = read_registers(&config, &target)?;
    stdout.write_all(output.as_bytes()).context("writing registers")?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

fn main() {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let code = match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => EXIT_SUCCESS,
                _ => EXIT_USAGE,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging(matches.get_count("verbose"));

    if let Err(e) = execute(&matches) {
        let code = e
            .downcast_ref::<ModbusError>()
            .map(exit_code_for)
            .unwrap_or(EXIT_FAILURE);
        eprintln!("{:#}", e);
        process::exit(code);
    }
}
