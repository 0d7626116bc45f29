//! Command-line interface definition using clap derive.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use votekey_core::constants::{DEFAULT_SECURITY_LEVEL, MAX_SECURITY_LEVEL, MIN_SECURITY_LEVEL};

/// Drive an R307 fingerprint sensor bridge over serial.
#[derive(Debug, Parser)]
#[command(name = "votekey")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Serial port of the sensor bridge
    #[arg(short, long, global = true, env = "VOTEKEY_PORT")]
    pub port: Option<String>,

    /// Baud rate of the sensor bridge
    #[arg(short, long, global = true, env = "VOTEKEY_BAUD")]
    pub baud: Option<u32>,

    /// JSON scanner configuration file; --port and --baud override it
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a simulated sensor instead of a serial port
    #[arg(long, global = true)]
    pub mock: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG wins if set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List serial ports on this machine
    Ports,

    /// Open the port and report the readiness handshake
    Probe,

    /// Enroll a finger, printing each status change
    Enroll(EnrollArgs),

    /// Scan a finger against the enrolled templates
    Scan(ScanArgs),

    /// Report whether the scanner is connected
    Status,
}

#[derive(Debug, Args)]
pub struct EnrollArgs {
    /// Sensor security level
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_SECURITY_LEVEL,
        value_parser = clap::value_parser!(u8).range(MIN_SECURITY_LEVEL as i64..=MAX_SECURITY_LEVEL as i64)
    )]
    pub security_level: u8,

    /// Status poll interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub poll_ms: u64,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Number of scans to run
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_enroll_defaults() {
        let cli = Cli::try_parse_from(["votekey", "enroll"]).unwrap();
        match cli.command {
            Command::Enroll(args) => {
                assert_eq!(args.security_level, 5);
                assert_eq!(args.poll_ms, 500);
            }
            other => panic!("expected enroll, got {other:?}"),
        }
    }

    #[test]
    fn test_security_level_range() {
        assert!(Cli::try_parse_from(["votekey", "enroll", "-s", "0"]).is_err());
        assert!(Cli::try_parse_from(["votekey", "enroll", "-s", "6"]).is_err());
        assert!(Cli::try_parse_from(["votekey", "enroll", "-s", "1"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["votekey", "scan", "-n", "3", "--port", "COM7", "--mock"]).unwrap();
        assert_eq!(cli.port.as_deref(), Some("COM7"));
        assert!(cli.mock);
        assert!(matches!(cli.command, Command::Scan(ScanArgs { count: 3 })));
    }
}
