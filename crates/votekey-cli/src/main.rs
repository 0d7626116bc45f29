//! votekey - fingerprint scanner command-line driver.

mod cli;
mod demo;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command, EnrollArgs, ScanArgs};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use votekey_biometric::{DeviceStatus, FingerprintScanner, HandshakeOutcome, ScannerConfig};
use votekey_hardware::mock::MockSerialHandle;
use votekey_hardware::serial::SerialPortTransport;

#[derive(Debug, Serialize)]
struct ProbeReport {
    port: String,
    baud_rate: u32,
    connected: bool,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    banner: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<ScannerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ScannerConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if cli.mock {
        config.handshake.boot_delay = Duration::ZERO;
    }

    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open the scanner on the configured port, or on the simulated device.
///
/// The mock handle is returned so the simulated device outlives the run.
async fn open_scanner(
    cli: &Cli,
    config: ScannerConfig,
) -> Result<(FingerprintScanner, HandshakeOutcome, Option<MockSerialHandle>)> {
    let scanner = FingerprintScanner::new(config);

    if cli.mock {
        let (outcome, device) = demo::attach(&scanner).await?;
        return Ok((scanner, outcome, Some(device)));
    }

    let config = scanner.config();
    let transport = SerialPortTransport::open(&config.port_name, config.baud_rate)
        .with_context(|| format!("opening {}", config.port_name))?;
    let outcome = scanner.attach(transport).await?;
    Ok((scanner, outcome, None))
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Ports = cli.command {
        return list_ports();
    }

    let config = load_config(&cli)?;
    let opened = open_scanner(&cli, config).await;

    // A port that cannot be opened is a status answer, not a failure
    if let (Command::Status, Err(e)) = (&cli.command, &opened) {
        warn!(error = %e, "Scanner unavailable");
        return print_json(&DeviceStatus::from_connected(false));
    }
    let (scanner, outcome, _device) = opened?;

    let result = match &cli.command {
        Command::Ports => Ok(()),
        Command::Probe => probe(&scanner, outcome),
        Command::Enroll(args) => enroll(&scanner, args).await,
        Command::Scan(args) => scan(&scanner, args).await,
        Command::Status => print_json(&scanner.device_status()),
    };

    scanner.shutdown().await;
    result
}

fn list_ports() -> Result<()> {
    let ports = SerialPortTransport::available_ports()?;
    if ports.is_empty() {
        warn!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn probe(scanner: &FingerprintScanner, outcome: HandshakeOutcome) -> Result<()> {
    let config = scanner.config();
    let banner = match outcome {
        HandshakeOutcome::Ready(line) => Some(line),
        HandshakeOutcome::NoBanner => None,
    };

    print_json(&ProbeReport {
        port: config.port_name.clone(),
        baud_rate: config.baud_rate,
        connected: scanner.is_connected(),
        ready: banner.is_some(),
        banner,
    })
}

async fn enroll(scanner: &FingerprintScanner, args: &EnrollArgs) -> Result<()> {
    let started = scanner.start_enrollment(args.security_level).await;
    print_json(&started)?;
    if !started.success {
        bail!(
            "enrollment rejected: {}",
            started.error.unwrap_or_default()
        );
    }

    let poll = Duration::from_millis(args.poll_ms);
    let mut last_message = None;
    loop {
        let status = scanner.get_enrollment_status();
        if status.is_terminal() {
            print_json(&status)?;
            if !status.enrolled {
                bail!("enrollment failed");
            }
            return Ok(());
        }

        if status.message != last_message {
            print_json(&status)?;
            last_message = status.message.clone();
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling enrollment");
                print_json(&scanner.cancel_enrollment())?;
                return Ok(());
            }
        }
    }
}

async fn scan(scanner: &FingerprintScanner, args: &ScanArgs) -> Result<()> {
    for _ in 0..args.count {
        print_json(&scanner.scan_fingerprint().await)?;
    }

    if let Some(last) = scanner.last_match() {
        info!(slot_id = %last.slot_id, matched_at = %last.matched_at, "Last match");
    }
    Ok(())
}
