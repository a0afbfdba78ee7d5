//! `ipmbd`: serve one IPMB bus to local clients.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use ipmb_core::BusConfig;
use ipmbd::{BasicHandler, BusInstance, DeviceTransport, ServerError, bind_socket, socket_path};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ipmbd")]
#[command(about = "IPMB transport daemon")]
struct Args {
    /// Bus number
    bus: u8,

    /// Payload (node) identifier passed to the command handler
    #[arg(default_value_t = 1)]
    payload_id: u8,

    /// Only forward the firmware-update command from clients
    #[arg(long)]
    restricted: bool,

    /// Our slave address on the bus (hex with 0x prefix, or decimal)
    #[arg(long, default_value = "0x20", value_parser = parse_addr)]
    local_addr: u8,

    /// Bus device path template; `{bus}` is replaced by the bus number
    #[arg(long, default_value = ipmbd::device::DEFAULT_DEVICE_TEMPLATE)]
    device: String,

    /// Directory for the client socket
    #[arg(long, default_value = "/tmp")]
    socket_dir: PathBuf,

    /// Seconds a client waits for a response
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Drop frames with a bad header checksum instead of repairing them
    #[arg(long)]
    no_repair: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_addr(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid slave address {s:?}: {e}"))
}

impl Args {
    fn config(&self) -> BusConfig {
        BusConfig {
            payload_id: self.payload_id,
            local_addr: self.local_addr,
            response_timeout: Duration::from_secs(self.timeout_secs),
            restricted: self.restricted,
            repair_frames: !self.no_repair,
            ..BusConfig::for_bus(self.bus)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ipmbd failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = args.config();
    let bus = config.bus_id;
    let transport = DeviceTransport::new(args.device.clone());

    let path = socket_path(&args.socket_dir, bus);
    let listener = bind_socket(&path)?;

    let mut instance = BusInstance::start(&transport, BasicHandler::default(), config).await?;
    instance.serve_clients(listener);
    info!(bus, socket = %path.display(), "serving clients");

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {},
    }
    info!(bus, "shutdown signal received");

    instance.shutdown().await;
    if let Err(e) = std::fs::remove_file(&path) {
        error!(socket = %path.display(), error = %e, "failed to remove client socket");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_parse_as_hex_or_decimal() {
        assert_eq!(parse_addr("0x20"), Ok(0x20));
        assert_eq!(parse_addr("0X40"), Ok(0x40));
        assert_eq!(parse_addr("32"), Ok(32));
        assert!(parse_addr("0x1FF").is_err());
        assert!(parse_addr("bmc").is_err());
    }

    #[test]
    fn args_map_onto_config() {
        let args = Args::parse_from(["ipmbd", "3", "2", "--restricted", "--no-repair"]);
        let config = args.config();
        assert_eq!(config.bus_id, 3);
        assert_eq!(config.payload_id, 2);
        assert!(config.restricted);
        assert!(!config.repair_frames);
        assert_eq!(config.local_addr, 0x20);
        assert_eq!(config.response_timeout, Duration::from_secs(5));
    }
}
