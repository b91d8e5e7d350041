//! `emg-mock` daemon
//!
//! Plays the device side of the EMG front-end TCP protocol until Ctrl-C.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use emg_mock::config::constants::{logging, server};
use emg_mock::config::{ConfigLoader, EmulatorConfig};
use emg_mock::logging::init_tracing;
use emg_mock::{HandshakeMode, Listener};

#[derive(Parser, Debug)]
#[command(name = "emg-mock")]
#[command(version, about = "EMG front-end emulator over TCP")]
struct Args {
    /// Extra TOML file layered over the discovered ones; must exist
    #[arg(long, env = "EMG_MOCK_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Which handshakes the listener accepts
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Disable the keep-alive emitter
    #[arg(long)]
    no_heartbeat: bool,

    /// Ignore injected override values
    #[arg(long)]
    no_override: bool,

    /// Keep-alive line, e.g. "ALIVE"
    #[arg(long)]
    heartbeat_message: Option<String>,

    /// Steady-state tick in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// RNG seed for reproducible electrode readings
    #[arg(long)]
    seed: Option<u64>,

    /// Output logs as JSON
    #[arg(long, env = "EMG_MOCK_LOG_JSON")]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    SensorCount,
    Token,
    Auto,
}

impl From<ModeArg> for HandshakeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::SensorCount => HandshakeMode::SensorCount,
            ModeArg::Token => HandshakeMode::Token,
            ModeArg::Auto => HandshakeMode::Auto,
        }
    }
}

impl Args {
    /// Flags are the last layer, above files and environment
    fn apply(&self, config: &mut EmulatorConfig) {
        if let Some(mode) = self.mode {
            config.protocol.handshake_mode = mode.into();
            if mode == ModeArg::Token && self.port.is_none() && config.server.port == server::DEFAULT_PORT {
                config.server.port = server::DEFAULT_TOKEN_PORT;
            }
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if self.no_heartbeat {
            config.protocol.with_heartbeat = false;
        }
        if self.no_override {
            config.protocol.with_override = false;
        }
        if let Some(message) = &self.heartbeat_message {
            config.protocol.heartbeat_message = message.clone();
        }
        if let Some(tick_ms) = self.tick_ms {
            config.protocol.tick_interval_ms = tick_ms;
        }
        if self.seed.is_some() {
            config.sensor.seed = self.seed;
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<EmulatorConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_required_file(path)?;
    }
    let mut config = loader.load().context("loading configuration")?;
    args.apply(&mut config);
    config.validate().context("validating command-line overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(logging::DEFAULT_FILTER, args.log_json);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{e:#}"), "invalid configuration");
            return Err(e);
        }
    };

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(
        version = emg_mock::VERSION,
        config = %config.summary(),
        "Starting emg-mock"
    );

    let listener = match Listener::bind(config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e).context("binding listener");
        }
    };

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        ctrl_c.cancel();
    });

    listener.serve_until(shutdown).await;
    Ok(())
}
