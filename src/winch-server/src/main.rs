// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod listener;
mod winch_task;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use winch_app::{init_logging, normalize_name, ConfigFile};
use winch_backend::{register_builtin_backends_on, ControllerAccess, RegistrationContext};
use winch_core::{DynResult, Winch};

use config::ServerConfig;
use listener::UdpCommandSource;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - CTD winch control daemon");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Controller backend to use (simulated, gpio)
    #[arg(short = 'c', long = "controller")]
    controller: Option<String>,
    /// IP address for the UDP command listener
    #[arg(short = 'l', long = "listen")]
    listen: Option<IpAddr>,
    /// Port for the UDP command listener
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    /// Rotation/meter calibration table
    #[arg(long = "calibration", value_name = "FILE")]
    calibration: Option<PathBuf>,
}

/// Resolved configuration after merging config file and CLI arguments.
struct ResolvedConfig {
    controller: String,
    access: ControllerAccess,
    listen_addr: SocketAddr,
}

fn resolve_config(
    cli: &Cli,
    cfg: &ServerConfig,
    registry: &RegistrationContext,
) -> DynResult<ResolvedConfig> {
    let controller = normalize_name(cli.controller.as_deref().unwrap_or(&cfg.controller.kind));
    if !registry.is_backend_registered(&controller) {
        return Err(format!(
            "Unknown controller backend: {} (available: {})",
            controller,
            registry.registered_backends().join(", ")
        )
        .into());
    }

    let mut controller_cfg = cfg.controller.clone();
    controller_cfg.kind = controller.clone();
    let access = controller_cfg.access();

    let listen_ip = cli.listen.unwrap_or(cfg.listen.listen);
    let listen_port = cli.port.unwrap_or(cfg.listen.port);
    if listen_port == 0 {
        return Err("Listen port must be > 0".into());
    }

    Ok(ResolvedConfig {
        controller,
        access,
        listen_addr: SocketAddr::from((listen_ip, listen_port)),
    })
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let mut registry = RegistrationContext::new();
    register_builtin_backends_on(&mut registry);

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = ServerConfig::resolve(cli.config.as_deref())?;
    if let Some(ref path) = cli.calibration {
        cfg.calibration.file = Some(path.clone());
    }
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let resolved = resolve_config(&cli, &cfg, &registry)?;
    info!(
        "Starting {} (controller: {}, listen: udp://{})",
        cfg.general.name, resolved.controller, resolved.listen_addr
    );

    let controller = registry.build_controller(&resolved.controller, resolved.access.clone())?;
    let source = UdpCommandSource::new(
        resolved.listen_addr,
        Duration::from_millis(cfg.listen.peer_timeout_ms),
    );
    let settings = cfg.winch_settings();
    let period = settings.main_loop_period;
    let winch = Winch::new(controller, Box::new(source), settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut task = tokio::spawn(winch_task::run_winch_task(winch, period, shutdown_rx));

    tokio::select! {
        joined = &mut task => {
            return match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("Winch task error: {}", e);
                    Err(e)
                }
                Err(e) => Err(e.into()),
            };
        }
        result = signal::ctrl_c() => {
            result?;
            info!("Ctrl+C received, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    match task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Winch task error: {}", e);
            Err(e)
        }
        Err(e) => Err(e.into()),
    }
}
