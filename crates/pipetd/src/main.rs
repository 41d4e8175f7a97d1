// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! pipetd - pipetting robot control server
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port (65432)
//! pipetd
//!
//! # Custom port and config file
//! pipetd --port 7000 --config robot.json
//!
//! # Shorter keep-alive for flaky bench networks
//! pipetd --keep-alive 10
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use pipetd::config::ServerConfig;
use pipetd::robot::StubRobot;
use pipetd::server::RobotServer;

/// Pipetting robot control server
#[derive(Parser, Debug)]
#[command(name = "pipetd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (0.0.0.0 for all interfaces)
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum concurrent client sessions
    #[arg(long)]
    max_clients: Option<usize>,

    /// Keep-alive window in seconds
    #[arg(long)]
    keep_alive: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.clone()),
    )
    .init();

    // Config file first, CLI flags override
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(max_clients) = args.max_clients {
        config.max_clients = max_clients;
    }
    if let Some(keep_alive) = args.keep_alive {
        config.keep_alive_secs = keep_alive;
    }

    log::info!("pipetd v{} starting", env!("CARGO_PKG_VERSION"));
    log::info!(
        "bounds: x [{}, {}], y [{}, {}], z [{}, {}]",
        config.bounds.min_x,
        config.bounds.max_x,
        config.bounds.min_y,
        config.bounds.max_y,
        config.bounds.min_z,
        config.bounds.max_z
    );

    let mut server = RobotServer::new(config, Box::new(StubRobot::parked()))?;

    let shutdown = server.shutdown_handle();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        shutdown.shutdown();
    })?;

    server.run()?;
    Ok(())
}
