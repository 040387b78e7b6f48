use std::fs;
use std::process;

use dlockd::log::{self, LogLevel};
use dlockd::{args, cli, config, peer};
use dlockd::{error, info};

fn main() {
    let parsed = args::args();

    let level = parsed.level.unwrap_or(if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });
    log::log_init(level);

    let cfg = load_config(parsed.config.as_deref());

    let peer = match peer::Peer::construct(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to start up: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = peer.initialize() {
        error!("Failed to initialize: {}", e);
        process::exit(1);
    }

    peer.start();
    cli::run(&peer);

    info!("Shutting down");
    peer.destroy();
    process::exit(0);
}

fn load_config(path: Option<&str>) -> config::Config {
    match path {
        None => config::Config::default(),
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(file) => config::Config::from_file(file),
                Err(e) => {
                    error!("Failed to parse config file {}: {}", path, e);
                    process::exit(1);
                }
            },
            Err(e) => {
                error!("Failed to read config file {}: {}", path, e);
                process::exit(1);
            }
        },
    }
}
