// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wiimote_bridge::{
    check_uinput_access, Config, Epoll, LinuxBackend, Reactor, ReactorSettings, UdevMonitor,
    Waker, UINPUT_PATH,
};
use wiimote_hid::enumerate_devices;

/// Bridge Wii Remotes to virtual gamepads
#[derive(Debug, Parser)]
#[command(name = "wiimote-uinput", version, about)]
struct Args {
    /// Log everything at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to ./wiimote-uinput.yaml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using info", level);
        LevelFilter::Info
    })
}

fn init_logging(config: &Config, verbose: bool) {
    let mut builder = env_logger::Builder::new();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(parse_level(&config.logging.level));
        for (module, level) in &config.logging.submodules {
            builder.filter_module(module, parse_level(level));
        }
    }
    builder.parse_default_env();
    builder.init();
}

/// Flip `running` and wake the reactor on SIGTERM or SIGINT
async fn wait_for_shutdown(running: Arc<AtomicBool>, waker: Arc<Waker>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }

    running.store(false, Ordering::SeqCst);
    waker.wake().context("Failed to wake the event loop")?;
    Ok(())
}

fn run_bridge(config: Config, running: Arc<AtomicBool>, waker: Arc<Waker>) -> Result<()> {
    let settings = ReactorSettings::from(&config);
    let udev = libudev::Context::new().map_err(|e| anyhow!("Failed to create udev context: {}", e))?;
    let monitor =
        UdevMonitor::new(&udev).map_err(|e| anyhow!("Failed to monitor hidraw devices: {}", e))?;
    let poller = Epoll::new().context("Failed to create epoll instance")?;
    let backend = LinuxBackend::new(UINPUT_PATH, config.virtual_device.clone());

    let mut reactor = Reactor::new(poller, backend, monitor, settings.clone())?.with_waker(waker)?;

    match enumerate_devices(&settings.device_ids) {
        Ok(devices) => reactor.attach_present(&devices),
        Err(e) => error!("Failed to enumerate present devices: {}", e),
    }

    info!("Waiting for Wiimotes");
    reactor.run(&running)?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config, args.verbose);

    if let Err(e) = check_uinput_access(Path::new(UINPUT_PATH)) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let running = Arc::new(AtomicBool::new(true));
    let waker = match Waker::new() {
        Ok(waker) => Arc::new(waker),
        Err(e) => {
            error!("Failed to create waker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let signal_task = tokio::spawn(wait_for_shutdown(running.clone(), waker.clone()));

    let bridge = tokio::task::spawn_blocking(move || run_bridge(config, running, waker));
    let result = match bridge.await {
        Ok(result) => result,
        Err(e) => Err(anyhow!("Event loop panicked: {}", e)),
    };
    signal_task.abort();

    match result {
        Ok(()) => {
            info!("Shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from(["wiimote-uinput", "-v", "-c", "/tmp/w.yaml"]);

        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/w.yaml")));
    }
}
