//! sniffer CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sniffer_capture::{list_devices, CaptureSession, DeviceSelector, LoopExit, ANY_DEVICE};
use sniffer_cli::{print_until, render, CaptureArgs, Cli, Commands, Interrupt};
use sniffer_packet::CapturedPacket;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so packet output stays clean
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Devices => print_devices(),
        Commands::Capture(args) => capture(args).await,
    }
}

fn print_devices() -> Result<()> {
    let devices = list_devices().context("Failed to list capture devices")?;

    println!("Available devices:");
    println!("  0. {} (Pseudo-device that captures on all interfaces)", ANY_DEVICE);
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}", i + 1, device);
    }
    if devices.is_empty() {
        println!("No devices found. Are you running with sufficient privileges?");
    }
    Ok(())
}

async fn capture(args: CaptureArgs) -> Result<()> {
    // Only numbered selections need the listing
    let devices = match args.interface {
        DeviceSelector::Index(n) if n > 0 => {
            list_devices().context("Failed to list capture devices")?
        }
        _ => Vec::new(),
    };
    let device = args.interface.resolve(&devices)?;

    let session = CaptureSession::open_with_config(&device, args.capture_config())
        .with_context(|| format!("Cannot capture on '{}'", device))?;
    let session = Arc::new(session);

    let (tx, mut rx) = mpsc::unbounded_channel::<CapturedPacket>();
    let exit = session.start(move |packet: CapturedPacket| {
        let _ = tx.send(packet);
    })?;
    let mut exit_task = tokio::task::spawn_blocking(move || exit.recv().ok());

    eprintln!("Capturing on {}. Press Ctrl+C to stop.", device);

    let (interrupt, mut printed) = print_until(
        &mut rx,
        async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
            }
        },
        &mut exit_task,
        args.count,
        |packet| {
            println!("{}", render(packet, args.format)?);
            Ok(())
        },
    )
    .await?;
    let limit_reached = |printed: u64| args.count.is_some_and(|count| printed >= count);

    let exit = match interrupt {
        Interrupt::User => {
            let stopper = Arc::clone(&session);
            tokio::task::spawn_blocking(move || stopper.stop()).await?;
            exit_task.await?.unwrap_or(LoopExit::Stopped)
        }
        Interrupt::Exited(exit) => exit,
    };

    // Packets decoded before the loop ended
    while let Ok(packet) = rx.try_recv() {
        if limit_reached(printed) {
            break;
        }
        println!("{}", render(&packet, args.format)?);
        printed += 1;
    }

    eprintln!("\n{}", session.stats().format());

    match exit {
        LoopExit::Stopped => Ok(()),
        LoopExit::Terminated(terminated) => {
            warn!("{}", terminated);
            Err(terminated.into())
        }
    }
}
