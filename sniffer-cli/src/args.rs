//! CLI argument parsing

use clap::{Args, Parser, Subcommand, ValueEnum};
use sniffer_capture::{CaptureConfig, DeviceSelector};

#[derive(Parser, Debug)]
#[command(name = "sniffer")]
#[command(version, about = "Live link-layer packet capture and decoding", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List capturable network interfaces
    Devices,

    /// Capture and decode packets until interrupted
    Capture(CaptureArgs),
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Device number from `sniffer devices`, interface name, or "any"
    #[arg(short, long, value_name = "DEVICE", default_value = "any")]
    pub interface: DeviceSelector,

    /// Maximum bytes captured per packet
    #[arg(long, default_value_t = 65535, value_parser = clap::value_parser!(i32).range(1..))]
    pub snaplen: i32,

    /// Read timeout in milliseconds; bounds how long stopping can take
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(i32).range(1..))]
    pub timeout_ms: i32,

    /// Do not put the interface into promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    /// Kernel buffer size in bytes (0 = library default)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i32).range(0..))]
    pub buffer_size: i32,

    /// Stop after this many packets
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,
}

impl CaptureArgs {
    /// Capture configuration for the selected options
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::default()
            .with_snaplen(self.snaplen)
            .with_timeout_ms(self.timeout_ms)
            .with_promiscuous(!self.no_promisc)
            .with_buffer_size(self.buffer_size)
    }
}

/// How each packet is printed
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per packet
    Summary,
    /// Multi-line per-layer dump
    Detailed,
    /// One JSON object per line
    Json,
}
