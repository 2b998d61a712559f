//! CLI interface for the sniffer
//!
//! This crate provides the command-line interface: argument parsing, the
//! rendering of captured packets on stdout and the foreground print loop.

pub mod args;
pub mod output;
pub mod printer;

pub use args::{CaptureArgs, Cli, Commands, OutputFormat};
pub use output::{render, PacketRecord};
pub use printer::{print_until, Interrupt};
