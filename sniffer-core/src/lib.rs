//! Sniffer Core Library
//!
//! Error taxonomy and capture timestamps shared by the decoder, the capture
//! session and the command-line front end.

pub mod error;
pub mod timestamp;

// Re-export commonly used types
pub use error::{
    DecodeError, EnumerationError, Error, LoopTerminated, OpenError, Result, StartError,
};
pub use timestamp::Timestamp;
