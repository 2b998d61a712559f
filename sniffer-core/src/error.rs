//! Error types for the sniffer workspace

use thiserror::Error;

/// Result type alias for sniffer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Listing the capturable interfaces failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Device enumeration failed: {0}")]
pub struct EnumerationError(pub String);

/// A live capture handle could not be bound to a device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// Missing permissions, nonexistent interface, device busy, ...
    ///
    /// Carries the diagnostic reported by the capture library.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl OpenError {
    /// Create a `DeviceUnavailable` error from any diagnostic
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        OpenError::DeviceUnavailable(msg.into())
    }
}

/// A frame could not be handed to the decoder
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length frame from the acquisition layer
    #[error("Empty frame handed to the decoder")]
    EmptyFrame,
}

/// A capture session refused to start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The session is not idle (already capturing, stopping or closed)
    #[error("Cannot start capture on '{device}' while {state}")]
    InvalidState { device: String, state: String },

    /// The capture worker thread could not be spawned
    #[error("Failed to spawn capture worker: {0}")]
    Spawn(String),
}

/// The acquisition loop ended because of an I/O fault after a successful start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Capture loop on '{device}' terminated: {reason}")]
pub struct LoopTerminated {
    /// Device the loop was reading from
    pub device: String,
    /// Diagnostic from the capture library
    pub reason: String,
}

/// Main error type for the sniffer workspace
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    LoopTerminated(#[from] LoopTerminated),

    /// Reading the next frame from a live handle failed
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Synthetic frame construction error
    #[error("Frame construction error: {0}")]
    FrameConstruction(String),
}

impl Error {
    /// Create a capture error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a frame construction error with a custom message
    pub fn frame_construction<S: Into<String>>(msg: S) -> Self {
        Error::FrameConstruction(msg.into())
    }
}
