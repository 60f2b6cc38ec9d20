//! # Error Types
//!
//! This module provides the error types used throughout the mux. It defines
//! a central error type `MuxError` that encapsulates all possible errors
//! that can occur during transport-stream multiplexing.
//!
//! ## Example Usage
//!
//! ```rust
//! use isdbtmux::error::{Result, MuxError};
//!
//! fn validate_pid(pid: u16) -> Result<()> {
//!     if pid >= 0x1FFF {
//!         return Err(MuxError::InvalidConfig(format!("pid {:#x} out of range", pid)));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Primary error type for the mux.
///
/// Maps onto the error kinds the spec this crate implements names:
/// malformed/missing per-packet input (`InvalidData`), bad configuration
/// discovered at `init` time (`InvalidConfig`), allocation failure
/// (`OutOfMemory`), and codec features this mux cannot encode
/// (`NotSupported`).
#[derive(Error, Debug)]
pub enum MuxError {
    /// I/O errors surfaced by the byte sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input bitstream, or mandatory per-packet metadata missing
    /// (e.g. no PTS on the first packet of a stream, a truncated Opus
    /// packet).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Configuration rejected at `init`: duplicate PIDs, a stream id
    /// outside the 13-bit PID range, a PMT that cannot fit in one section.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A buffer or table allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A feature was requested that this mux cannot encode (e.g. an Opus
    /// channel mapping outside RFC 7845 families 0/1).
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// A specialized `Result` type for mux operations.
pub type Result<T> = std::result::Result<T, MuxError>;
