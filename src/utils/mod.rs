//! # Utility Functions and Types
//!
//! Common helpers shared across the mux. Includes MPEG-2 CRC32 calculation
//! and the length-prefix scope helper used by the table builders.
//!
//! ```rust
//! use isdbtmux::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new();
//! let data = b"Hello, world!";
//! let checksum = crc.calculate(data);
//! println!("CRC32: {:08x}", checksum);
//! ```

/// CRC calculation implementations
pub mod crc;

/// Length-prefix scope helper for nested descriptor/program loops
pub mod scope;

// Re-export commonly used types
pub use crc::Crc32Mpeg2;
pub use scope::LengthScope;
