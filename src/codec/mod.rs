//! Bitstream adapters (spec §4.6): per-codec access-unit framing checks
//! and rewrites applied before a packet is PES-packetised. Each adapter
//! is intentionally shallow — it validates/reframes, it does not decode.
//!
//! - [`h264`]: Annex-B start-code validation, AUD insertion.
//! - [`h265`]: Annex-B start-code validation, random-access detection.
//! - [`aac`]: ADTS sync detection, LATM/LOAS fallback framing.
//! - [`opus`]: control-header access-unit packing.

/// AAC bitstream handling: ADTS and LATM/LOAS.
pub mod aac;
/// H.264/AVC bitstream handling.
pub mod h264;
/// H.265/HEVC bitstream handling.
pub mod h265;
/// Opus bitstream handling.
pub mod opus;
