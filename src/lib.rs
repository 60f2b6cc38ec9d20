#![doc(html_root_url = "https://docs.rs/isdbtmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # isdbtmux
//!
//! `isdbtmux` packetises elementary audio/video streams into an MPEG-2
//! Transport Stream carrying DVB (ETSI EN 300 468) and ISDB-Tb (ABNT NBR
//! 15603) service-information tables, including the one-seg partial
//! reception service an ISDB-Tb broadcast carries alongside its full-seg
//! services.
//!
//! ## Quick start
//!
//! ```rust
//! use isdbtmux::av::{InputPacket, StreamKind, VideoCodec};
//! use isdbtmux::config::MuxConfig;
//! use isdbtmux::mux::TsMux;
//!
//! # fn main() -> isdbtmux::error::Result<()> {
//! let cfg = MuxConfig::new().with_service_id(1);
//! let streams = [StreamKind::Video(VideoCodec::H264)];
//! let mut mux = TsMux::init(cfg, &streams, Vec::new())?;
//!
//! let access_unit = [0, 0, 0, 1, 0x09, 0xF0, 0, 0, 0, 1, 0x65, 0xAA];
//! let packet = InputPacket::new(&access_unit[..])
//!     .with_pts(90_000)
//!     .with_key_flag(true);
//! mux.write_packet(&packet)?;
//! mux.write_trailer()?;
//!
//! let bytes = mux.deinit();
//! assert_eq!(bytes.len() % 188, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module overview
//!
//! - [`av`]: elementary-stream vocabulary (`StreamKind`, `InputPacket`)
//!   shared by the service model, PES packetiser, and codec adapters.
//! - [`codec`]: per-codec bitstream adapters (H.264/H.265 Annex-B, AAC
//!   ADTS/LATM, Opus) applied before PES packetisation.
//! - [`service`]: the service registry, PID assignment, and ISDB-Tb
//!   service-id synthesis.
//! - [`cadence`]: packet-count/wall-clock scheduling for the periodic SI
//!   tables.
//! - [`format::ts`]: the wire format itself — TS packet header, PSI/SI
//!   section framing, PES headers, and the PAT/PMT/SDT/NIT/TOT/EIT table
//!   builders.
//! - [`m2ts`]: optional Blu-ray BDAV 4-byte timestamp framing.
//! - [`mux`]: [`mux::TsMux`], the public facade tying everything together.
//! - [`config`]: [`config::MuxConfig`], every option the facade accepts.
//! - [`error`]: the crate's error type.
//! - [`utils`]: CRC-32/MPEG-2 and the length-prefix scope helper shared by
//!   the table builders.

/// Elementary-stream vocabulary: `StreamKind`, codec enums, `InputPacket`.
pub mod av;

/// Cadence controller deciding when each SI table is due for re-emission.
pub mod cadence;

/// Per-codec bitstream adapters applied before PES packetisation.
pub mod codec;

/// Mux configuration (`MuxConfig`) and its builder methods.
pub mod config;

/// The crate's error type and `Result` alias.
pub mod error;

/// Container format implementation (MPEG-2 Transport Stream).
pub mod format;

/// M2TS (Blu-ray BDAV) 4-byte timestamp framing.
pub mod m2ts;

/// The public facade (`TsMux`) tying the service registry, cadence, and
/// wire format together.
pub mod mux;

/// The service registry: per-service PMT/PCR PIDs, per-stream PID
/// assignment, ISDB-Tb service-id synthesis.
pub mod service;

/// Common utilities: CRC-32/MPEG-2, the length-prefix scope helper.
pub mod utils;

pub use error::{MuxError, Result};
pub use mux::TsMux;
