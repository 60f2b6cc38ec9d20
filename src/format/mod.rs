//! # Container format
//!
//! This mux speaks exactly one container format, so unlike the teacher's
//! `format` module (which grouped RTSP/RTP/RTCP alongside TS behind
//! `Demuxer`/`Muxer` traits for a multi-protocol toolkit), this module
//! holds only [`ts`]: the MPEG-2 Transport Stream wire format and its
//! DVB/ISDB-Tb table builders.

/// MPEG-2 Transport Stream wire format: packet header, PSI/SI sections,
/// PES headers, and table builders.
pub mod ts;
