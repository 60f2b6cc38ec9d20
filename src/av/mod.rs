//! # Elementary-stream vocabulary
//!
//! This module provides the codec and packet vocabulary shared by the mux's
//! service model, PES packetiser, and codec adapters. It replaces the
//! teacher crate's async `Demuxer`/`Muxer`/`CodecData` traits (this mux
//! never demuxes, and is driven synchronously end to end — see
//! `DESIGN.md`) with a plain tagged-variant type, per the "Polymorphism
//! over codec type" design note: `StreamKind::{Video,Audio,Subtitle,Data}`
//! wrapping a per-family codec enum, each with its own descriptor emitters
//! downstream in `format::ts::tables`.

/// Video elementary-stream codecs this mux can packetise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// MPEG-1/2 video
    Mpeg2,
    /// MPEG-4 part 2 ("DivX"-era) video
    Mpeg4Part2,
    /// H.264/AVC
    H264,
    /// H.265/HEVC
    Hevc,
    /// AVS (Chinese national video standard)
    Avs,
    /// Dirac
    Dirac,
    /// VC-1
    Vc1,
}

/// Audio elementary-stream codecs this mux can packetise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// AAC; `latm` selects LOAS/LATM framing over ADTS.
    Aac {
        /// True when the stream uses LATM/LOAS framing instead of ADTS.
        latm: bool,
    },
    /// MPEG-1 layer II
    Mp2,
    /// MPEG-1 layer III
    Mp3,
    /// Dolby Digital (AC-3)
    Ac3,
    /// Dolby Digital Plus (E-AC-3)
    Eac3,
    /// DTS
    Dts,
    /// Dolby TrueHD
    TrueHd,
    /// Opus; `channels` drives the RFC 7845 channel-mapping table the PMT
    /// Opus extension descriptor carries (spec §4.2).
    Opus {
        /// Channel count (1..8 supported; see
        /// `format::ts::tables::descriptors::opus_channel_mapping_table`).
        channels: u8,
    },
    /// SMPTE 302M PCM
    S302m,
}

/// Subtitle elementary-stream formats this mux can packetise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleCodec {
    /// DVB subtitles (bitmap-based)
    Dvb,
    /// DVB teletext
    Teletext,
}

/// Data elementary-stream formats this mux can packetise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCodec {
    /// SMPTE 336M Key-Length-Value metadata
    Klv,
    /// Anything else: muxed as a private stream with no registration descriptor.
    Other,
}

/// The codec carried by one elementary stream, tagged by media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// A video elementary stream.
    Video(VideoCodec),
    /// An audio elementary stream.
    Audio(AudioCodec),
    /// A subtitle elementary stream.
    Subtitle(SubtitleCodec),
    /// A data elementary stream.
    Data(DataCodec),
}

impl StreamKind {
    /// True for elementary streams the cadence controller and PES
    /// packetiser treat as video: bypasses the audio payload-accumulation
    /// buffer and carries the random-access (keyframe) indicator.
    pub fn is_video(&self) -> bool {
        matches!(self, StreamKind::Video(_))
    }

    /// True for DVB subtitle streams, which get the `0x20 0x00` PES-payload
    /// prefix and trailing `0xFF` byte (spec §4.3 step 9).
    pub fn is_dvb_subtitle(&self) -> bool {
        matches!(self, StreamKind::Subtitle(SubtitleCodec::Dvb))
    }
}

/// Media packet handling and management
pub mod packet;
pub use packet::{InputPacket, SideData};
