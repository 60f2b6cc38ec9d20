//! PES packetiser (C3): builds the PES header for one access unit (spec
//! §4.3). Splitting the resulting bytes into 188-byte TS packets with
//! adaptation fields/PCR/stuffing happens in `crate::mux`, which owns the
//! per-PID continuity counters and cadence state this module does not.

use crate::av::{AudioCodec, StreamKind, SubtitleCodec, VideoCodec};
use bytes::{BufMut, BytesMut};

/// Default PES `stream_id` for a given elementary-stream kind (spec
/// §4.3). `data_stream_id` overrides the default for `Data` streams when
/// the caller supplied one via `SideData::MpegtsStreamId`.
pub fn default_stream_id(kind: StreamKind, m2ts_mode: bool, data_stream_id: Option<u8>) -> u8 {
    match kind {
        StreamKind::Video(VideoCodec::Dirac) => 0xFD,
        StreamKind::Video(_) => 0xE0,
        StreamKind::Audio(AudioCodec::Mp2 | AudioCodec::Mp3 | AudioCodec::Aac { .. }) => 0xC0,
        StreamKind::Audio(AudioCodec::Ac3) if m2ts_mode => 0xFD,
        StreamKind::Data(_) => data_stream_id.unwrap_or(0xFC),
        _ => 0xBD,
    }
}

/// Writes the PTS or DTS timestamp field with its 4-bit marker prefix and
/// the classic marker-bit pattern (spec §4.3).
fn write_timestamp(buf: &mut BytesMut, marker4: u8, ts_90k: u64) {
    let ts = ts_90k & 0x1_FFFF_FFFF;
    buf.put_u8((marker4 << 4) | (((ts >> 29) & 0x0E) as u8) | 0x01);
    buf.put_u16((((ts >> 14) & 0xFFFE) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xFFFE) | 0x01) as u16);
}

/// Inputs to [`build_pes_header`].
pub struct PesHeaderParams {
    /// PES `stream_id` byte.
    pub stream_id: u8,
    /// Presentation timestamp in 90 kHz ticks.
    pub pts: Option<u64>,
    /// Decode timestamp in 90 kHz ticks; written only when it differs
    /// from `pts` (spec §4.3).
    pub dts: Option<u64>,
    /// Payload length, used to compute `PES_packet_length` when it must
    /// be non-zero.
    pub payload_len: usize,
    /// When true, `PES_packet_length` is always written as 0 (mandatory
    /// for video per the standard, spec §4.3).
    pub omit_packet_length: bool,
    /// Data-alignment indicator.
    pub data_alignment: bool,
    /// True for DVB teletext, which pads the header to 0x24 bytes total
    /// with trailing 0xFF (spec §4.3).
    pub teletext_padding: bool,
}

/// Builds a complete PES header (start code through optional PTS/DTS and
/// teletext padding), ready to be followed by the elementary-stream
/// payload (spec §4.3).
pub fn build_pes_header(params: &PesHeaderParams) -> BytesMut {
    let mut header_data = BytesMut::new();
    let mut pts_dts_flags = 0u8;

    if let Some(pts) = params.pts {
        let dts_present = params.dts.map(|d| d != pts).unwrap_or(false);
        pts_dts_flags = if dts_present { 0b11 } else { 0b10 };
        let marker = if dts_present { 0b0011 } else { 0b0010 };
        write_timestamp(&mut header_data, marker, pts);
        if dts_present {
            write_timestamp(&mut header_data, 0b0001, params.dts.unwrap());
        }
    }

    let mut header_data_length = header_data.len();

    let mut buf = BytesMut::with_capacity(9 + header_data.len() + 3);
    buf.put_u8(0x00);
    buf.put_u8(0x00);
    buf.put_u8(0x01);
    buf.put_u8(params.stream_id);

    let pes_packet_length: u16 = if params.omit_packet_length {
        0
    } else {
        let total = 3 + header_data.len() + params.payload_len; // flags(1)+flags2(1)+hdl(1) + optional fields + payload
        if total > 0xFFFF {
            0
        } else {
            total as u16
        }
    };
    buf.put_u16(pes_packet_length);

    // '10' marker, scrambling=00, priority=0, data_alignment, copyright=0, original=0
    let mut flags1 = 0x80u8;
    if params.data_alignment {
        flags1 |= 0x04;
    }
    buf.put_u8(flags1);

    buf.put_u8(pts_dts_flags << 6);

    if params.teletext_padding {
        let stuffing = 0x24usize.saturating_sub(9 + header_data.len());
        header_data_length = header_data.len() + stuffing;
        buf.put_u8(header_data_length as u8);
        buf.extend_from_slice(&header_data);
        for _ in 0..stuffing {
            buf.put_u8(0xFF);
        }
    } else {
        buf.put_u8(header_data_length as u8);
        buf.extend_from_slice(&header_data);
    }

    buf
}

/// Prepends the `0x20 0x00` PES-payload prefix DVB subtitle streams
/// require and appends the trailing `0xFF` terminator (spec §4.3 step 9).
pub fn wrap_dvb_subtitle_payload(payload: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(payload.len() + 3);
    out.put_u8(0x20);
    out.put_u8(0x00);
    out.extend_from_slice(payload);
    out.put_u8(0xFF);
    out
}

/// True when `kind` should have its PES payload wrapped via
/// [`wrap_dvb_subtitle_payload`].
pub fn needs_dvb_subtitle_wrapping(kind: StreamKind) -> bool {
    matches!(kind, StreamKind::Subtitle(SubtitleCodec::Dvb))
}
