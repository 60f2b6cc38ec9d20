//! Opus bitstream adapter (spec §4.6): packs one RFC 6716 Opus packet into
//! a single PES access unit behind a short control header, using the
//! channel-mapping table from
//! [`crate::format::ts::tables::descriptors::opus_channel_mapping_table`]
//! to describe the stream in the PMT extension descriptor.

use crate::error::{MuxError, Result};
use bytes::{BufMut, BytesMut};

/// Fixed first control-header byte.
pub const CONTROL_HEADER_TAG: u8 = 0x7F;
/// Base value for the second control-header byte, before the trim-present
/// bits are ORed in.
pub const CONTROL_HEADER_FLAGS: u8 = 0xE0;
/// Set in the second control-header byte when `trim_start` is present.
const TRIM_START_BIT: u8 = 0x10;
/// Set in the second control-header byte when `trim_end` is present.
const TRIM_END_BIT: u8 = 0x08;

/// Decoded TOC (table-of-contents) byte fields (RFC 6716 §3.1).
#[derive(Debug, Clone, Copy)]
pub struct Toc {
    /// Configuration number (0-31): selects mode, bandwidth, frame size.
    pub config: u8,
    /// True for a stereo frame.
    pub stereo: bool,
    /// Raw 2-bit frame-count code; see [`packet_frame_count`].
    pub frame_count_code: u8,
}

/// Parses the TOC byte at the start of an Opus packet.
pub fn parse_toc(byte: u8) -> Toc {
    Toc {
        config: byte >> 3,
        stereo: (byte & 0x04) != 0,
        frame_count_code: byte & 0x03,
    }
}

/// Returns the number of Opus frames packed in `packet` per its TOC byte
/// (RFC 6716 §3.1 code 0/1/2/3 framing; code 3 reads a frame count byte).
pub fn packet_frame_count(packet: &[u8]) -> Result<usize> {
    if packet.is_empty() {
        return Err(MuxError::InvalidData("empty Opus packet".into()));
    }
    let toc = parse_toc(packet[0]);
    match toc.frame_count_code {
        0 => Ok(1),
        1 | 2 => Ok(2),
        3 => {
            if packet.len() < 2 {
                return Err(MuxError::InvalidData(
                    "Opus code-3 packet missing frame count byte".into(),
                ));
            }
            Ok((packet[1] & 0x3F) as usize)
        }
        _ => unreachable!("2-bit field"),
    }
}

/// Writes a length as a sequence of continuation bytes: as many `0xFF`
/// bytes as needed followed by the remainder, the same convention LATM
/// uses for `PayloadLengthInfo`.
fn write_length_prefix(buf: &mut BytesMut, mut len: usize) {
    while len >= 255 {
        buf.put_u8(0xFF);
        len -= 255;
    }
    buf.put_u8(len as u8);
}

/// Builds one PES access unit carrying `packet` (spec §4.6): `0x7F 0xE0 ·
/// size_bytes · [trim_start(16)] · [trim_end(16)]`, where `size_bytes` is a
/// 255-terminated length encoding of `packet`'s length and the trim fields
/// are each present only when their argument is `Some`, signalled by bits
/// 4 and 3 of the second control-header byte respectively.
pub fn build_access_unit(
    packet: &[u8],
    trim_start: Option<u16>,
    trim_end: Option<u16>,
) -> Result<BytesMut> {
    if packet.is_empty() {
        return Err(MuxError::InvalidData(
            "Opus access unit needs a packet".into(),
        ));
    }

    let mut out = BytesMut::new();
    out.put_u8(CONTROL_HEADER_TAG);
    let mut flags = CONTROL_HEADER_FLAGS;
    if trim_start.is_some() {
        flags |= TRIM_START_BIT;
    }
    if trim_end.is_some() {
        flags |= TRIM_END_BIT;
    }
    out.put_u8(flags);

    write_length_prefix(&mut out, packet.len());
    if let Some(v) = trim_start {
        out.put_u16(v);
    }
    if let Some(v) = trim_end {
        out.put_u16(v);
    }
    out.extend_from_slice(packet);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_code_zero_is_one_frame() {
        let packet = [0x00u8]; // config=0, stereo=0, code=0
        assert_eq!(packet_frame_count(&packet).unwrap(), 1);
    }

    #[test]
    fn toc_code_three_reads_frame_count_byte() {
        let packet = [0x03u8, 5]; // code=3, frame_count=5
        assert_eq!(packet_frame_count(&packet).unwrap(), 5);
    }

    #[test]
    fn rejects_empty_packet() {
        assert!(packet_frame_count(&[]).is_err());
    }

    #[test]
    fn access_unit_with_no_trim_fields_uses_base_flags() {
        let packet = [0x00, 1, 2];
        let au = build_access_unit(&packet, None, None).unwrap();
        assert_eq!(au[0], CONTROL_HEADER_TAG);
        assert_eq!(au[1], CONTROL_HEADER_FLAGS);
        assert_eq!(au[2], packet.len() as u8); // size byte
        assert_eq!(&au[3..], &packet[..]);
    }

    #[test]
    fn trim_start_only_sets_bit_4_and_is_encoded_before_trim_end() {
        let packet = [0x00, 1, 2];
        let au = build_access_unit(&packet, Some(312), None).unwrap();
        assert_eq!(au[1], CONTROL_HEADER_FLAGS | 0x10);
        assert_eq!(au[2], packet.len() as u8);
        assert_eq!(u16::from_be_bytes([au[3], au[4]]), 312);
        assert_eq!(&au[5..], &packet[..]);
    }

    #[test]
    fn trim_end_only_sets_bit_3() {
        let packet = [0x00, 1, 2];
        let au = build_access_unit(&packet, None, Some(100)).unwrap();
        assert_eq!(au[1], CONTROL_HEADER_FLAGS | 0x08);
        assert_eq!(u16::from_be_bytes([au[3], au[4]]), 100);
    }

    #[test]
    fn both_trim_fields_set_both_bits_and_appear_in_order() {
        let packet = [0x00, 1, 2];
        let au = build_access_unit(&packet, Some(10), Some(20)).unwrap();
        assert_eq!(au[1], CONTROL_HEADER_FLAGS | 0x10 | 0x08);
        assert_eq!(u16::from_be_bytes([au[3], au[4]]), 10);
        assert_eq!(u16::from_be_bytes([au[5], au[6]]), 20);
    }

    #[test]
    fn length_prefix_handles_large_packets() {
        let big = vec![0u8; 300];
        let au = build_access_unit(&big, None, None).unwrap();
        // control header(2) + 0xFF + 45
        assert_eq!(au[2], 0xFF);
        assert_eq!(au[3], 45);
    }
}
