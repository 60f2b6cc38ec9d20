//! Section writer (C1): wraps a table payload into a CRC-protected PSI
//! section, then chunks that section into 188-byte TS packets (spec §4.1).

use super::types::{TSHeader, TS_PACKET_SIZE};
use crate::error::{MuxError, Result};
use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

/// Reserved-bits prefix written before `section_length`: `0xB000` for most
/// tables, `0xF000` for SDT (all four reserved bits set).
pub const RESERVED_PREFIX_DEFAULT: u16 = 0xB000;
/// SDT's all-ones reserved-bits prefix.
pub const RESERVED_PREFIX_SDT: u16 = 0xF000;

/// Maximum section length the 12-bit `section_length` field can encode.
pub const MAX_SECTION_LENGTH: usize = 1021;

/// Builds a long-form PSI section (`table_id`, syntax indicator, version,
/// section_number/last_section_number, CRC) from `payload`, per spec §4.1.
///
/// Returns `Err(InvalidConfig)` when the resulting section would exceed
/// [`MAX_SECTION_LENGTH`].
pub fn build_section(
    crc: &Crc32Mpeg2,
    table_id: u8,
    reserved_prefix: u16,
    table_id_ext: u16,
    version: u8,
    section_number: u8,
    last_section_number: u8,
    payload: &[u8],
) -> Result<BytesMut> {
    let section_length = payload.len() + 9;
    if section_length > MAX_SECTION_LENGTH {
        return Err(MuxError::InvalidConfig(format!(
            "section for table_id {:#x} too large: {} bytes (limit {})",
            table_id, section_length, MAX_SECTION_LENGTH
        )));
    }

    let mut section = BytesMut::with_capacity(section_length + 4);
    section.put_u8(table_id);
    section.put_u16(reserved_prefix | (section_length as u16 & 0x0FFF));
    section.put_u16(table_id_ext);
    section.put_u8(0xC0 | ((version & 0x1F) << 1) | 0x01);
    section.put_u8(section_number);
    section.put_u8(last_section_number);
    section.extend_from_slice(payload);

    let crc_value = crc.calculate(&section);
    section.put_u32(crc_value);

    Ok(section)
}

/// Builds a short-form ("private") section as used by the TOT (spec §4.1,
/// §4.2): no `table_id_extension`/`section_number`/`last_section_number`
/// bytes, just `table_id`, `section_length`, `payload`, CRC.
pub fn build_short_section(
    crc: &Crc32Mpeg2,
    table_id: u8,
    reserved_prefix: u16,
    payload: &[u8],
) -> Result<BytesMut> {
    let section_length = payload.len() + 4;
    if section_length > MAX_SECTION_LENGTH {
        return Err(MuxError::InvalidConfig(format!(
            "section for table_id {:#x} too large: {} bytes (limit {})",
            table_id, section_length, MAX_SECTION_LENGTH
        )));
    }

    let mut section = BytesMut::with_capacity(section_length + 3);
    section.put_u8(table_id);
    section.put_u16(reserved_prefix | (section_length as u16 & 0x0FFF));
    section.extend_from_slice(payload);

    let crc_value = crc.calculate(&section);
    section.put_u32(crc_value);

    Ok(section)
}

/// Chunks a complete section into 188-byte TS packets on `pid`, advancing
/// `continuity_counter` (mod 16) once per emitted packet, and appends them
/// to `out`. The first packet carries `payload_unit_start` and a 1-byte
/// `pointer_field` of 0; the final packet is padded with 0xFF stuffing
/// bytes in its payload area (spec §4.1).
pub fn write_section_packets(
    out: &mut Vec<u8>,
    section: &[u8],
    pid: u16,
    continuity_counter: &mut u8,
) {
    let mut offset = 0usize;
    let mut first = true;

    while offset < section.len() || first {
        let header_len = 4;
        let pointer_len = if first { 1 } else { 0 };
        let available_for_payload = TS_PACKET_SIZE - header_len - pointer_len;
        let take = available_for_payload.min(section.len() - offset);
        let pad = available_for_payload - take;

        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        let header = TSHeader {
            transport_error: false,
            payload_unit_start: first,
            transport_priority: false,
            pid,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: *continuity_counter,
        };
        header.write_to(&mut buf);

        if first {
            buf.put_u8(0x00);
        }
        buf.extend_from_slice(&section[offset..offset + take]);
        offset += take;
        buf.resize(buf.len() + pad, 0xFF);

        *continuity_counter = (*continuity_counter + 1) & 0x0F;
        out.extend_from_slice(&buf);
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_crc_verifies() {
        let crc = Crc32Mpeg2::new();
        let section = build_section(&crc, 0x00, RESERVED_PREFIX_DEFAULT, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]).unwrap();
        let body = &section[..section.len() - 4];
        let trailing = u32::from_be_bytes(section[section.len() - 4..].try_into().unwrap());
        assert_eq!(crc.calculate(body), trailing);
    }

    #[test]
    fn packets_start_with_sync_byte_and_pointer_field() {
        let crc = Crc32Mpeg2::new();
        let section = build_section(&crc, 0x00, RESERVED_PREFIX_DEFAULT, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]).unwrap();
        let mut out = Vec::new();
        let mut cc = 0u8;
        write_section_packets(&mut out, &section, PID_PAT_FOR_TEST, &mut cc);
        assert_eq!(out.len() % TS_PACKET_SIZE, 0);
        for chunk in out.chunks(TS_PACKET_SIZE) {
            assert_eq!(chunk[0], 0x47);
        }
        assert_eq!(out[4], 0x00); // pointer_field
        assert_eq!(cc, 1);
    }

    const PID_PAT_FOR_TEST: u16 = 0;
}
