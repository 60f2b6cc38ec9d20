//! M2TS (Blu-ray BDAV) framing (C7, spec §4.7): prefixes each 188-byte TS
//! packet with a 4-byte `tp_extra_header` = `PCR_at_write_offset mod 2^30`
//! (27 MHz units).

use bytes::{BufMut, BytesMut};

/// Size of the `tp_extra_header` prefix.
pub const TP_EXTRA_HEADER_SIZE: usize = 4;

/// Wraps `pcr` to the 30-bit field M2TS's arrival time stamp uses.
pub fn wrap_atc(pcr: i64) -> u32 {
    (pcr & 0x3FFF_FFFF) as u32
}

/// Prepends the 4-byte `tp_extra_header` to `packet` (which must be
/// exactly one 188-byte TS packet) and appends the result to `out`.
pub fn write_m2ts_packet(out: &mut Vec<u8>, packet: &[u8], pcr: i64) {
    let mut header = BytesMut::with_capacity(TP_EXTRA_HEADER_SIZE);
    header.put_u32(wrap_atc(pcr));
    out.extend_from_slice(&header);
    out.extend_from_slice(packet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::types::TS_PACKET_SIZE;

    #[test]
    fn prefixes_four_bytes_per_packet() {
        let packet = [0x47u8; TS_PACKET_SIZE];
        let mut out = Vec::new();
        write_m2ts_packet(&mut out, &packet, 12345);
        assert_eq!(out.len(), TS_PACKET_SIZE + TP_EXTRA_HEADER_SIZE);
        assert_eq!(&out[TP_EXTRA_HEADER_SIZE..], &packet[..]);
    }

    #[test]
    fn atc_wraps_at_30_bits() {
        let wrapped = wrap_atc(1i64 << 31);
        assert_eq!(wrapped, 0);
    }
}
