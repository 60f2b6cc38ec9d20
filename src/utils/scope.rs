//! Length-prefix scope helper.
//!
//! Several PSI tables nest loop-length fields several levels deep (PMT's
//! `program_info_length`/`ES_info_length`, NIT's transport-stream-loop and
//! descriptor-loop lengths, EIT's per-event descriptor-loop length). The C
//! source this crate's tables are modelled on writes through a moving cursor
//! and patches the length field after its children are written; this is the
//! Rust equivalent — reserve a placeholder, write the children, then patch.

use bytes::BytesMut;

/// A reserved length field awaiting patch-up once its scope's body has been
/// written.
///
/// `width` bytes were reserved at `pos` in the buffer, to be overwritten in
/// place with `body_len | (reserved_bits << (8 * width - top_bits))` once
/// `close` is called. Most MPEG-TS/DVB loop-length fields are 12 bits
/// prefixed with 4 reserved-`1` bits packed into 2 bytes; a few (the PMT's
/// `program_info_length`/`ES_info_length`) share that shape.
pub struct LengthScope {
    pos: usize,
    reserved_high_nibble: u8,
}

impl LengthScope {
    /// Reserves a 2-byte length field at the buffer's current end, writing a
    /// zeroed placeholder. `reserved_high_nibble` is OR'd into the top 4
    /// bits on close (e.g. `0xF` for `reserved_future_use(4) || length(12)`).
    pub fn open_u16_12(buf: &mut BytesMut, reserved_high_nibble: u8) -> Self {
        let pos = buf.len();
        buf.extend_from_slice(&[0u8, 0u8]);
        Self {
            pos,
            reserved_high_nibble,
        }
    }

    /// Patches the reserved field with the number of bytes written to `buf`
    /// since this scope was opened (excluding the 2-byte field itself).
    pub fn close(self, buf: &mut BytesMut) {
        let body_len = buf.len() - self.pos - 2;
        debug_assert!(body_len <= 0x0FFF, "descriptor/program loop too long");
        let value = ((self.reserved_high_nibble as u16) << 12) | (body_len as u16 & 0x0FFF);
        buf[self.pos] = (value >> 8) as u8;
        buf[self.pos + 1] = value as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patches_length_after_children_written() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0xAA]);
        let scope = LengthScope::open_u16_12(&mut buf, 0xF);
        buf.extend_from_slice(&[1, 2, 3]);
        scope.close(&mut buf);
        assert_eq!(buf[0], 0xAA);
        assert_eq!(&buf[1..3], &[0xF0, 0x03]);
        assert_eq!(&buf[3..6], &[1, 2, 3]);
    }
}
