use super::types::{AdtsHeader, ProfileType};
use crate::error::{MuxError, Result};
use bytes::{BufMut, BytesMut};

/// True when `data` starts with a valid ADTS sync word (12 set bits).
pub fn is_adts_sync(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xF0) == 0xF0
}

/// Parses the ADTS header at the front of `data` (spec §4.6: detection
/// drives whether the mux passes the frame through untouched or treats it
/// as raw LATM payload needing its own framing).
pub fn parse_adts_header(data: &[u8]) -> Result<AdtsHeader> {
    if data.len() < 7 {
        return Err(MuxError::InvalidData("ADTS header too short".into()));
    }
    if !is_adts_sync(data) {
        return Err(MuxError::InvalidData("invalid ADTS sync word".into()));
    }

    let mpeg_version = (data[1] >> 3) & 0x01;
    let protection_absent = (data[1] & 0x01) == 1;
    let profile = ProfileType::from((data[2] >> 6) & 0x03);
    let sample_rate_index = (data[2] >> 2) & 0x0F;
    let channel_configuration = ((data[2] & 0x01) << 2) | ((data[3] >> 6) & 0x03);
    let frame_length = (((data[3] & 0x03) as u16) << 11)
        | ((data[4] as u16) << 3)
        | ((data[5] as u16) >> 5);

    Ok(AdtsHeader {
        mpeg_version,
        protection_absent,
        profile,
        sample_rate_index,
        channel_configuration,
        frame_length,
    })
}

/// Strips the ADTS header off one frame, returning the raw AAC payload
/// (used both to re-emit clean ADTS and as LATM `PayloadLengthInfo` data).
pub fn strip_adts_header<'a>(data: &'a [u8], header: &AdtsHeader) -> &'a [u8] {
    let start = header.header_len().min(data.len());
    let end = (header.frame_length as usize).min(data.len());
    if end <= start {
        &data[start..start]
    } else {
        &data[start..end]
    }
}

/// Minimal MSB-first bit writer, local to LATM's `AudioMuxElement` coding
/// (ISO/IEC 14496-3 Annex 1.1.6): the only place in this mux that needs
/// sub-byte field packing.
struct BitWriter {
    buf: BytesMut,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            cur: 0,
            nbits: 0,
        }
    }

    fn put_bits(&mut self, value: u32, bits: u8) {
        for i in (0..bits).rev() {
            let bit = (value >> i) & 1;
            self.cur = (self.cur << 1) | bit as u8;
            self.nbits += 1;
            if self.nbits == 8 {
                self.buf.put_u8(self.cur);
                self.cur = 0;
                self.nbits = 0;
            }
        }
    }

    fn finish(mut self) -> BytesMut {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.buf.put_u8(self.cur);
        }
        self.buf
    }
}

/// Writes an `AudioSpecificConfig` for AAC-LC (ISO/IEC 14496-3 §1.6.2.1),
/// the format LATM's `StreamMuxConfig` embeds.
fn write_audio_specific_config(w: &mut BitWriter, header: &AdtsHeader) {
    w.put_bits(2, 5); // audioObjectType = 2 (AAC LC)
    w.put_bits(header.sample_rate_index as u32, 4);
    w.put_bits(header.channel_configuration as u32, 4);
    w.put_bits(0, 1); // frameLengthFlag = 0 (1024 samples/frame)
    w.put_bits(0, 1); // dependsOnCoreCoder = 0
    w.put_bits(0, 1); // extensionFlag = 0
}

/// Wraps one raw AAC access unit (no ADTS header) in a LOAS/LATM frame
/// (spec §4.6 LATM fallback): every frame carries a full
/// `StreamMuxConfig`, matching the source's always-resend-config
/// behaviour rather than the `useSameStreamMux` shortcut.
pub fn build_loas_frame(raw_aac: &[u8], header: &AdtsHeader) -> BytesMut {
    let mut w = BitWriter::new();

    w.put_bits(0, 1); // audioMuxVersionA = 0
    w.put_bits(1, 1); // allStreamsSameTimeFraming
    w.put_bits(0, 6); // numSubFrames - 1 = 0 (one subframe)
    w.put_bits(0, 4); // numProgram - 1 = 0
    w.put_bits(0, 3); // numLayer - 1 = 0

    write_audio_specific_config(&mut w, header);

    w.put_bits(0, 3); // frameLengthType = 0 (variable, via PayloadLengthInfo)
    w.put_bits(0xFF, 8); // latmBufferFullness

    w.put_bits(0, 1); // otherDataPresent = 0
    w.put_bits(0, 1); // crcCheckPresent = 0

    // PayloadLengthInfo: sequence of 0xFF bytes then the remainder.
    let mut remaining = raw_aac.len();
    while remaining >= 255 {
        w.put_bits(255, 8);
        remaining -= 255;
    }
    w.put_bits(remaining as u32, 8);

    for byte in raw_aac {
        w.put_bits(*byte as u32, 8);
    }

    let element = w.finish();
    let length = element.len() as u16 & 0x1FFF;

    let mut out = BytesMut::with_capacity(element.len() + 3);
    write_loas_header(&mut out, length);
    out.extend_from_slice(&element);
    out
}

/// Writes the 3-byte LOAS header: 11-bit sync word `0x2B7`, 13-bit
/// payload length in bytes.
fn write_loas_header(out: &mut BytesMut, length: u16) {
    let word = (0x2B7u32 << 13) | length as u32; // 24 bits total
    out.put_u8((word >> 16) as u8);
    out.put_u8((word >> 8) as u8);
    out.put_u8(word as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_adts() -> Vec<u8> {
        vec![0xFF, 0xF1, 0x50, 0x80, 0x43, 0x80, 0x00, 1, 2, 3, 4]
    }

    #[test]
    fn detects_sync_word() {
        assert!(is_adts_sync(&sample_adts()));
        assert!(!is_adts_sync(&[0x00, 0x00]));
    }

    #[test]
    fn parses_header_fields() {
        let data = sample_adts();
        let header = parse_adts_header(&data).unwrap();
        assert_eq!(header.sample_rate_index, 4);
        assert_eq!(header.channel_configuration, 2);
        assert!(header.protection_absent);
        assert_eq!(header.sample_rate(), Some(44100));
    }

    #[test]
    fn strips_header_to_raw_payload() {
        let data = sample_adts();
        let header = parse_adts_header(&data).unwrap();
        let payload = strip_adts_header(&data, &header);
        assert_eq!(payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn loas_frame_starts_with_sync_word() {
        let data = sample_adts();
        let header = parse_adts_header(&data).unwrap();
        let payload = strip_adts_header(&data, &header);
        let frame = build_loas_frame(payload, &header);
        let word = ((frame[0] as u32) << 16) | ((frame[1] as u32) << 8) | frame[2] as u32;
        assert_eq!(word >> 13, 0x2B7);
        assert_eq!(word & 0x1FFF, frame.len() as u32 - 3);
    }

    #[test]
    fn rejects_too_short_input() {
        assert!(parse_adts_header(&[0xFF]).is_err());
    }
}
