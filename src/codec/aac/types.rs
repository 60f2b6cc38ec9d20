/// MPEG-4 audio object types relevant to ADTS/LATM (ISO/IEC 14496-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    /// AAC Main.
    Main = 0,
    /// AAC Low Complexity, the profile almost every broadcast encoder uses.
    LC = 1,
    /// AAC Scalable Sample Rate.
    SSR = 2,
    /// AAC Long Term Prediction.
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value {
            0 => ProfileType::Main,
            2 => ProfileType::SSR,
            3 => ProfileType::LTP,
            _ => ProfileType::LC,
        }
    }
}

/// Decoded ADTS fixed+variable header fields needed to re-frame or
/// transcode to LATM (spec §4.6).
#[derive(Debug, Clone)]
pub struct AdtsHeader {
    /// MPEG version bit: 0 = MPEG-4, 1 = MPEG-2.
    pub mpeg_version: u8,
    /// True when the 2-byte CRC field is absent.
    pub protection_absent: bool,
    /// Audio object type minus one, per ADTS encoding.
    pub profile: ProfileType,
    /// Index into the standard 13-entry sampling frequency table.
    pub sample_rate_index: u8,
    /// Channel configuration (1 = mono, 2 = stereo, ...).
    pub channel_configuration: u8,
    /// Total frame length in bytes, header included.
    pub frame_length: u16,
}

impl AdtsHeader {
    /// Size of this frame's ADTS header: 7 bytes, or 9 with the CRC
    /// field present.
    pub fn header_len(&self) -> usize {
        if self.protection_absent {
            7
        } else {
            9
        }
    }

    /// Sample rate in Hz, or `None` for a reserved index.
    pub fn sample_rate(&self) -> Option<u32> {
        const TABLE: [u32; 13] = [
            96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
            7350,
        ];
        TABLE.get(self.sample_rate_index as usize).copied()
    }
}
