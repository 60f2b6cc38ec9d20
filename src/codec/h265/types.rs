use bytes::Bytes;

/// H.265 NAL unit types relevant to muxing (spec §4.6).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NALUnitType {
    /// IDR picture with random-access decodable leading pictures.
    IdrWRadl,
    /// IDR picture with no leading pictures.
    IdrNLp,
    /// Video parameter set.
    Vps,
    /// Sequence parameter set.
    Sps,
    /// Picture parameter set.
    Pps,
    /// Access unit delimiter.
    Aud,
    /// Any other NAL unit type.
    Unspecified(u8),
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            19 => NALUnitType::IdrWRadl,
            20 => NALUnitType::IdrNLp,
            32 => NALUnitType::Vps,
            33 => NALUnitType::Sps,
            34 => NALUnitType::Pps,
            35 => NALUnitType::Aud,
            other => NALUnitType::Unspecified(other),
        }
    }
}

/// A single H.265 NAL unit.
#[derive(Debug)]
pub struct NALUnit {
    /// The unit's type, decoded from the 6-bit `nal_unit_type` field.
    pub nal_type: NALUnitType,
    /// The NAL payload, including its two-byte header.
    pub data: Bytes,
}

impl NALUnit {
    /// Parses the two-byte NAL header at the front of `data`.
    pub fn new(data: Bytes) -> Self {
        let nal_type = NALUnitType::from((data[0] >> 1) & 0x3F);
        Self { nal_type, data }
    }

    /// True for unit types that mark a random-access point (spec §4.6).
    pub fn is_keyframe(&self) -> bool {
        matches!(
            self.nal_type,
            NALUnitType::IdrWRadl | NALUnitType::IdrNLp | NALUnitType::Vps
        )
    }
}
