use bytes::Bytes;

/// H.264 NAL unit types relevant to muxing (spec §4.6): everything else
/// passes through as `Unspecified`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NALUnitType {
    /// Coded slice of a non-IDR picture.
    CodedSliceNonIDR,
    /// Coded slice of an IDR picture (random-access point).
    CodedSliceIDR,
    /// Supplemental enhancement information.
    SEI,
    /// Sequence parameter set.
    SPS,
    /// Picture parameter set.
    PPS,
    /// Access unit delimiter.
    AccessUnitDelimiter,
    /// Any other NAL unit type.
    Unspecified(u8),
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NALUnitType::CodedSliceNonIDR,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            other => NALUnitType::Unspecified(other),
        }
    }
}

/// A single NAL unit, as found between Annex-B start codes.
#[derive(Debug)]
pub struct NALUnit {
    /// `nal_ref_idc`: 0 for disposable units.
    pub nal_ref_idc: u8,
    /// The unit's type.
    pub nal_type: NALUnitType,
    /// The NAL payload, including its one-byte header.
    pub data: Bytes,
}

impl NALUnit {
    /// Parses the one-byte NAL header at the front of `data`.
    pub fn new(data: Bytes) -> Self {
        let header = data[0];
        Self {
            nal_ref_idc: (header >> 5) & 0x03,
            nal_type: NALUnitType::from(header & 0x1F),
            data,
        }
    }

    /// True for unit types that mark a random-access point (spec §4.6:
    /// drives `random_access_indicator`).
    pub fn is_keyframe(&self) -> bool {
        matches!(
            self.nal_type,
            NALUnitType::CodedSliceIDR | NALUnitType::SPS | NALUnitType::PPS
        )
    }
}
