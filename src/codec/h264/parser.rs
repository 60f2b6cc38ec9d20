use super::types::{NALUnit, NALUnitType};
use crate::error::{MuxError, Result};
use bytes::{Bytes, BytesMut};
use log::warn;

/// The access-unit delimiter NAL H.264 muxing inserts ahead of each
/// keyframe when one isn't already present (spec §4.6): `primary_pic_type
/// = 7` ("any slice type"), matching the safest/most permissive value.
const AUD_NAL: [u8; 2] = [0x09, 0xF0];

/// Splits an Annex-B bitstream (`00 00 01` or `00 00 00 01` start codes)
/// into NAL units. Returns an error if no start code is found at all,
/// which means the input isn't Annex-B framed.
pub fn split_annex_b(data: &[u8]) -> Result<Vec<NALUnit>> {
    let starts = find_start_codes(data);
    if starts.is_empty() {
        return Err(MuxError::InvalidData(
            "H.264 payload has no Annex-B start code".into(),
        ));
    }

    let mut units = Vec::with_capacity(starts.len());
    for i in 0..starts.len() {
        let (begin, code_len) = starts[i];
        let payload_start = begin + code_len;
        let payload_end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(data.len());
        if payload_end <= payload_start {
            continue;
        }
        units.push(NALUnit::new(Bytes::copy_from_slice(
            &data[payload_start..payload_end],
        )));
    }
    Ok(units)
}

/// Returns `(offset, code_len)` for every `00 00 01`/`00 00 00 01` start
/// code in `data`, in order.
fn find_start_codes(data: &[u8]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if i > 0 && data[i - 1] == 0 {
                out.push((i - 1, 4));
            } else {
                out.push((i, 3));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    out
}

/// True if any unit in `units` is already an access unit delimiter.
fn has_aud(units: &[NALUnit]) -> bool {
    units
        .iter()
        .any(|u| u.nal_type == NALUnitType::AccessUnitDelimiter)
}

/// True if any unit in `units` is a sequence parameter set.
fn has_sps(units: &[NALUnit]) -> bool {
    units.iter().any(|u| u.nal_type == NALUnitType::SPS)
}

/// True if the access unit contains a random-access point (spec §4.6).
pub fn is_random_access(units: &[NALUnit]) -> bool {
    units.iter().any(|u| u.is_keyframe())
}

/// Validates Annex-B framing, tolerating a missing start code once the
/// stream has already emitted at least one frame (spec §4.6: "Missing
/// start code while `nb_frames > 0` is a warning; while 0 it is a fatal
/// data error"). Returns the access unit unchanged (validation only) when
/// tolerated; callers should skip AUD/extradata normalization in that case.
pub fn validate_or_warn(data: &[u8], frames_written: u64) -> Result<Option<Vec<NALUnit>>> {
    if find_start_codes(data).is_empty() {
        if frames_written > 0 {
            warn!("H.264 access unit has no Annex-B start code, passing through unmodified");
            return Ok(None);
        }
        return Err(MuxError::InvalidData(
            "H.264 payload has no Annex-B start code".into(),
        ));
    }
    Ok(Some(split_annex_b(data)?))
}

/// Rewrites `data` into Annex-B with 4-byte start codes throughout. On a
/// keyframe, prepends an access unit delimiter if one wasn't already
/// present, and — when the keyframe carries no SPS of its own — injects
/// `extradata` (the stream's out-of-band SPS/PPS) right after it (spec
/// §4.6).
pub fn normalize_access_unit(
    units: &[NALUnit],
    is_key: bool,
    extradata: Option<&[u8]>,
) -> BytesMut {
    let mut out = BytesMut::with_capacity(units.iter().map(|u| u.data.len() + 4).sum::<usize>() + 16);

    if is_key {
        if !has_aud(units) {
            out.extend_from_slice(&[0, 0, 0, 1]);
            out.extend_from_slice(&AUD_NAL);
        }
        if !has_sps(units) {
            if let Some(extra) = extradata {
                out.extend_from_slice(extra);
            }
        }
    }
    for unit in units {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(&unit.data);
    }
    out
}
