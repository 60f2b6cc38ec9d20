use super::types::NALUnit;
use bytes::Bytes;

/// Splits an Annex-B bitstream into H.265 NAL units (spec §4.6: H.265
/// gets the same start-code validation as H.264, without AUD insertion).
pub fn split_annex_b(data: &[u8]) -> crate::error::Result<Vec<NALUnit>> {
    let starts = find_start_codes(data);
    if starts.is_empty() {
        return Err(crate::error::MuxError::InvalidData(
            "H.265 payload has no Annex-B start code".into(),
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

/// True if the access unit contains a random-access point.
pub fn is_random_access(units: &[NALUnit]) -> bool {
    units.iter().any(|u| u.is_keyframe())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_units_and_detects_idr() {
        let mut data = vec![0, 0, 0, 1, 32 << 1, 0];
        data.extend_from_slice(&[0, 0, 1, 19 << 1, 0, 0xAA]);
        let units = split_annex_b(&data).unwrap();
        assert_eq!(units.len(), 2);
        assert!(is_random_access(&units));
    }

    #[test]
    fn rejects_missing_start_code() {
        assert!(split_annex_b(&[1, 2, 3]).is_err());
    }
}
