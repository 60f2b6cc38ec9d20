//! TOT table builder (spec §4.2): PID 0x0014, table_id 0x73, written as a
//! private (short) section.

use super::descriptors;
use crate::error::Result;
use crate::format::ts::section::{build_short_section, RESERVED_PREFIX_DEFAULT};
use crate::utils::{Crc32Mpeg2, LengthScope};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// Encodes `dt` as the 5-byte MJD/UTC timestamp EN 300 468 uses for the
/// TOT/TDT: 16-bit Modified Julian Date, then 3 BCD bytes of UTC
/// hour/minute/second.
pub fn encode_mjd_utc(dt: DateTime<Utc>) -> [u8; 5] {
    let epoch = NaiveDate::from_ymd_opt(1858, 11, 17).unwrap();
    let mjd = dt.date_naive().signed_duration_since(epoch).num_days();
    let mut out = [0u8; 5];
    out[0] = (mjd >> 8) as u8;
    out[1] = mjd as u8;
    out[2] = to_bcd(dt.hour() as u8);
    out[3] = to_bcd(dt.minute() as u8);
    out[4] = to_bcd(dt.second() as u8);
    out
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Builds the TOT section carrying `now` and a local-time-offset
/// descriptor for country "BRA" (spec §4.2).
pub fn build_tot(crc: &Crc32Mpeg2, now: DateTime<Utc>) -> Result<BytesMut> {
    let mut payload = BytesMut::new();
    payload.extend_from_slice(&encode_mjd_utc(now));

    let desc_scope = LengthScope::open_u16_12(&mut payload, 0xF);
    descriptors::local_time_offset(
        &mut payload,
        b"BRA",
        0,
        true,         // Brazil standard time is UTC-3 (negative polarity)
        0x0300,       // 3 hours, BCD
        [0, 0, 0, 0, 0],
        0x0300,
    );
    desc_scope.close(&mut payload);

    build_short_section(crc, 0x73, RESERVED_PREFIX_DEFAULT, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mjd_epoch_matches_known_value() {
        // 2003-12-13 is 52986 days after the MJD epoch (1858-11-17).
        let dt = Utc.with_ymd_and_hms(2003, 12, 13, 12, 30, 0).unwrap();
        let enc = encode_mjd_utc(dt);
        let mjd = u16::from_be_bytes([enc[0], enc[1]]);
        assert_eq!(mjd, 52986);
        assert_eq!(enc[2], 0x12);
        assert_eq!(enc[3], 0x30);
        assert_eq!(enc[4], 0x00);
    }
}
