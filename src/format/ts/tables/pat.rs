//! PAT table builder (spec §4.2): PID 0, table_id 0x00.

use crate::error::Result;
use crate::format::ts::section::{build_section, RESERVED_PREFIX_DEFAULT};
use crate::service::ServiceRegistry;
use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

/// Builds a complete PAT section listing every service's `(sid, pmt_pid)`.
pub fn build_pat(
    crc: &Crc32Mpeg2,
    registry: &ServiceRegistry,
    transport_stream_id: u16,
    version: u8,
) -> Result<BytesMut> {
    let mut payload = BytesMut::new();
    for svc in &registry.services {
        payload.put_u16(svc.sid);
        payload.put_u16(0xE000 | (svc.pmt_pid & 0x1FFF));
    }

    build_section(
        crc,
        0x00,
        RESERVED_PREFIX_DEFAULT,
        transport_stream_id,
        version,
        0,
        0,
        &payload,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{StreamKind, VideoCodec};
    use crate::config::MuxConfig;

    #[test]
    fn pat_lists_every_service() {
        let cfg = MuxConfig::new().with_service_id(7);
        let reg = ServiceRegistry::build(&cfg, &[StreamKind::Video(VideoCodec::H264)]).unwrap();
        let crc = Crc32Mpeg2::new();
        let section = build_pat(&crc, &reg, 1, 0).unwrap();
        // table_id, length(2), tsid(2), version/cn, sec#, last_sec# = 8 bytes before payload
        assert_eq!(section[0], 0x00);
        let sid = u16::from_be_bytes([section[8], section[9]]);
        assert_eq!(sid, 7);
        let pmt_pid = u16::from_be_bytes([section[10], section[11]]) & 0x1FFF;
        assert_eq!(pmt_pid, 0x1000);
    }
}
