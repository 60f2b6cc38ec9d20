//! SDT table builder (spec §4.2): PID 0x0011, table_id 0x42.

use super::descriptors;
use crate::error::Result;
use crate::format::ts::section::{build_section, RESERVED_PREFIX_SDT};
use crate::service::ServiceRegistry;
use crate::utils::{Crc32Mpeg2, LengthScope};
use bytes::{BufMut, BytesMut};

/// Spec §9 open question 2: the one-seg bit test. `buggy` reproduces the
/// source's `sid & (0x18 >> 3)` (i.e. `sid & 3`) as the SDT loop uses;
/// `corrected` is `((sid & 0x18) >> 3) == 0x3`, the form the
/// partial-reception loop in NIT uses. See DESIGN.md for which this crate
/// emits by default and why both are kept available.
pub fn sdt_one_seg_bit_buggy(sid: u16) -> bool {
    (sid & (0x18 >> 3)) != 0
}

/// The corrected one-seg test (also `Service::one_seg`).
pub fn sdt_one_seg_bit_corrected(sid: u16) -> bool {
    ((sid & 0x18) >> 3) == 0x3
}

/// Builds the SDT (actual TS) section.
pub fn build_sdt(
    crc: &Crc32Mpeg2,
    registry: &ServiceRegistry,
    transport_stream_id: u16,
    original_network_id: u16,
    default_service_type: u8,
    use_corrected_one_seg_bit: bool,
    version: u8,
) -> Result<BytesMut> {
    let mut payload = BytesMut::new();
    payload.put_u16(original_network_id);
    payload.put_u8(0xFF);

    for svc in &registry.services {
        payload.put_u16(svc.sid);
        // reserved(6)='111111', eit_schedule=0, eit_pf=0
        payload.put_u8(0xFC);
        // running_status(3)=100 (running), free_ca_mode(1)=0 form the
        // reserved high nibble (0x8) ahead of desc_loop_length(12).
        let desc_scope = LengthScope::open_u16_12(&mut payload, 0x8);
        let one_seg = if use_corrected_one_seg_bit {
            svc.one_seg
        } else {
            sdt_one_seg_bit_buggy(svc.sid)
        };
        let service_type = if one_seg { 0xC0 } else { default_service_type };
        descriptors::service(&mut payload, service_type, &svc.provider_name, &svc.name);
        desc_scope.close(&mut payload);
    }

    build_section(
        crc,
        0x42,
        RESERVED_PREFIX_SDT,
        transport_stream_id,
        version,
        0,
        0,
        &payload,
    )
}
