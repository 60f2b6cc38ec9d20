//! EIT table builder (spec §4.2): PID 0x0012, table_id 0x4E
//! (present/following, actual TS).

use super::descriptors;
use crate::error::Result;
use crate::format::ts::section::{build_section, RESERVED_PREFIX_DEFAULT};
use crate::service::ServiceRegistry;
use crate::utils::{Crc32Mpeg2, LengthScope};
use bytes::{BufMut, BytesMut};

/// One event to advertise for a service (present or following).
#[derive(Debug, Clone)]
pub struct EitEvent {
    /// Event name for the short-event descriptor.
    pub name: String,
    /// Event text for the short-event descriptor.
    pub text: String,
    /// 5-byte MJD/UTC start time.
    pub start_time: [u8; 5],
    /// 3-byte BCD duration (HHMMSS).
    pub duration_bcd: [u8; 3],
}

impl Default for EitEvent {
    fn default() -> Self {
        Self {
            name: String::new(),
            text: String::new(),
            start_time: [0; 5],
            duration_bcd: [0; 3],
        }
    }
}

/// Builds the EIT (present/following) section. `table_id_ext_override`
/// resolves spec §9 open question 3: the source's `mpegts_write_section1`
/// call passes the *last* service's sid as `table_id_extension` instead of
/// the TSID; pass `None` to reproduce that behaviour, or
/// `Some(transport_stream_id)` for the DVB-conformant value.
pub fn build_eit(
    crc: &Crc32Mpeg2,
    registry: &ServiceRegistry,
    transport_stream_id: u16,
    event: &EitEvent,
    table_id_ext_override: Option<u16>,
    version: u8,
) -> Result<BytesMut> {
    let mut payload = BytesMut::new();

    let table_id_ext = table_id_ext_override.unwrap_or_else(|| {
        registry
            .services
            .last()
            .map(|s| s.sid)
            .unwrap_or(transport_stream_id)
    });

    for svc in &registry.services {
        payload.put_u16(svc.sid);
        payload.extend_from_slice(&event.start_time);
        payload.extend_from_slice(&event.duration_bcd);

        // running_status(3)=4, free_ca_mode(1)=0 form the reserved high
        // nibble ahead of desc_loop_length(12).
        let desc_scope = LengthScope::open_u16_12(&mut payload, 0x8);
        descriptors::short_event(&mut payload, b"por", &event.name, &event.text);
        descriptors::parental_rating(&mut payload, b"BRA", 0x01);
        if !svc.one_seg {
            descriptors::component(&mut payload, 0x1, 0x01, 0x00);
            descriptors::audio_component(&mut payload, 0x10, 0x02, b"por");
            descriptors::content(&mut payload, 0x00);
        }
        desc_scope.close(&mut payload);
    }

    build_section(
        crc,
        0x4E,
        RESERVED_PREFIX_DEFAULT,
        table_id_ext,
        version,
        0,
        0,
        &payload,
    )
}
