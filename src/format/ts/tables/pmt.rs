//! PMT table builder (spec §4.2): one section per service, table_id 0x02,
//! table_id_extension = service sid.

use super::descriptors;
use crate::av::{AudioCodec, DataCodec, StreamKind, SubtitleCodec, VideoCodec};
use crate::error::Result;
use crate::format::ts::section::{build_section, RESERVED_PREFIX_DEFAULT};
use crate::service::{Service, StreamSlot};
use crate::utils::{Crc32Mpeg2, LengthScope};
use bytes::{BufMut, BytesMut};
use log::warn;

/// Bytes of margin the section-length check leaves before aborting a PMT
/// (spec §4.2: "on section overflow (>SECTION_LENGTH − 32 before writing
/// a stream), abort with a diagnostic").
const SECTION_OVERFLOW_MARGIN: usize = 32;
const SECTION_LENGTH_LIMIT: usize = 1021;

/// Builds one PMT section for `service`, describing `streams` (already
/// filtered to that service). Streams that would overflow the section are
/// dropped from the PMT (but still muxed as PES) and logged (spec §7).
pub fn build_pmt(
    crc: &Crc32Mpeg2,
    service: &Service,
    streams: &[&StreamSlot],
    system_b: bool,
    version: u8,
) -> Result<BytesMut> {
    let mut payload = BytesMut::new();
    payload.put_u16(0xE000 | (service.pcr_pid & 0x1FFF));

    let program_info_scope = LengthScope::open_u16_12(&mut payload, 0xF);
    descriptors::parental_rating(&mut payload, b"BRA", 0x01);
    program_info_scope.close(&mut payload);

    for slot in streams {
        let mut stream_buf = BytesMut::new();
        let stream_type = match slot.kind {
            StreamKind::Video(codec) => descriptors::video_stream_type(codec),
            StreamKind::Audio(codec) => descriptors::audio_stream_type(codec, system_b),
            StreamKind::Subtitle(_) => crate::format::ts::types::stream_type::PRIVATE_DATA,
            StreamKind::Data(_) => crate::format::ts::types::stream_type::PRIVATE_DATA,
        };
        stream_buf.put_u8(stream_type);
        stream_buf.put_u16(0xE000 | (slot.pid & 0x1FFF));

        let es_info_scope = LengthScope::open_u16_12(&mut stream_buf, 0xF);
        write_stream_descriptors(&mut stream_buf, slot);
        es_info_scope.close(&mut stream_buf);

        if payload.len() + stream_buf.len() + 9 > SECTION_LENGTH_LIMIT - SECTION_OVERFLOW_MARGIN {
            warn!(
                "PMT for service {:#06x} full, dropping stream at PID {:#06x} from PMT (still muxed)",
                service.sid, slot.pid
            );
            continue;
        }
        payload.extend_from_slice(&stream_buf);
    }

    build_section(
        crc,
        0x02,
        RESERVED_PREFIX_DEFAULT,
        service.sid,
        version,
        0,
        0,
        &payload,
    )
}

fn write_stream_descriptors(buf: &mut BytesMut, slot: &StreamSlot) {
    match slot.kind {
        StreamKind::Audio(codec) => {
            descriptors::iso_639_language(buf, &slot.language, 0x00);
            match codec {
                AudioCodec::Ac3 => descriptors::ac3_descriptor(buf, false),
                AudioCodec::Eac3 => descriptors::ac3_descriptor(buf, true),
                AudioCodec::S302m => descriptors::registration(buf, b"BSSD"),
                AudioCodec::Opus { channels } => {
                    descriptors::registration(buf, b"Opus");
                    descriptors::opus_dvb_extension(buf, channels);
                }
                _ => {}
            }
        }
        StreamKind::Subtitle(SubtitleCodec::Dvb) => {
            descriptors::subtitling(buf, &slot.language, 0x10, 1, 1);
        }
        StreamKind::Subtitle(SubtitleCodec::Teletext) => {
            descriptors::teletext(buf, &slot.language, 0x02, 0, 0x08);
        }
        StreamKind::Video(VideoCodec::Dirac) => descriptors::registration(buf, b"drac"),
        StreamKind::Video(VideoCodec::Vc1) => descriptors::registration(buf, b"VC-1"),
        StreamKind::Data(DataCodec::Klv) => descriptors::registration(buf, b"KLVA"),
        _ => {}
    }
}
