//! DVB/ISDB descriptor writers used by the PMT, SDT, NIT, and EIT table
//! builders (spec §4.2). Each function appends one complete descriptor
//! (tag, length, payload) to `buf`.

use crate::av::{AudioCodec, VideoCodec};
use crate::error::{MuxError, Result};
use bytes::{BufMut, BytesMut};

fn write_descriptor(buf: &mut BytesMut, tag: u8, body: &[u8]) {
    buf.put_u8(tag);
    buf.put_u8(body.len() as u8);
    buf.extend_from_slice(body);
}

/// ISO 639 language descriptor (tag 0x0A), one 3-byte language code plus
/// an audio-type byte.
pub fn iso_639_language(buf: &mut BytesMut, lang: &[u8; 3], audio_type: u8) {
    let mut body = BytesMut::with_capacity(4);
    body.extend_from_slice(lang);
    body.put_u8(audio_type);
    write_descriptor(buf, 0x0A, &body);
}

/// Registration descriptor (tag 0x05) carrying a 4-byte format identifier
/// such as `"drac"`, `"VC-1"`, `"Opus"`, `"BSSD"`, `"KLVA"`.
pub fn registration(buf: &mut BytesMut, format_identifier: &[u8; 4]) {
    write_descriptor(buf, 0x05, format_identifier);
}

/// AC-3 descriptor (tag 0x6A, System-B variant) or E-AC-3 descriptor (tag
/// 0x7A). Minimal form: all flag bits clear, no optional fields.
pub fn ac3_descriptor(buf: &mut BytesMut, is_eac3: bool) {
    let tag = if is_eac3 { 0x7A } else { 0x6A };
    write_descriptor(buf, tag, &[0x00]);
}

/// Parental rating descriptor (tag 0x55): one `(country_code[3],
/// rating)` entry.
pub fn parental_rating(buf: &mut BytesMut, country_code: &[u8; 3], rating: u8) {
    let mut body = BytesMut::with_capacity(4);
    body.extend_from_slice(country_code);
    body.put_u8(rating);
    write_descriptor(buf, 0x55, &body);
}

/// Subtitling descriptor (tag 0x59): one `(lang[3], subtitling_type,
/// composition_page_id, ancillary_page_id)` entry (spec §4.2).
pub fn subtitling(
    buf: &mut BytesMut,
    lang: &[u8; 3],
    subtitling_type: u8,
    composition_page_id: u16,
    ancillary_page_id: u16,
) {
    let mut body = BytesMut::with_capacity(8);
    body.extend_from_slice(lang);
    body.put_u8(subtitling_type);
    body.put_u16(composition_page_id);
    body.put_u16(ancillary_page_id);
    write_descriptor(buf, 0x59, &body);
}

/// Teletext descriptor (tag 0x56): one `(lang[3], teletext_type,
/// magazine, page)` entry, default initial page `0x08 0x00` (spec §4.2).
pub fn teletext(buf: &mut BytesMut, lang: &[u8; 3], teletext_type: u8, magazine: u8, page: u8) {
    let mut body = BytesMut::with_capacity(5);
    body.extend_from_slice(lang);
    body.put_u8((teletext_type << 3) | (magazine & 0x07));
    body.put_u8(page);
    write_descriptor(buf, 0x56, &body);
}

/// Service descriptor (tag 0x48): `service_type`, length-prefixed
/// provider name, length-prefixed service name (spec §4.2).
pub fn service(buf: &mut BytesMut, service_type: u8, provider_name: &str, name: &str) {
    let mut body = BytesMut::new();
    body.put_u8(service_type);
    body.put_u8(provider_name.len() as u8);
    body.extend_from_slice(provider_name.as_bytes());
    body.put_u8(name.len() as u8);
    body.extend_from_slice(name.as_bytes());
    write_descriptor(buf, 0x48, &body);
}

/// Network name descriptor (tag 0x40).
pub fn network_name(buf: &mut BytesMut, name: &str) {
    write_descriptor(buf, 0x40, name.as_bytes());
}

/// System management descriptor (tag 0xFE), ISDB broadcasting-system
/// identifier `0x03` ("terrestrial") / broadcaster-id `0x01` (spec §4.2).
pub fn system_management(buf: &mut BytesMut) {
    write_descriptor(buf, 0xFE, &[0x03, 0x01]);
}

/// One transmission-type record inside the TS-information descriptor:
/// `transmission_type_info` byte and the service ids carried by it.
pub struct TransmissionTypeRecord {
    /// `transmission_type_info` byte: `0xAF` for one-seg, `0x0F` otherwise.
    pub transmission_type_info: u8,
    /// Service ids carried under this transmission type.
    pub service_ids: Vec<u16>,
}

/// TS-information descriptor (tag 0xCD): remote-control-key id, a
/// length-prefixed TS name, then one or more transmission-type records
/// (spec §4.2).
pub fn ts_information(
    buf: &mut BytesMut,
    remote_control_key_id: u8,
    ts_name: &str,
    records: &[TransmissionTypeRecord],
) {
    let mut body = BytesMut::new();
    body.put_u8(remote_control_key_id);
    body.put_u8(((ts_name.len() as u8) & 0x3F) << 2);
    body.extend_from_slice(ts_name.as_bytes());
    for rec in records {
        body.put_u8(rec.transmission_type_info);
        body.put_u8(rec.service_ids.len() as u8);
        for sid in &rec.service_ids {
            body.put_u16(*sid);
        }
    }
    write_descriptor(buf, 0xCD, &body);
}

/// Service-list descriptor (tag 0x41): `(sid, service_type)` pairs.
pub fn service_list(buf: &mut BytesMut, entries: &[(u16, u8)]) {
    let mut body = BytesMut::with_capacity(entries.len() * 3);
    for (sid, service_type) in entries {
        body.put_u16(*sid);
        body.put_u8(*service_type);
    }
    write_descriptor(buf, 0x41, &body);
}

/// Partial reception descriptor (tag 0xFB): one-seg service ids.
pub fn partial_reception(buf: &mut BytesMut, service_ids: &[u16]) {
    let mut body = BytesMut::with_capacity(service_ids.len() * 2);
    for sid in service_ids {
        body.put_u16(*sid);
    }
    write_descriptor(buf, 0xFB, &body);
}

/// Terrestrial delivery system descriptor (tag 0xFA): area code, guard
/// interval, transmission mode, and one carrier frequency (spec §4.2 and
/// §9 open question 1: the frequency formula is parameterised by
/// `use_intended_formula`, see `freq::terrestrial_frequency`).
pub fn terrestrial_delivery_system(
    buf: &mut BytesMut,
    area_code: u16,
    guard_interval: u8,
    transmission_mode: u8,
    frequency_units_of_1_7mhz: u32,
) {
    let mut body = BytesMut::with_capacity(4);
    let word0 = ((area_code & 0x0FFF) << 4)
        | (((guard_interval & 0x3) as u16) << 2)
        | (transmission_mode & 0x3) as u16;
    body.put_u16(word0);
    body.put_u16(frequency_units_of_1_7mhz as u16);
    write_descriptor(buf, 0xFA, &body);
}

/// Local time offset descriptor (tag 0x58): one entry for country "BRA".
pub fn local_time_offset(
    buf: &mut BytesMut,
    country_code: &[u8; 3],
    region_id: u8,
    polarity_negative: bool,
    local_time_offset_bcd: u16,
    time_of_change_mjd_utc: [u8; 5],
    next_time_offset_bcd: u16,
) {
    let mut body = BytesMut::with_capacity(13);
    body.extend_from_slice(country_code);
    body.put_u8((region_id << 2) | 0x01 | ((polarity_negative as u8) << 1));
    body.put_u16(local_time_offset_bcd);
    body.extend_from_slice(&time_of_change_mjd_utc);
    body.put_u16(next_time_offset_bcd);
    write_descriptor(buf, 0x58, &body);
}

/// Short event descriptor (tag 0x4D): language, length-prefixed event
/// name, length-prefixed event text.
pub fn short_event(buf: &mut BytesMut, lang: &[u8; 3], event_name: &str, text: &str) {
    let mut body = BytesMut::new();
    body.extend_from_slice(lang);
    body.put_u8(event_name.len() as u8);
    body.extend_from_slice(event_name.as_bytes());
    body.put_u8(text.len() as u8);
    body.extend_from_slice(text.as_bytes());
    write_descriptor(buf, 0x4D, &body);
}

/// Component descriptor (tag 0x50): stream content/type plus a
/// length-prefixed component text (kept empty by default).
pub fn component(buf: &mut BytesMut, stream_content: u8, component_type: u8, component_tag: u8) {
    let mut body = BytesMut::new();
    body.put_u8(0xF0 | (stream_content & 0x0F));
    body.put_u8(component_type);
    body.put_u8(component_tag);
    body.extend_from_slice(&[0, 0, 0]); // ISO_639_language_code, defaulted
    body.put_u8(0); // empty text length
    write_descriptor(buf, 0x50, &body);
}

/// Audio component descriptor (tag 0xC4): simplified single-entry form
/// covering the sampling-rate/main-component fields the mux controls.
pub fn audio_component(buf: &mut BytesMut, component_tag: u8, sampling_rate: u8, lang: &[u8; 3]) {
    let mut body = BytesMut::new();
    body.put_u8(0xF0); // stream_content (audio) | reserved
    body.put_u8(0x01); // component_type: single mono/stereo
    body.put_u8(component_tag);
    body.put_u8(0xFF); // stream_type, unused here
    body.put_u8((sampling_rate & 0x07) << 4 | 0x0F);
    body.extend_from_slice(lang);
    body.put_u8(0); // empty text length
    write_descriptor(buf, 0xC4, &body);
}

/// Content descriptor (tag 0x54): one `(content_nibble_level_1<<4 |
/// level_2, user_nibble)` entry.
pub fn content(buf: &mut BytesMut, genre: u8) {
    write_descriptor(buf, 0x54, &[genre, 0x00]);
}

/// Resolves the PMT stream-type byte for a video codec (spec §4.2 Table 1).
pub fn video_stream_type(codec: VideoCodec) -> u8 {
    use crate::format::ts::types::stream_type::*;
    match codec {
        VideoCodec::Mpeg2 => MPEG2_VIDEO,
        VideoCodec::Mpeg4Part2 => MPEG4_PART2,
        VideoCodec::H264 => H264,
        VideoCodec::Hevc => HEVC,
        VideoCodec::Avs => AVS,
        VideoCodec::Dirac => DIRAC,
        VideoCodec::Vc1 => VC1,
    }
}

/// Resolves the PMT stream-type byte for an audio codec, applying the
/// System-B private-data substitution for AC-3/E-AC-3 (spec §4.2 Table 1).
pub fn audio_stream_type(codec: AudioCodec, system_b: bool) -> u8 {
    use crate::format::ts::types::stream_type::*;
    match codec {
        AudioCodec::Aac { latm: true } => AAC_LATM,
        AudioCodec::Aac { latm: false } => AAC_ADTS,
        AudioCodec::Mp2 | AudioCodec::Mp3 => MPEG_AUDIO,
        AudioCodec::Ac3 => {
            if system_b {
                PRIVATE_DATA
            } else {
                AC3
            }
        }
        AudioCodec::Eac3 => {
            if system_b {
                PRIVATE_DATA
            } else {
                EAC3
            }
        }
        AudioCodec::Dts => DTS,
        AudioCodec::TrueHd => TRUEHD,
        AudioCodec::Opus { .. } | AudioCodec::S302m => PRIVATE_DATA,
    }
}

/// Rejects an Opus channel mapping this mux cannot encode (spec §4.2,
/// §4.6): only RFC 7845 families 0 and 1, channel counts 1..8.
pub fn opus_channel_mapping_table(channels: u8) -> Result<[u8; 2]> {
    if channels == 0 || channels > 8 {
        return Err(MuxError::NotSupported(format!(
            "unsupported Opus channel count {}",
            channels
        )));
    }
    // RFC 7845 Vorbis-style channel mapping tables for mono/stereo
    // (mapping family 0) and the multichannel family-1 layouts,
    // expressed here as (channel_mapping_family, stream_count) pairs;
    // coupled-stream counts follow RFC 7845 §5.1.1.2.
    let (family, stream_count) = match channels {
        1 | 2 => (0u8, channels),
        3 => (1, 2),
        4 => (1, 2),
        5 => (1, 3),
        6 => (1, 4),
        7 => (1, 4),
        8 => (1, 5),
        _ => unreachable!(),
    };
    Ok([family, stream_count])
}

/// DVB extension descriptor carrying the Opus channel mapping (tag 0x7F,
/// extension tag 0x80) (spec §4.2).
pub fn opus_dvb_extension(buf: &mut BytesMut, channels: u8) {
    let mut body = BytesMut::new();
    body.put_u8(0x80); // extension descriptor tag: user defined (DVB Opus)
    match opus_channel_mapping_table(channels) {
        Ok([family, stream_count]) => {
            body.put_u8(channels);
            body.put_u8(family);
            body.put_u8(stream_count);
        }
        Err(_) => {
            log::error!("opus channel mapping unsupported for {} channels", channels);
            body.put_u8(0xFF);
        }
    }
    write_descriptor(buf, 0x7F, &body);
}
