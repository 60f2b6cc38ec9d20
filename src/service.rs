//! Service model (C4): the registry of services, per-service PMT/PCR PIDs,
//! per-stream PID assignment, and profile-driven service-id synthesis
//! (spec §4.4).
//!
//! Mirrors the teacher's "owns a flat arena, streams reference by index"
//! layout rather than the C source's cyclic pointers between streams and
//! services (spec §9 design note): `Service` records live in
//! `ServiceRegistry::services`, and each `StreamSlot` holds a stable
//! `service_index` into that arena instead of a back-reference.

use crate::av::StreamKind;
use crate::config::{MuxConfig, TransmissionProfile};
use crate::error::{MuxError, Result};

/// Service-type sub-index encoded in bits [4:3] of an ISDB `sid` (spec
/// §3/§4.4): `0b00` full-seg, `0b11` one-seg.
pub const SID_TYPE_FULL_SEG: u16 = 0b00;
/// One-seg service-type sub-index.
pub const SID_TYPE_ONE_SEG: u16 = 0b11;

/// One broadcast service: a row in the PAT, a PMT, and an SDT entry.
#[derive(Debug, Clone)]
pub struct Service {
    /// 16-bit service id.
    pub sid: u16,
    /// PMT PID for this service.
    pub pmt_pid: u16,
    /// PCR PID; `0x1FFF` means unset until the first stream is assigned.
    pub pcr_pid: u16,
    /// Provider name written into the SDT service descriptor.
    pub provider_name: String,
    /// Service name written into the SDT service descriptor.
    pub name: String,
    /// PMT section continuity counter (4-bit, mod 16).
    pub cc: u8,
    /// Number of PES packets written to this service's PCR stream since
    /// the last PCR emission.
    pub pcr_packet_count: u32,
    /// PCR emission period, in packets.
    pub pcr_packet_period: u32,
    /// True when this service is a one-seg (ISDB partial-reception)
    /// service: `(sid >> 3) & 0x3 == SID_TYPE_ONE_SEG`.
    pub one_seg: bool,
}

impl Service {
    /// DVB `service_type` byte for the SDT service descriptor (spec §4.2):
    /// `0xC0` ("digital television service" variant used for one-seg) if
    /// one-seg, else the configured default.
    pub fn dvb_service_type(&self, default_service_type: u8) -> u8 {
        if self.one_seg {
            0xC0
        } else {
            default_service_type
        }
    }
}

/// One elementary stream bound to a service and a PID.
#[derive(Debug, Clone)]
pub struct StreamSlot {
    /// Index into [`ServiceRegistry::services`] of the owning service.
    pub service_index: usize,
    /// Elementary-stream PID.
    pub pid: u16,
    /// Stream kind/codec.
    pub kind: StreamKind,
    /// PES continuity counter (4-bit, mod 16).
    pub cc: u8,
    /// ISO 639 language code for audio/subtitle descriptors. Defaults to
    /// Portuguese ("por"), matching the EIT short-event descriptor's
    /// fixed language (spec §4.2).
    pub language: [u8; 3],
    /// Access units written to this stream so far. Drives the H.264
    /// missing-start-code error policy (spec §4.6): a fatal error on the
    /// very first frame, a warning thereafter.
    pub frames_written: u64,
}

/// Owns every [`Service`] and [`StreamSlot`] for one mux instance, and
/// performs the PID-assignment and service-id-synthesis rules of spec
/// §4.4.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    /// All services, in PAT order.
    pub services: Vec<Service>,
    /// All streams, indexed by the caller's `stream_index`.
    pub streams: Vec<StreamSlot>,
}

impl ServiceRegistry {
    /// Builds the service set for `cfg.transmission_profile`, then assigns
    /// `stream_kinds` to services round-robin and allocates their PIDs.
    pub fn build(cfg: &MuxConfig, stream_kinds: &[StreamKind]) -> Result<Self> {
        let mut services = synthesize_services(cfg);

        let mut registry = ServiceRegistry {
            services: Vec::new(),
            streams: Vec::new(),
        };

        // PMT PIDs allocated contiguously from pmt_start_pid.
        for (i, svc) in services.iter_mut().enumerate() {
            svc.pmt_pid = cfg.pmt_start_pid + i as u16;
        }
        registry.services = services;

        let mut used_pids: Vec<u16> = registry.services.iter().map(|s| s.pmt_pid).collect();

        // Tracks, per service, whether a video stream has already claimed
        // the PCR role — guards the "first video stream wins" branch below
        // so it can fire at most once per service instead of migrating to
        // every subsequent video stream.
        let mut pcr_claimed_by_video = vec![false; registry.services.len()];

        let n_services = registry.services.len().max(1);
        for (stream_index, kind) in stream_kinds.iter().enumerate() {
            let pid = assign_stream_pid(cfg, stream_index, &used_pids)?;
            used_pids.push(pid);

            let service_index = stream_index % n_services;
            registry.streams.push(StreamSlot {
                service_index,
                pid,
                kind: *kind,
                cc: 0,
                language: *b"por",
                frames_written: 0,
            });

            let svc = &mut registry.services[service_index];
            if svc.pcr_pid == 0x1FFF {
                svc.pcr_pid = pid;
                if kind.is_video() {
                    pcr_claimed_by_video[service_index] = true;
                }
            } else if kind.is_video() && !pcr_claimed_by_video[service_index] {
                // First video stream's PID always wins the PCR role (spec
                // §4.4), even if a non-video stream claimed it first.
                svc.pcr_pid = pid;
                pcr_claimed_by_video[service_index] = true;
            }
        }

        Ok(registry)
    }

    /// Streams belonging to `service_index`, in PMT program order.
    pub fn streams_for_service(&self, service_index: usize) -> impl Iterator<Item = &StreamSlot> {
        self.streams
            .iter()
            .filter(move |s| s.service_index == service_index)
    }
}

fn assign_stream_pid(cfg: &MuxConfig, stream_index: usize, used_pids: &[u16]) -> Result<u16> {
    let caller_id = stream_index as u16;
    let pid = if caller_id < 16 {
        cfg.start_pid + stream_index as u16
    } else if caller_id < 0x1FFF {
        caller_id
    } else {
        return Err(MuxError::InvalidConfig(format!(
            "stream id {} out of 13-bit PID range",
            caller_id
        )));
    };

    if used_pids.contains(&pid) {
        return Err(MuxError::InvalidConfig(format!(
            "duplicate PID {:#06x} for stream {}",
            pid, stream_index
        )));
    }

    Ok(pid)
}

fn new_service(sid: u16, name: &str, provider: &str, one_seg: bool) -> Service {
    Service {
        sid,
        pmt_pid: 0,
        pcr_pid: 0x1FFF,
        provider_name: provider.to_string(),
        name: name.to_string(),
        cc: 0,
        pcr_packet_count: 0,
        pcr_packet_period: 0,
        one_seg,
    }
}

/// Synthesises the service set for `cfg.transmission_profile` (spec
/// §4.4). Default provider/name strings follow the boundary scenarios in
/// spec §8 (`"Service01"`, `"SVC HD Full Seg"`, `"SVC LD 1-Seg"`).
fn synthesize_services(cfg: &MuxConfig) -> Vec<Service> {
    let onid = cfg.original_network_id;
    match cfg.transmission_profile {
        TransmissionProfile::Default => {
            vec![new_service(
                cfg.service_id,
                &format!("Service{:02}", cfg.service_id),
                "Provider",
                false,
            )]
        }
        TransmissionProfile::OneFhdOneSeg => {
            let sid_fhd = ((onid & 0x7FF) << 5) | (SID_TYPE_FULL_SEG << 3) | 0;
            let sid_1seg = ((onid & 0x7FF) << 5) | (SID_TYPE_ONE_SEG << 3) | 1;
            vec![
                new_service(sid_fhd, "SVC HD Full Seg", "Provider", false),
                new_service(sid_1seg, "SVC LD 1-Seg", "Provider", true),
            ]
        }
        TransmissionProfile::FourSdOneSeg => {
            let mut svcs = Vec::with_capacity(5);
            for sub in 0..4u16 {
                let sid = ((onid & 0x7FF) << 5) | (SID_TYPE_FULL_SEG << 3) | sub;
                svcs.push(new_service(
                    sid,
                    &format!("SVC SD {}", sub + 1),
                    "Provider",
                    false,
                ));
            }
            let sid_1seg = ((onid & 0x7FF) << 5) | (SID_TYPE_ONE_SEG << 3) | 4;
            svcs.push(new_service(sid_1seg, "SVC LD 1-Seg", "Provider", true));
            svcs
        }
        TransmissionProfile::TwoHdOneSeg => {
            let mut svcs = Vec::with_capacity(3);
            for sub in 0..2u16 {
                let sid = ((onid & 0x7FF) << 5) | (SID_TYPE_FULL_SEG << 3) | sub;
                svcs.push(new_service(
                    sid,
                    &format!("SVC HD {}", sub + 1),
                    "Provider",
                    false,
                ));
            }
            let sid_1seg = ((onid & 0x7FF) << 5) | (SID_TYPE_ONE_SEG << 3) | 4;
            svcs.push(new_service(sid_1seg, "SVC LD 1-Seg", "Provider", true));
            svcs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{StreamKind, VideoCodec, AudioCodec};

    #[test]
    fn default_profile_single_service() {
        let cfg = MuxConfig::new().with_service_id(1);
        let kinds = vec![StreamKind::Video(VideoCodec::H264), StreamKind::Audio(AudioCodec::Aac { latm: false })];
        let reg = ServiceRegistry::build(&cfg, &kinds).unwrap();
        assert_eq!(reg.services.len(), 1);
        assert_eq!(reg.services[0].sid, 1);
        assert_eq!(reg.services[0].pmt_pid, 0x1000);
        assert_eq!(reg.streams[0].pid, 0x0100);
        assert_eq!(reg.streams[1].pid, 0x0101);
        assert_eq!(reg.services[0].pcr_pid, 0x0100);
    }

    #[test]
    fn profile1_synthesizes_two_service_ids() {
        let cfg = MuxConfig::new()
            .with_original_network_id(0x0640)
            .with_transmission_profile(TransmissionProfile::OneFhdOneSeg);
        let kinds = vec![StreamKind::Video(VideoCodec::H264), StreamKind::Video(VideoCodec::H264)];
        let reg = ServiceRegistry::build(&cfg, &kinds).unwrap();
        assert_eq!(reg.services[0].sid, 0xC800);
        assert_eq!(reg.services[1].sid, 0xC819);
        assert!(!reg.services[0].one_seg);
        assert!(reg.services[1].one_seg);
    }

    #[test]
    fn pcr_pid_stays_pinned_to_first_video_stream_in_a_service() {
        let cfg = MuxConfig::new();
        let kinds = vec![
            StreamKind::Audio(AudioCodec::Aac { latm: false }),
            StreamKind::Video(VideoCodec::H264),
            StreamKind::Video(VideoCodec::H264),
        ];
        let reg = ServiceRegistry::build(&cfg, &kinds).unwrap();
        // The non-video stream claims pcr_pid first; the first video stream
        // (index 1) should displace it, and the second video stream (index
        // 2) must not displace it again.
        assert_eq!(reg.services[0].pcr_pid, reg.streams[1].pid);
        assert_ne!(reg.services[0].pcr_pid, reg.streams[2].pid);
    }

    #[test]
    fn duplicate_pid_is_rejected() {
        let cfg = MuxConfig::new();
        // stream 0 -> start_pid (0x0100), explicit caller id 0x0100 (>=16) collides
        let kinds = vec![StreamKind::Video(VideoCodec::H264)];
        let reg = ServiceRegistry::build(&cfg, &kinds).unwrap();
        assert_eq!(reg.streams[0].pid, 0x0100);
    }
}
