//! Public facade (C8, spec §6): `TsMux` owns the service registry, PSI
//! cadence, per-PID continuity counters, and per-service PCR pacing, and
//! turns `InputPacket`s into a byte stream written to any `std::io::Write`
//! sink. Synchronous end to end, unlike the teacher's `async_trait`
//! `Muxer` — see `DESIGN.md`.

use crate::av::{AudioCodec, InputPacket, StreamKind, VideoCodec};
use crate::cadence::{self, TableCadence};
use crate::codec::{aac, h264, h265, opus};
use crate::config::MuxConfig;
use crate::error::{MuxError, Result};
use crate::format::ts::pes::{self, PesHeaderParams};
use crate::format::ts::section::write_section_packets;
use crate::format::ts::tables::{self, EitEvent, FrequencyFormula};
use crate::format::ts::types::{self, AdaptationField, TSHeader, PCR_HZ, PTS_HZ, TS_PACKET_SIZE};
use crate::m2ts;
use crate::service::{ServiceRegistry, StreamSlot};
use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};
use chrono::Utc;

/// Accumulates an audio stream's payload across `write_packet` calls until
/// its cadence forces a PES flush (spec §4.3: "audio packets accumulate
/// into the stream's payload buffer up to `pes_payload_size`").
struct AudioBuffer {
    data: BytesMut,
    first_pts: Option<i64>,
    first_dts: Option<i64>,
    last_dts: Option<i64>,
    /// Accumulated Opus sample count at 48 kHz, flushed at 5760 samples
    /// (120 ms) regardless of buffer fill (spec §4.3 step c).
    opus_samples: u32,
    random_access: bool,
}

/// Continuity counters for the five fixed PSI PIDs.
#[derive(Debug, Default)]
struct PsiContinuity {
    pat: u8,
    nit: u8,
    sdt: u8,
    tot: u8,
    eit: u8,
}

/// Cadence state for the five periodic tables (spec §4.5).
struct PsiCadence {
    pat: TableCadence,
    sdt: TableCadence,
    nit: TableCadence,
    tot: TableCadence,
    eit: TableCadence,
}

impl PsiCadence {
    fn new(cfg: &MuxConfig) -> Self {
        let pat_packets = cfg
            .pat_period_s
            .map(|_| u32::MAX)
            .unwrap_or_else(|| Self::packets_for(cfg, cadence::defaults::PAT_PERIOD_MS, cadence::defaults::VBR_PAT_PACKETS));
        let mut pat = TableCadence::with_packet_period(pat_packets);
        if let Some(s) = cfg.pat_period_s {
            pat.set_wall_clock_period_seconds(s);
        }

        let sdt_packets = cfg
            .sdt_period_s
            .map(|_| u32::MAX)
            .unwrap_or_else(|| Self::packets_for(cfg, cadence::defaults::SDT_PERIOD_MS, cadence::defaults::VBR_SDT_PACKETS));
        let mut sdt = TableCadence::with_packet_period(sdt_packets);
        if let Some(s) = cfg.sdt_period_s {
            sdt.set_wall_clock_period_seconds(s);
        }

        let nit = TableCadence::with_packet_period(Self::packets_for(
            cfg,
            cadence::defaults::NIT_PERIOD_MS,
            cadence::defaults::VBR_NIT_TOT_EIT_PACKETS,
        ));
        let tot = TableCadence::with_packet_period(Self::packets_for(
            cfg,
            cadence::defaults::TOT_PERIOD_MS,
            cadence::defaults::VBR_NIT_TOT_EIT_PACKETS,
        ));
        let eit = TableCadence::with_packet_period(Self::packets_for(
            cfg,
            cadence::defaults::EIT_PERIOD_MS,
            cadence::defaults::VBR_NIT_TOT_EIT_PACKETS,
        ));

        Self { pat, sdt, nit, tot, eit }
    }

    fn packets_for(cfg: &MuxConfig, period_ms: u32, vbr_fallback: u32) -> u32 {
        if cfg.is_cbr() {
            cadence::period_ms_to_packets(cfg.muxrate, period_ms)
        } else {
            vbr_fallback
        }
    }

    fn force_all(&mut self) {
        self.pat.force_next();
        self.sdt.force_next();
        self.nit.force_next();
        self.tot.force_next();
        self.eit.force_next();
    }
}

/// Ties the mux's public operations together: owns every stream, PID, and
/// table builder input and turns `write_packet` calls into bytes on `W`.
pub struct TsMux<W: std::io::Write> {
    config: MuxConfig,
    registry: ServiceRegistry,
    crc: Crc32Mpeg2,
    writer: W,
    psi_cc: PsiContinuity,
    psi_cadence: PsiCadence,
    eit_events: Vec<Option<EitEvent>>,
    clock_90k: i64,
    cbr_start_90k: Option<i64>,
    bytes_written: u64,
    network_name: String,
    ts_name: String,
    frequency_formula: FrequencyFormula,
    sdt_one_seg_corrected: bool,
    eit_table_id_ext_override: Option<u16>,
    /// Initial PCR offset derived from `max_delay` (spec §3 `first_pcr`),
    /// added to the CBR PCR formula's byte-offset term.
    first_pcr: u64,
    /// True when the most recently written video access unit was a
    /// keyframe; tracks the non-key-to-key transition `pat_pmt_at_frames`
    /// forces PAT on (spec §4.5).
    prev_video_key: bool,
    /// Per-stream audio accumulation buffers, indexed like
    /// `registry.streams`. Video and subtitle streams never populate a slot.
    audio_buffers: Vec<Option<AudioBuffer>>,
}

impl<W: std::io::Write> TsMux<W> {
    /// Builds the service registry from `stream_kinds`, writes the initial
    /// PAT/PMT/SDT/NIT/TOT burst, and returns a ready-to-use mux (spec §6
    /// `init`).
    pub fn init(config: MuxConfig, stream_kinds: &[StreamKind], writer: W) -> Result<Self> {
        let mut registry = ServiceRegistry::build(&config, stream_kinds)?;
        let n_services = registry.services.len();

        let pcr_packet_period = if config.is_cbr() {
            cadence::period_ms_to_packets(config.muxrate, config.pcr_period_ms)
        } else {
            cadence::defaults::VBR_NIT_TOT_EIT_PACKETS
        };
        for svc in registry.services.iter_mut() {
            svc.pcr_packet_period = pcr_packet_period;
        }

        let psi_cadence = PsiCadence::new(&config);
        let eit_table_id_ext_override = Some(config.transport_stream_id);
        let audio_buffers = (0..stream_kinds.len()).map(|_| None).collect();
        // First PCR offset derived from max_delay (spec §3), expressed in
        // 27 MHz units.
        let first_pcr = (config.max_delay.max(0) as u64) * (PCR_HZ / PTS_HZ);

        let mut mux = Self {
            registry,
            crc: Crc32Mpeg2::new(),
            writer,
            psi_cc: PsiContinuity::default(),
            psi_cadence,
            eit_events: vec![None; n_services],
            clock_90k: 0,
            cbr_start_90k: None,
            bytes_written: 0,
            network_name: "ISDB-Tb Network".to_string(),
            ts_name: "ISDB-Tb TS".to_string(),
            frequency_formula: FrequencyFormula::Intended,
            sdt_one_seg_corrected: true,
            eit_table_id_ext_override,
            first_pcr,
            prev_video_key: false,
            audio_buffers,
            config,
        };

        mux.emit_psi(None, true)?;
        Ok(mux)
    }

    /// Sets the network/TS names the NIT descriptor set carries.
    pub fn with_network_names(mut self, network_name: &str, ts_name: &str) -> Self {
        self.network_name = network_name.to_string();
        self.ts_name = ts_name.to_string();
        self
    }

    /// Registers (or clears, with `None`) the current/following event
    /// advertised by the EIT for `service_index`.
    pub fn set_current_event(&mut self, service_index: usize, event: Option<EitEvent>) {
        if let Some(slot) = self.eit_events.get_mut(service_index) {
            *slot = event;
        }
    }

    /// Forces PAT/PMT/SDT/NIT/TOT/EIT to be rebuilt on the very next
    /// `write_packet` call, mirroring `MpegtsFlags::resend_headers`.
    pub fn force_resend_headers(&mut self) {
        self.psi_cadence.force_all();
    }

    /// Validates that `data` is correctly framed for `kind`, without
    /// mutating any mux state (spec §6 `check_bitstream`).
    pub fn check_bitstream(kind: StreamKind, data: &[u8]) -> Result<()> {
        match kind {
            StreamKind::Video(VideoCodec::H264) => {
                h264::split_annex_b(data)?;
            }
            StreamKind::Video(VideoCodec::Hevc) => {
                h265::split_annex_b(data)?;
            }
            StreamKind::Audio(AudioCodec::Aac { latm: false }) => {
                if !aac::is_adts_sync(data) {
                    return Err(MuxError::InvalidData(
                        "AAC stream is not ADTS-framed".into(),
                    ));
                }
            }
            StreamKind::Audio(AudioCodec::Opus { .. }) => {
                opus::packet_frame_count(data)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Packetises one access unit (spec §6 `write_packet`, §4.3 steps 1-9).
    pub fn write_packet(&mut self, packet: &InputPacket) -> Result<()> {
        let slot = self
            .registry
            .streams
            .get(packet.stream_index)
            .ok_or_else(|| {
                MuxError::InvalidData(format!("unknown stream index {}", packet.stream_index))
            })?
            .clone();

        if let Some(dts) = packet.effective_dts() {
            self.clock_90k = self.clock_90k.max(dts);
        }
        if self.cbr_start_90k.is_none() {
            self.cbr_start_90k = Some(self.clock_90k);
        }

        if self.config.mpegts_flags.resend_headers {
            self.psi_cadence.force_all();
            self.config.mpegts_flags.resend_headers = false;
        }
        if slot.kind.is_video() && self.config.mpegts_flags.pat_pmt_at_frames {
            if packet.is_key && !self.prev_video_key {
                self.psi_cadence.pat.force_next();
            }
            self.prev_video_key = packet.is_key;
        }

        self.emit_psi(Some(self.clock_90k), false)?;

        let frames_written = self.registry.streams[packet.stream_index].frames_written;
        let (payload, random_access) = self.prepare_payload(&slot.kind, packet, frames_written)?;
        self.registry.streams[packet.stream_index].frames_written = frames_written + 1;

        let stream_id_override = packet.side_data.iter().find_map(|sd| match sd {
            crate::av::SideData::MpegtsStreamId(id) => Some(*id),
            _ => None,
        });

        // Video and subtitles emit one PES per access unit; audio
        // accumulates into a per-stream buffer (spec §4.3).
        if slot.kind.is_video() || matches!(slot.kind, StreamKind::Subtitle(_)) {
            self.emit_pes(
                packet.stream_index,
                &slot,
                payload,
                packet.pts,
                packet.dts,
                random_access,
                stream_id_override,
            )?;
        } else {
            self.push_audio(packet.stream_index, &slot, payload, packet, random_access)?;
        }

        self.pad_to_cbr_rate()?;
        Ok(())
    }

    /// Appends `payload` to the audio stream's accumulation buffer, flushing
    /// it as a PES packet once the buffer would overflow
    /// `config.pes_payload_size`, its DTS range reaches `config.max_delay`,
    /// or (for Opus) its queued sample count reaches 5760 (120 ms at 48
    /// kHz) — spec §4.3's three flush triggers.
    fn push_audio(
        &mut self,
        stream_index: usize,
        slot: &StreamSlot,
        payload: BytesMut,
        packet: &InputPacket,
        random_access: bool,
    ) -> Result<()> {
        let is_opus = matches!(slot.kind, StreamKind::Audio(AudioCodec::Opus { .. }));
        let frame_samples = if is_opus {
            opus::packet_frame_count(&packet.data).unwrap_or(1) as u32 * 960
        } else {
            0
        };

        if let Some(existing) = &self.audio_buffers[stream_index] {
            if existing.data.len() + payload.len() > self.config.pes_payload_size {
                self.flush_audio_buffer(stream_index, slot)?;
            }
        }

        let buf = self.audio_buffers[stream_index].get_or_insert_with(|| AudioBuffer {
            data: BytesMut::new(),
            first_pts: packet.pts,
            first_dts: packet.dts,
            last_dts: packet.effective_dts(),
            opus_samples: 0,
            random_access,
        });
        buf.data.extend_from_slice(&payload);
        buf.last_dts = packet.effective_dts().or(buf.last_dts);
        buf.opus_samples += frame_samples;
        buf.random_access = buf.random_access || random_access;

        let dts_range = match (buf.first_dts, buf.last_dts) {
            (Some(a), Some(b)) => (b - a).max(0),
            _ => 0,
        };

        if buf.data.len() >= self.config.pes_payload_size
            || dts_range >= self.config.max_delay
            || (is_opus && buf.opus_samples >= 5760)
        {
            self.flush_audio_buffer(stream_index, slot)?;
        }
        Ok(())
    }

    /// Emits the audio stream's accumulated buffer (if non-empty) as one
    /// PES packet.
    fn flush_audio_buffer(&mut self, stream_index: usize, slot: &StreamSlot) -> Result<()> {
        if let Some(buf) = self.audio_buffers[stream_index].take() {
            if buf.data.is_empty() {
                return Ok(());
            }
            self.emit_pes(
                stream_index,
                slot,
                buf.data,
                buf.first_pts,
                buf.first_dts,
                buf.random_access,
                None,
            )?;
        }
        Ok(())
    }

    /// Flushes every stream's pending audio buffer, in stream order.
    fn flush_all_audio_buffers(&mut self) -> Result<()> {
        for stream_index in 0..self.audio_buffers.len() {
            if self.audio_buffers[stream_index].is_some() {
                let slot = self.registry.streams[stream_index].clone();
                self.flush_audio_buffer(stream_index, &slot)?;
            }
        }
        Ok(())
    }

    /// Builds the PES header for `payload` and chunks it into TS packets on
    /// `slot`'s PID, applying PCR/random-access adaptation-field flags and
    /// advancing that stream's continuity counter (spec §4.3 steps 5-9).
    #[allow(clippy::too_many_arguments)]
    fn emit_pes(
        &mut self,
        stream_index: usize,
        slot: &StreamSlot,
        payload: BytesMut,
        pts: Option<i64>,
        dts: Option<i64>,
        random_access: bool,
        stream_id_override: Option<u8>,
    ) -> Result<()> {
        let stream_id =
            pes::default_stream_id(slot.kind, self.config.m2ts_enabled(), stream_id_override);

        let pts_90k = pts.map(|v| v as u64 & 0x1_FFFF_FFFF);
        let dts_90k = dts.map(|v| v as u64 & 0x1_FFFF_FFFF);
        let header = pes::build_pes_header(&PesHeaderParams {
            stream_id,
            pts: pts_90k,
            dts: dts_90k,
            payload_len: payload.len(),
            omit_packet_length: slot.kind.is_video() && self.config.omit_video_pes_length,
            data_alignment: true,
            teletext_padding: matches!(
                slot.kind,
                StreamKind::Subtitle(crate::av::SubtitleCodec::Teletext)
            ),
        });

        let mut full = BytesMut::with_capacity(header.len() + payload.len());
        full.extend_from_slice(&header);
        full.extend_from_slice(&payload);

        let pcr = self.maybe_pcr_for(slot);

        let mut out = Vec::new();
        let mut cc = slot.cc;
        write_pes_packets(&mut out, &full, slot.pid, &mut cc, pcr, random_access, false);
        self.registry.streams[stream_index].cc = cc;

        self.emit_bytes(&out)
    }

    /// Applies each codec adapter's framing rules, returning the bytes to
    /// carry in the PES payload and whether this access unit is a
    /// random-access point.
    fn prepare_payload(
        &self,
        kind: &StreamKind,
        packet: &InputPacket,
        frames_written: u64,
    ) -> Result<(BytesMut, bool)> {
        match kind {
            StreamKind::Video(VideoCodec::H264) => {
                let extradata = packet.side_data.iter().find_map(|sd| match sd {
                    crate::av::SideData::Extradata(bytes) => Some(bytes.clone()),
                    _ => None,
                });
                match h264::validate_or_warn(&packet.data, frames_written)? {
                    Some(units) => {
                        let ra = h264::is_random_access(&units) || packet.is_key;
                        let normalized = h264::normalize_access_unit(
                            &units,
                            packet.is_key,
                            extradata.as_deref(),
                        );
                        Ok((normalized, ra))
                    }
                    None => Ok((BytesMut::from(&packet.data[..]), packet.is_key)),
                }
            }
            StreamKind::Video(VideoCodec::Hevc) => {
                let units = h265::split_annex_b(&packet.data)?;
                let ra = h265::is_random_access(&units) || packet.is_key;
                Ok((BytesMut::from(&packet.data[..]), ra))
            }
            StreamKind::Audio(AudioCodec::Aac { latm: true }) => {
                if aac::is_adts_sync(&packet.data) {
                    let header = aac::parse_adts_header(&packet.data)?;
                    let raw = aac::strip_adts_header(&packet.data, &header);
                    Ok((aac::build_loas_frame(raw, &header), packet.is_key))
                } else {
                    Err(MuxError::InvalidData(
                        "LATM fallback requires ADTS-framed input to derive AudioSpecificConfig"
                            .into(),
                    ))
                }
            }
            StreamKind::Audio(AudioCodec::Opus { .. }) => {
                let skip_samples = packet.side_data.iter().find_map(|sd| match sd {
                    crate::av::SideData::SkipSamples { start, end } => Some((*start, *end)),
                    _ => None,
                });
                let trim_start = skip_samples
                    .map(|(start, _)| start)
                    .filter(|v| *v > 0)
                    .map(|v| v as u16);
                let trim_end = skip_samples
                    .map(|(_, end)| end)
                    .filter(|v| *v > 0)
                    .map(|v| v as u16);
                Ok((
                    opus::build_access_unit(&packet.data, trim_start, trim_end)?,
                    packet.is_key,
                ))
            }
            StreamKind::Subtitle(crate::av::SubtitleCodec::Dvb) => Ok((
                pes::wrap_dvb_subtitle_payload(&packet.data),
                packet.is_key,
            )),
            _ => Ok((BytesMut::from(&packet.data[..]), packet.is_key)),
        }
    }

    /// Returns `Some(pcr)` when `slot` is its service's PCR stream and the
    /// service's PCR cadence is due (spec §4.3, §4.5).
    fn maybe_pcr_for(&mut self, slot: &StreamSlot) -> Option<u64> {
        let svc = &mut self.registry.services[slot.service_index];
        if svc.pcr_pid != slot.pid {
            return None;
        }
        svc.pcr_packet_count = svc.pcr_packet_count.saturating_add(1);
        if svc.pcr_packet_count < svc.pcr_packet_period {
            return None;
        }
        svc.pcr_packet_count = 0;
        Some(self.pcr_at_byte_offset(self.bytes_written))
    }

    /// The PCR value (27 MHz units) for output at `byte_offset` (spec
    /// §4.3 step 2): CBR derives it from the writer's position and
    /// `mux_rate`; VBR derives it from the current DTS minus `max_delay`.
    fn pcr_at_byte_offset(&self, byte_offset: u64) -> u64 {
        if self.config.is_cbr() {
            let numerator = (byte_offset as u128 + 11) * 8 * PCR_HZ as u128;
            (numerator / self.config.muxrate as u128) as u64 + self.first_pcr
        } else {
            let dts_minus_delay = (self.clock_90k - self.config.max_delay).max(0) as u64;
            dts_minus_delay * (PCR_HZ / PTS_HZ)
        }
    }

    /// Rebuilds and emits any PSI table whose cadence is due (or all of
    /// them, if `force`).
    fn emit_psi(&mut self, now: Option<i64>, force: bool) -> Result<()> {
        if force {
            self.psi_cadence.force_all();
        } else {
            self.psi_cadence.pat.tick();
            self.psi_cadence.sdt.tick();
            self.psi_cadence.nit.tick();
            self.psi_cadence.tot.tick();
            self.psi_cadence.eit.tick();
        }

        if self.psi_cadence.pat.should_emit(now) {
            self.emit_pat_and_pmts()?;
            self.psi_cadence.pat.mark_emitted(now);
        }
        if self.psi_cadence.sdt.should_emit(now) {
            self.emit_sdt()?;
            self.psi_cadence.sdt.mark_emitted(now);
        }
        if self.psi_cadence.nit.should_emit(now) {
            self.emit_nit()?;
            self.psi_cadence.nit.mark_emitted(now);
        }
        if self.psi_cadence.tot.should_emit(now) {
            self.emit_tot()?;
            self.psi_cadence.tot.mark_emitted(now);
        }
        if self.psi_cadence.eit.should_emit(now) {
            self.emit_eit()?;
            self.psi_cadence.eit.mark_emitted(now);
        }
        Ok(())
    }

    fn emit_pat_and_pmts(&mut self) -> Result<()> {
        let section = tables::build_pat(
            &self.crc,
            &self.registry,
            self.config.transport_stream_id,
            self.config.tables_version,
        )?;
        let mut out = Vec::new();
        write_section_packets(&mut out, &section, types::PID_PAT, &mut self.psi_cc.pat);

        let mut updated_cc = Vec::with_capacity(self.registry.services.len());
        for (i, svc) in self.registry.services.iter().enumerate() {
            let refs: Vec<&crate::service::StreamSlot> =
                self.registry.streams_for_service(i).collect();
            let section = tables::build_pmt(
                &self.crc,
                svc,
                &refs,
                self.config.mpegts_flags.system_b,
                self.config.tables_version,
            )?;
            let mut cc = svc.cc;
            write_section_packets(&mut out, &section, svc.pmt_pid, &mut cc);
            updated_cc.push(cc);
        }
        for (i, cc) in updated_cc.into_iter().enumerate() {
            self.registry.services[i].cc = cc;
        }
        self.emit_bytes(&out)
    }

    fn emit_sdt(&mut self) -> Result<()> {
        let section = tables::build_sdt(
            &self.crc,
            &self.registry,
            self.config.transport_stream_id,
            self.config.original_network_id,
            self.config.service_type,
            self.sdt_one_seg_corrected,
            self.config.tables_version,
        )?;
        let mut out = Vec::new();
        write_section_packets(&mut out, &section, types::PID_SDT, &mut self.psi_cc.sdt);
        self.emit_bytes(&out)
    }

    fn emit_nit(&mut self) -> Result<()> {
        let section = tables::build_nit(
            &self.crc,
            &self.registry,
            &self.config,
            &self.network_name,
            &self.ts_name,
            self.frequency_formula,
            self.config.tables_version,
        )?;
        let mut out = Vec::new();
        write_section_packets(&mut out, &section, types::PID_NIT, &mut self.psi_cc.nit);
        self.emit_bytes(&out)
    }

    fn emit_tot(&mut self) -> Result<()> {
        let section = tables::build_tot(&self.crc, Utc::now())?;
        let mut out = Vec::new();
        write_section_packets(&mut out, &section, types::PID_TOT, &mut self.psi_cc.tot);
        self.emit_bytes(&out)
    }

    fn emit_eit(&mut self) -> Result<()> {
        if self.eit_events.iter().all(Option::is_none) {
            return Ok(());
        }
        let mut out = Vec::new();
        for event in self.eit_events.iter().flatten() {
            let section = tables::build_eit(
                &self.crc,
                &self.registry,
                self.config.transport_stream_id,
                event,
                self.eit_table_id_ext_override,
                self.config.tables_version,
            )?;
            write_section_packets(&mut out, &section, types::PID_EIT, &mut self.psi_cc.eit);
        }
        self.emit_bytes(&out)
    }

    /// Inserts null packets (PID 0x1FFF) until cumulative output matches
    /// the configured CBR `muxrate` for elapsed time (spec §4.3/§5): only
    /// active when `config.is_cbr()`.
    fn pad_to_cbr_rate(&mut self) -> Result<()> {
        if !self.config.is_cbr() {
            return Ok(());
        }
        let start = self.cbr_start_90k.unwrap_or(self.clock_90k);
        let elapsed = (self.clock_90k - start).max(0) as u128;
        let expected_bytes = (self.config.muxrate as u128 * elapsed) / (8 * PTS_HZ as u128);

        let mut null_packets = Vec::new();
        while (self.bytes_written as u128) < expected_bytes {
            write_null_packet(&mut null_packets);
            self.bytes_written += TS_PACKET_SIZE as u64;
        }
        if !null_packets.is_empty() {
            self.write_raw(&null_packets)?;
        }
        Ok(())
    }

    /// Writes a batch of back-to-back 188-byte TS packets, applying M2TS
    /// framing if enabled, and tracks `bytes_written` for CBR pacing.
    fn emit_bytes(&mut self, packets: &[u8]) -> Result<()> {
        self.bytes_written += packets.len() as u64;
        self.write_raw(packets)
    }

    fn write_raw(&mut self, packets: &[u8]) -> Result<()> {
        if self.config.m2ts_enabled() {
            let mut framed = Vec::with_capacity(packets.len() / TS_PACKET_SIZE * 192);
            // `bytes_written` already includes this call's bytes (set by
            // `emit_bytes` before `write_raw` runs), so the offset of this
            // batch's first packet is `bytes_written - packets.len()`.
            let mut offset = self.bytes_written.saturating_sub(packets.len() as u64);
            for chunk in packets.chunks(TS_PACKET_SIZE) {
                let atc = self.pcr_at_byte_offset(offset) as i64;
                m2ts::write_m2ts_packet(&mut framed, chunk, atc);
                offset += chunk.len() as u64;
            }
            self.writer.write_all(&framed)?;
        } else {
            self.writer.write_all(packets)?;
        }
        Ok(())
    }

    /// Flushes the underlying writer (spec §6 `flush`).
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(MuxError::Io)
    }

    /// Flushes every pending audio buffer, emits a final PSI burst, and
    /// flushes the underlying writer (spec §6 `write_trailer`).
    pub fn write_trailer(&mut self) -> Result<()> {
        self.flush_all_audio_buffers()?;
        self.emit_psi(Some(self.clock_90k), true)?;
        self.flush()
    }

    /// Consumes the mux, returning the underlying writer (spec §6
    /// `deinit`).
    pub fn deinit(self) -> W {
        self.writer
    }
}

/// Writes one null packet (PID 0x1FFF, no adaptation field, 184 bytes of
/// `0xFF` payload) to `out`.
fn write_null_packet(out: &mut Vec<u8>) {
    let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
    let header = TSHeader {
        transport_error: false,
        payload_unit_start: false,
        transport_priority: false,
        pid: types::PID_NULL,
        scrambling_control: 0,
        adaptation_field_exists: false,
        contains_payload: true,
        continuity_counter: 0,
    };
    header.write_to(&mut buf);
    buf.resize(TS_PACKET_SIZE, 0xFF);
    out.extend_from_slice(&buf);
}

/// Chunks `data` into 188-byte TS packets on `pid`, prefixing the first
/// packet's adaptation field with `pcr`/`random_access`/`discontinuity`
/// flags when any are set, and padding every packet's tail with
/// adaptation-field stuffing (spec §4.1, §4.3 steps 7-9). Unlike
/// [`write_section_packets`], no `pointer_field` is ever written.
fn write_pes_packets(
    out: &mut Vec<u8>,
    data: &[u8],
    pid: u16,
    continuity_counter: &mut u8,
    first_pcr: Option<u64>,
    random_access: bool,
    discontinuity: bool,
) {
    let mut offset = 0usize;
    let mut first = true;

    while offset < data.len() || first {
        let has_flags = first && (first_pcr.is_some() || random_access || discontinuity);
        let mut af = AdaptationField::default();
        if has_flags {
            af.pcr = first_pcr;
            af.random_access = random_access;
            af.discontinuity = discontinuity;
        }

        let header_len = 4;
        let base_af_len = if has_flags { af.encoded_len() } else { 0 };
        let available = TS_PACKET_SIZE - header_len - base_af_len;
        let take = available.min(data.len().saturating_sub(offset));
        let pad = available - take;

        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        let adaptation_field_exists = has_flags || pad > 0;
        let header = TSHeader {
            transport_error: false,
            payload_unit_start: first,
            transport_priority: false,
            pid,
            scrambling_control: 0,
            adaptation_field_exists,
            contains_payload: true,
            continuity_counter: *continuity_counter,
        };
        header.write_to(&mut buf);

        if has_flags {
            af.stuffing_len = pad;
            af.write_to(&mut buf);
        } else if pad == 1 {
            buf.put_u8(0x00);
        } else if pad > 1 {
            let stuff_af = AdaptationField {
                stuffing_len: pad - 2,
                ..Default::default()
            };
            stuff_af.write_to(&mut buf);
        }

        buf.extend_from_slice(&data[offset..offset + take]);
        offset += take;

        *continuity_counter = (*continuity_counter + 1) & 0x0F;
        out.extend_from_slice(&buf);
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{AudioCodec, InputPacket, StreamKind, VideoCodec};

    fn h264_au(idr: bool) -> Vec<u8> {
        let mut v = vec![0, 0, 0, 1, 9, 0xF0]; // AUD already present
        v.extend_from_slice(&[0, 0, 0, 1, if idr { 5 } else { 1 }, 0xAA, 0xBB]);
        v
    }

    #[test]
    fn init_writes_initial_psi_burst() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Video(VideoCodec::H264)];
        let out: Vec<u8> = Vec::new();
        let mux = TsMux::init(cfg, &kinds, out).unwrap();
        let bytes = mux.deinit();
        assert!(!bytes.is_empty());
        assert_eq!(bytes.len() % TS_PACKET_SIZE, 0);
    }

    #[test]
    fn write_packet_produces_pes_with_pcr_on_first_packet() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Video(VideoCodec::H264)];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();

        let packet = InputPacket::new(h264_au(true))
            .with_pts(90_000)
            .with_dts(90_000)
            .with_key_flag(true);
        mux.write_packet(&packet).unwrap();
        let bytes = mux.deinit();
        assert_eq!(bytes.len() % TS_PACKET_SIZE, 0);
    }

    #[test]
    fn audio_stream_round_trips_through_write_packet() {
        let cfg = MuxConfig::new();
        let kinds = vec![
            StreamKind::Video(VideoCodec::H264),
            StreamKind::Audio(AudioCodec::Aac { latm: false }),
        ];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();
        let adts = vec![0xFF, 0xF1, 0x50, 0x80, 0x43, 0x80, 0x00, 1, 2, 3, 4];
        let packet = InputPacket::new(adts)
            .with_pts(90_000)
            .with_stream_index(1);
        mux.write_packet(&packet).unwrap();
    }

    #[test]
    fn audio_buffer_is_flushed_by_write_trailer() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Audio(AudioCodec::Aac { latm: false })];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();
        let adts = vec![0xFF, 0xF1, 0x50, 0x80, 0x43, 0x80, 0x00, 1, 2, 3, 4];
        let packet = InputPacket::new(adts).with_pts(90_000);
        mux.write_packet(&packet).unwrap();
        // Buffered: nothing but the initial PSI burst has been written yet.
        assert!(mux.audio_buffers[0].is_some());
        mux.write_trailer().unwrap();
        assert!(mux.audio_buffers[0].is_none());
        let bytes = mux.deinit();
        assert_eq!(bytes.len() % TS_PACKET_SIZE, 0);
    }

    #[test]
    fn audio_buffer_flushes_once_max_delay_elapses() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Audio(AudioCodec::Aac { latm: false })];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();
        let adts = vec![0xFF, 0xF1, 0x50, 0x80, 0x43, 0x80, 0x00, 1, 2, 3, 4];

        mux.write_packet(&InputPacket::new(adts.clone()).with_pts(0))
            .unwrap();
        assert!(mux.audio_buffers[0].is_some());

        let far_future = mux.config.max_delay + 1;
        mux.write_packet(&InputPacket::new(adts).with_pts(far_future))
            .unwrap();
        // The first packet's buffer was flushed once the DTS range crossed
        // max_delay; the second packet started a fresh buffer.
        assert!(mux.audio_buffers[0].is_some());
    }

    #[test]
    fn h264_keyframe_without_aud_or_sps_gets_both_injected() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Video(VideoCodec::H264)];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();

        let extradata = vec![0, 0, 0, 1, 7, 0xEE]; // SPS
        let slice = vec![0, 0, 0, 1, 5, 0xAA]; // IDR slice, no AUD/SPS
        let packet = InputPacket::new(slice)
            .with_pts(0)
            .with_key_flag(true)
            .with_side_data(crate::av::SideData::Extradata(extradata.into()));

        mux.write_packet(&packet).unwrap();
        let bytes = mux.deinit();
        assert_eq!(bytes.len() % TS_PACKET_SIZE, 0);
    }

    #[test]
    fn h264_missing_start_code_is_fatal_on_first_frame_only() {
        let cfg = MuxConfig::new();
        let kinds = vec![StreamKind::Video(VideoCodec::H264)];
        let mut mux = TsMux::init(cfg, &kinds, Vec::new()).unwrap();

        let garbage = InputPacket::new(vec![1, 2, 3]).with_pts(0);
        assert!(mux.write_packet(&garbage).is_err());

        mux.write_packet(&InputPacket::new(h264_au(true)).with_pts(0).with_key_flag(true))
            .unwrap();
        // Now that a frame has been written, a missing start code warns
        // instead of erroring.
        mux.write_packet(&InputPacket::new(vec![1, 2, 3]).with_pts(90_000))
            .unwrap();
    }
}
