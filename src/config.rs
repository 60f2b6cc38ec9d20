//! # Mux configuration
//!
//! `MuxConfig` collects every option spec §6 lists for the public facade.
//! Unlike the teacher's `config.rs` (which loaded an RTSP URL from the
//! environment or a TOML file for example binaries), this struct is built
//! explicitly by the embedding application: option parsing is an external
//! collaborator, not this crate's job.

/// Bitset equivalent of FFmpeg's `mpegts_flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MpegtsFlags {
    /// Force PAT/PMT/SDT/NIT/TOT/EIT to be rebuilt on the very next packet
    /// written after `init` (a one-shot flag, consumed and cleared by the
    /// first `write_packet` call).
    pub resend_headers: bool,
    /// Emit PAT/PMT ahead of every video keyframe, not just on cadence
    /// (spec §4.5: "transition from non-key to key").
    pub pat_pmt_at_frames: bool,
    /// Use ISDB/DVB System-B stream-type and descriptor variants (AC-3 as
    /// private data, etc.) instead of System-A (ATSC) ones.
    pub system_b: bool,
}

/// Whether M2TS (Blu-ray) 4-byte timestamp framing is applied to output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum M2tsMode {
    /// Infer from the output filename extension (`.m2ts` ⇒ enabled).
    #[default]
    Auto,
    /// Always prefix packets with a `tp_extra_header`.
    On,
    /// Never prefix packets.
    Off,
}

/// ISDB-Tb transmission profile, selecting how many services are
/// synthesised and how their service ids are derived from the ONID
/// (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmissionProfile {
    /// A single service using the configured `service_id` verbatim.
    #[default]
    Default,
    /// One full-seg HD service plus one one-seg service.
    OneFhdOneSeg,
    /// Four full-seg SD services plus one one-seg service.
    FourSdOneSeg,
    /// Two full-seg HD services plus one one-seg service.
    TwoHdOneSeg,
}

/// Configuration for a [`crate::mux::TsMux`] instance, gathering every
/// option named in spec §6.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// 16-bit transport stream id (TSID).
    pub transport_stream_id: u16,
    /// 16-bit original network id (ONID).
    pub original_network_id: u16,
    /// Default single-service id, used when `transmission_profile` is
    /// `Default`.
    pub service_id: u16,
    /// Number of services streams are round-robined across.
    pub final_nb_services: u16,
    /// ISDB area code (12 bits).
    pub area_code: u16,
    /// ISDB guard interval (2 bits).
    pub guard_interval: u8,
    /// ISDB transmission mode (2 bits).
    pub transmission_mode: u8,
    /// Physical (RF) channel number.
    pub physical_channel: u16,
    /// Virtual (remote-control) channel number.
    pub virtual_channel: u16,
    /// ISDB transmission profile.
    pub transmission_profile: TransmissionProfile,
    /// DVB service_type byte used when no ISDB profile applies.
    pub service_type: u8,
    /// First PMT PID; subsequent services' PMTs are allocated
    /// contiguously from here.
    pub pmt_start_pid: u16,
    /// First elementary-stream PID for caller stream ids below 16.
    pub start_pid: u16,
    /// M2TS framing mode.
    pub m2ts_mode: M2tsMode,
    /// Output filename, consulted only when `m2ts_mode` is `Auto`.
    pub output_filename: Option<String>,
    /// Multiplex bitrate in bits/sec; `1` means VBR.
    pub muxrate: u64,
    /// Maximum bytes accumulated in a stream's PES payload buffer before
    /// a forced flush.
    pub pes_payload_size: usize,
    /// `mpegts_flags` bitset.
    pub mpegts_flags: MpegtsFlags,
    /// Suppress the `first_pcr`/max-delay DTS offset; `None` selects the
    /// teacher's "auto" behaviour (offset applied only at CBR).
    pub copyts: Option<bool>,
    /// SI table version number (0..31).
    pub tables_version: u8,
    /// Omit `PES_packet_length` for video streams even when it would fit
    /// in 16 bits (matches the standard's recommendation).
    pub omit_video_pes_length: bool,
    /// PCR emission period, in milliseconds.
    pub pcr_period_ms: u32,
    /// PAT/PMT emission period, in seconds; `None` uses the packet-count
    /// cadence instead (spec §4.5).
    pub pat_period_s: Option<f64>,
    /// SDT emission period, in seconds; `None` uses the packet-count
    /// cadence instead.
    pub sdt_period_s: Option<f64>,
    /// Maximum DTS-PCR skew tolerated before an out-of-band PCR/null
    /// packet is inserted, in 90 kHz ticks.
    pub max_delay: i64,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            transport_stream_id: 1,
            original_network_id: 1,
            service_id: 1,
            final_nb_services: 1,
            area_code: 1,
            guard_interval: 1,
            transmission_mode: 1,
            physical_channel: 20,
            virtual_channel: 20,
            transmission_profile: TransmissionProfile::Default,
            service_type: 0x01,
            pmt_start_pid: 0x1000,
            start_pid: 0x0100,
            m2ts_mode: M2tsMode::Auto,
            output_filename: None,
            muxrate: 1,
            pes_payload_size: 2930,
            mpegts_flags: MpegtsFlags::default(),
            copyts: None,
            tables_version: 0,
            omit_video_pes_length: true,
            pcr_period_ms: 20,
            pat_period_s: None,
            sdt_period_s: None,
            max_delay: 7 * 90_000 / 10,
        }
    }
}

impl MuxConfig {
    /// Returns a default configuration, to be customised with the
    /// `with_*` builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport stream id.
    pub fn with_transport_stream_id(mut self, tsid: u16) -> Self {
        self.transport_stream_id = tsid;
        self
    }

    /// Sets the original network id.
    pub fn with_original_network_id(mut self, onid: u16) -> Self {
        self.original_network_id = onid;
        self
    }

    /// Sets the default single-service id.
    pub fn with_service_id(mut self, sid: u16) -> Self {
        self.service_id = sid;
        self
    }

    /// Sets the ISDB transmission profile, overriding `final_nb_services`
    /// to match the profile's service count.
    pub fn with_transmission_profile(mut self, profile: TransmissionProfile) -> Self {
        self.final_nb_services = match profile {
            TransmissionProfile::Default => 1,
            TransmissionProfile::OneFhdOneSeg => 2,
            TransmissionProfile::FourSdOneSeg => 5,
            TransmissionProfile::TwoHdOneSeg => 3,
        };
        self.transmission_profile = profile;
        self
    }

    /// Sets the mpegts_flags bitset.
    pub fn with_mpegts_flags(mut self, flags: MpegtsFlags) -> Self {
        self.mpegts_flags = flags;
        self
    }

    /// Sets the multiplex bitrate; pass `1` to select VBR.
    pub fn with_muxrate(mut self, muxrate: u64) -> Self {
        self.muxrate = muxrate;
        self
    }

    /// True when the configured `muxrate` selects constant bitrate mode.
    pub fn is_cbr(&self) -> bool {
        self.muxrate > 1
    }

    /// Resolves `m2ts_mode` against `output_filename` for `Auto`.
    pub fn m2ts_enabled(&self) -> bool {
        match self.m2ts_mode {
            M2tsMode::On => true,
            M2tsMode::Off => false,
            M2tsMode::Auto => self
                .output_filename
                .as_deref()
                .map(|name| name.ends_with(".m2ts"))
                .unwrap_or(false),
        }
    }
}
