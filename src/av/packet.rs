use bytes::Bytes;

/// Out-of-band metadata attached to an [`InputPacket`], mirroring the
/// side-data channel the facade's `write_packet` accepts (spec §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideData {
    /// Caller-supplied PES `stream_id` override (`MPEGTS_STREAM_ID`).
    MpegtsStreamId(u8),
    /// Skip-samples side-channel, used to trim Opus padding at the edges.
    SkipSamples {
        /// Samples to trim from the start of the packet, at the codec's rate.
        start: u32,
        /// Samples to trim from the end of the packet, at the codec's rate.
        end: u32,
    },
    /// Out-of-band H.264 SPS/PPS (Annex-B framed), injected into a keyframe
    /// access unit that doesn't carry its own SPS (spec §4.6).
    Extradata(Bytes),
}

/// One compressed-frame unit handed to the mux by the caller.
///
/// `pts`/`dts` are in the stream's own timebase as supplied at `init`
/// (rescaled internally to 90 kHz, matching the teacher's
/// `avpriv_set_pts_info`-equivalent rescaling in `service::WriteStream`).
#[derive(Debug, Clone)]
pub struct InputPacket {
    /// Compressed payload bytes for this access unit.
    pub data: Bytes,
    /// Presentation timestamp in the stream's configured timebase.
    pub pts: Option<i64>,
    /// Decode timestamp in the stream's configured timebase.
    pub dts: Option<i64>,
    /// Index into the streams passed to `TsMux::init`.
    pub stream_index: usize,
    /// True when this access unit is a random-access point (keyframe).
    pub is_key: bool,
    /// Side-channel metadata associated with this packet.
    pub side_data: Vec<SideData>,
}

impl InputPacket {
    /// Creates a packet with no timestamps, at stream index 0, with no side data.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pts: None,
            dts: None,
            stream_index: 0,
            is_key: false,
            side_data: Vec::new(),
        }
    }

    /// Sets the presentation timestamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Sets the decode timestamp.
    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    /// Sets the owning stream index.
    pub fn with_stream_index(mut self, index: usize) -> Self {
        self.stream_index = index;
        self
    }

    /// Sets the random-access (keyframe) flag.
    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    /// Appends a piece of side-channel metadata.
    pub fn with_side_data(mut self, side_data: SideData) -> Self {
        self.side_data.push(side_data);
        self
    }

    /// Returns the effective decode timestamp, falling back to the
    /// presentation timestamp when no DTS was supplied.
    pub fn effective_dts(&self) -> Option<i64> {
        self.dts.or(self.pts)
    }
}
