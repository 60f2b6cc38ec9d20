//! Cadence controller (C5): decides when each SI table is due for
//! re-emission, either by packet count or by wall-clock (DTS) period
//! (spec §4.5).

/// One table's emission schedule and progress.
#[derive(Debug, Clone)]
pub struct TableCadence {
    /// Packets seen since the last emission.
    pub packet_count: u32,
    /// Emit every `packet_period` packets; `u32::MAX` disables
    /// packet-count-based emission in favour of `period_90k`.
    pub packet_period: u32,
    /// Last emission timestamp, in 90 kHz ticks.
    pub last_ts: Option<i64>,
    /// Wall-clock period in 90 kHz ticks; `None` means packet-count-only.
    pub period_90k: Option<i64>,
}

impl TableCadence {
    /// Builds a cadence counter with `packet_period` packets between
    /// emissions and no wall-clock period set.
    pub fn with_packet_period(packet_period: u32) -> Self {
        Self {
            packet_count: 0,
            packet_period,
            last_ts: None,
            period_90k: None,
        }
    }

    /// Overrides the cadence to a pure wall-clock period, in seconds
    /// (spec §4.5: "If the user set a finite `*_period` (seconds), the
    /// per-packet period is set to infinity").
    pub fn set_wall_clock_period_seconds(&mut self, seconds: f64) {
        self.packet_period = u32::MAX;
        self.period_90k = Some((seconds * 90_000.0) as i64);
    }

    /// Forces the next `should_emit` call to return true, by setting the
    /// packet count to one short of the period (spec §4.5
    /// `REEMIT_PAT_PMT`).
    pub fn force_next(&mut self) {
        if self.packet_period != u32::MAX {
            self.packet_count = self.packet_period.saturating_sub(1);
        } else {
            self.last_ts = None;
        }
    }

    /// Registers one incoming PES packet. Call this unconditionally once
    /// per `write_packet`, before `should_emit`.
    pub fn tick(&mut self) {
        self.packet_count = self.packet_count.saturating_add(1);
    }

    /// Returns true when this table is due, given the current `dts` (may
    /// be `None` if the stream hasn't established a timebase yet).
    pub fn should_emit(&self, dts: Option<i64>) -> bool {
        if self.packet_period != u32::MAX && self.packet_count >= self.packet_period {
            return true;
        }
        if let Some(period) = self.period_90k {
            match (self.last_ts, dts) {
                (None, Some(_)) => return true,
                (Some(last), Some(now)) => return now.saturating_sub(last) >= period,
                _ => {}
            }
        }
        false
    }

    /// Marks the table as freshly emitted: resets the packet counter and
    /// advances `last_ts` to `max(last_ts, dts)`.
    pub fn mark_emitted(&mut self, dts: Option<i64>) {
        self.packet_count = 0;
        if let Some(dts) = dts {
            self.last_ts = Some(self.last_ts.map_or(dts, |last| last.max(dts)));
        }
    }
}

/// Converts a period in milliseconds at a given CBR `mux_rate` into a
/// packet-count period (spec §4.5): `mux_rate * period_ms / (188*8*1000)`.
pub fn period_ms_to_packets(mux_rate: u64, period_ms: u32) -> u32 {
    let packets = (mux_rate as u128 * period_ms as u128) / (188 * 8 * 1000);
    packets.max(1) as u32
}

/// Default cadence periods (spec §4.5).
pub mod defaults {
    /// PCR period in milliseconds at CBR.
    pub const PCR_PERIOD_MS: u32 = 20;
    /// PAT period in milliseconds at CBR.
    pub const PAT_PERIOD_MS: u32 = 100;
    /// SDT period in milliseconds at CBR.
    pub const SDT_PERIOD_MS: u32 = 500;
    /// NIT period in milliseconds at CBR.
    pub const NIT_PERIOD_MS: u32 = 50;
    /// TOT period in milliseconds at CBR.
    pub const TOT_PERIOD_MS: u32 = 100;
    /// EIT period in milliseconds at CBR.
    pub const EIT_PERIOD_MS: u32 = 500;

    /// VBR fallback period in packets: PAT.
    pub const VBR_PAT_PACKETS: u32 = 40;
    /// VBR fallback period in packets: SDT.
    pub const VBR_SDT_PACKETS: u32 = 200;
    /// VBR fallback period in packets: NIT/TOT/EIT.
    pub const VBR_NIT_TOT_EIT_PACKETS: u32 = 200;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_on_packet_count() {
        let mut c = TableCadence::with_packet_period(3);
        for _ in 0..2 {
            c.tick();
            assert!(!c.should_emit(None));
        }
        c.tick();
        assert!(c.should_emit(None));
        c.mark_emitted(None);
        assert_eq!(c.packet_count, 0);
    }

    #[test]
    fn wall_clock_period_fires_once_interval_elapsed() {
        let mut c = TableCadence::with_packet_period(1_000_000);
        c.set_wall_clock_period_seconds(0.5);
        assert!(c.should_emit(Some(1000))); // last_ts unset -> emits
        c.mark_emitted(Some(1000));
        assert!(!c.should_emit(Some(1000 + 44_000)));
        assert!(c.should_emit(Some(1000 + 45_000)));
    }

    #[test]
    fn force_next_makes_next_tick_emit() {
        let mut c = TableCadence::with_packet_period(100);
        c.force_next();
        c.tick();
        assert!(c.should_emit(None));
    }

    #[test]
    fn period_conversion_matches_spec_example() {
        // mux_rate such that 100ms = exactly some packet count.
        let packets = period_ms_to_packets(18_800_000, 100);
        assert_eq!(packets, 1250);
    }
}
