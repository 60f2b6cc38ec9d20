//! NIT table builder (spec §4.2): PID 0x0010, table_id 0x40.

use super::descriptors::{self, TransmissionTypeRecord};
use crate::config::MuxConfig;
use crate::error::Result;
use crate::format::ts::section::{build_section, RESERVED_PREFIX_DEFAULT};
use crate::service::ServiceRegistry;
use crate::utils::{Crc32Mpeg2, LengthScope};
use bytes::{BufMut, BytesMut};

/// Frequency-formula choice for the terrestrial-delivery-system
/// descriptor (spec §9 open question 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyFormula {
    /// Reproduces the source's integer-truncating `(473 + 6*(ch-14) +
    /// 1/7) * 7`, where the `1/7` term evaluates to 0 in integer math.
    SourceTruncated,
    /// The standard's apparent intent: `(473 + 6*(ch-14)) * 7 + 1`.
    Intended,
}

/// Computes the carrier frequency field (in units of 1/7 MHz) for
/// `physical_channel`, per the formula named by `formula`.
pub fn terrestrial_frequency(physical_channel: u16, formula: FrequencyFormula) -> u32 {
    let ch = physical_channel as i64 - 14;
    match formula {
        FrequencyFormula::SourceTruncated => ((473 + 6 * ch) * 7) as u32,
        FrequencyFormula::Intended => ((473 + 6 * ch) * 7 + 1) as u32,
    }
}

/// Builds the NIT (actual network) section.
#[allow(clippy::too_many_arguments)]
pub fn build_nit(
    crc: &Crc32Mpeg2,
    registry: &ServiceRegistry,
    cfg: &MuxConfig,
    network_name_str: &str,
    ts_name: &str,
    frequency_formula: FrequencyFormula,
    version: u8,
) -> Result<BytesMut> {
    let mut payload = BytesMut::new();

    let network_desc_scope = LengthScope::open_u16_12(&mut payload, 0xF);
    descriptors::network_name(&mut payload, network_name_str);
    descriptors::system_management(&mut payload);
    network_desc_scope.close(&mut payload);

    let ts_loop_scope = LengthScope::open_u16_12(&mut payload, 0xF);
    payload.put_u16(cfg.transport_stream_id);
    payload.put_u16(cfg.original_network_id);

    let ts_desc_scope = LengthScope::open_u16_12(&mut payload, 0xF);

    let records: Vec<TransmissionTypeRecord> = registry
        .services
        .iter()
        .map(|svc| TransmissionTypeRecord {
            transmission_type_info: if svc.one_seg { 0xAF } else { 0x0F },
            service_ids: vec![svc.sid],
        })
        .collect();
    descriptors::ts_information(&mut payload, cfg.virtual_channel as u8, ts_name, &records);

    // The NIT service-list descriptor always uses the generic digital-TV
    // service type; the 0xC0 one-seg variant belongs to the SDT only.
    let service_list_entries: Vec<(u16, u8)> =
        registry.services.iter().map(|svc| (svc.sid, 0x01)).collect();
    descriptors::service_list(&mut payload, &service_list_entries);

    let one_seg_sids: Vec<u16> = registry
        .services
        .iter()
        .filter(|s| s.one_seg)
        .map(|s| s.sid)
        .collect();
    if !one_seg_sids.is_empty() {
        descriptors::partial_reception(&mut payload, &one_seg_sids);
    }

    let frequency = terrestrial_frequency(cfg.physical_channel, frequency_formula);
    descriptors::terrestrial_delivery_system(
        &mut payload,
        cfg.area_code,
        cfg.guard_interval,
        cfg.transmission_mode,
        frequency,
    );

    ts_desc_scope.close(&mut payload);
    ts_loop_scope.close(&mut payload);

    build_section(
        crc,
        0x40,
        RESERVED_PREFIX_DEFAULT,
        cfg.original_network_id,
        version,
        0,
        0,
        &payload,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intended_formula_differs_from_truncated_by_one() {
        let ch = 20;
        let a = terrestrial_frequency(ch, FrequencyFormula::SourceTruncated);
        let b = terrestrial_frequency(ch, FrequencyFormula::Intended);
        assert_eq!(b, a + 1);
    }
}
