//! H.265/HEVC bitstream adapter (spec §4.6): validates Annex-B framing and
//! flags random-access points. Unlike H.264, no AUD is inserted.

/// NAL unit splitting and random-access detection.
pub mod parser;
/// NAL unit and type definitions.
pub mod types;

pub use parser::{is_random_access, split_annex_b};
pub use types::{NALUnit, NALUnitType};
