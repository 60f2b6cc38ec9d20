//! AAC bitstream adapter (spec §4.6): ADTS sync detection, header
//! stripping, and LATM/LOAS fallback framing for `AudioCodec::Aac {
//! latm: true }` streams.

/// ADTS parsing and LOAS/LATM frame construction.
pub mod parser;
/// ADTS header and profile type definitions.
pub mod types;

pub use parser::{build_loas_frame, is_adts_sync, parse_adts_header, strip_adts_header};
pub use types::{AdtsHeader, ProfileType};
