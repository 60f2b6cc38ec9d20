//! Table builders (C2): PAT, PMT, SDT, NIT, TOT, EIT, and the descriptor
//! library they share (spec §4.2).

/// Descriptor writers shared by every table below.
pub mod descriptors;
/// EIT (present/following, actual TS).
pub mod eit;
/// NIT (actual network), with ISDB-Tb terrestrial/partial-reception
/// descriptors.
pub mod nit;
/// PAT.
pub mod pat;
/// PMT.
pub mod pmt;
/// SDT (actual TS).
pub mod sdt;
/// TOT.
pub mod tot;

pub use eit::{build_eit, EitEvent};
pub use nit::{build_nit, FrequencyFormula};
pub use pat::build_pat;
pub use pmt::build_pmt;
pub use sdt::build_sdt;
pub use tot::build_tot;
