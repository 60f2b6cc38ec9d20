//! # MPEG Transport Stream wire format
//!
//! The pieces `crate::mux::TsMux` composes into a byte stream: the packet
//! header/adaptation-field/PCR primitives ([`types`]), the CRC-protected
//! section framing shared by every PSI/SI table ([`section`]), the PES
//! header builder ([`pes`]), and the table builders themselves
//! ([`tables`]).

/// Packetized Elementary Stream header construction.
pub mod pes;
/// CRC-protected section framing and TS-packet chunking.
pub mod section;
/// PAT/PMT/SDT/NIT/TOT/EIT table builders and their descriptor library.
pub mod tables;
/// TS packet header, adaptation field, and PCR encoding.
pub mod types;
