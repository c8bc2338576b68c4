//! PCAPNG file format
//!
//! See <https://github.com/pcapng/pcapng> for details.
//!
//! There are two ways of reading a PCAPNG file.
//!
//! The prefered method is to create a [`CaptureReader`](struct.CaptureReader.html). It keeps
//! track of sections and interfaces, consumes the blocks that only carry metadata (interfaces,
//! name resolution, statistics, decryption secrets, etc.) and returns packets and custom blocks
//! as owned [`Record`](struct.Record.html) values.
//!
//! The low-level method is to read the blocks using a [`BlockReader`](struct.BlockReader.html),
//! or manually using [`parse_sectionheaderblock`](fn.parse_sectionheaderblock.html),
//! [`parse_block_le`](fn.parse_block_le.html) and/or [`parse_block_be`](fn.parse_block_be.html).
//! These functions are zero-copy and return borrowed blocks.
//!
//! With the `serialize` feature, captures are written using a
//! [`CaptureWriter`](struct.CaptureWriter.html).
//!
//! ## File format and parsing
//!
//! A capture file is organized in blocks. Blocks are organized in sections, each section
//! starting with a Section Header Block (SHB), and followed by blocks (interface description,
//! statistics, packets, etc.).
//! A file is usually composed of one section, but can contain multiple sections. When a SHB is
//! encountered, this means a new section starts (and all information about previous section has to
//! be flushed, like interfaces).
//!
//! ## Endianness
//!
//! The endianness of a block is indicated by the Section Header Block that started the section
//! containing this block. Since a file can contain several sections, a single file can contain
//! both endianness variants.

use crate::linktype::MAX_PACKET_SIZE_USBPCAP;

mod block;
mod capture;
mod custom;
mod decryption_secrets;
mod enhanced_packet;
mod interface;
mod interface_description;
mod interface_statistics;
mod meta_event;
mod name_resolution;
mod option;
mod packet;
mod reader;
mod registry;
mod section;
mod section_header;
mod simple_packet;
mod systemd_journal_export;
mod time;
mod unknown;
#[cfg(feature = "serialize")]
mod writer;

pub use block::*;
pub use capture::*;
pub use custom::*;
pub use decryption_secrets::*;
pub use enhanced_packet::*;
pub use interface::*;
pub use interface_description::*;
pub use interface_statistics::*;
pub use meta_event::*;
pub use name_resolution::*;
pub use option::*;
pub use packet::*;
pub use reader::*;
pub use registry::*;
pub use section::*;
pub use section_header::*;
pub use simple_packet::*;
pub use systemd_journal_export::*;
pub use time::*;
pub use unknown::*;
#[cfg(feature = "serialize")]
pub use writer::*;

/// Section Header Block magic
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block magic
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Packet Block magic (obsolete)
pub const PB_MAGIC: u32 = 0x0000_0002;
/// Simple Packet Block magic
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Name Resolution Block magic
pub const NRB_MAGIC: u32 = 0x0000_0004;
/// Interface Statistic Block magic
pub const ISB_MAGIC: u32 = 0x0000_0005;
/// Enhanced Packet Block magic
pub const EPB_MAGIC: u32 = 0x0000_0006;
/// IRIG Timestamp Block magic (reserved for extensions)
pub const IRIG_TS_MAGIC: u32 = 0x0000_0007;
/// ARINC 429 in AFDX Encapsulation Information Block magic (reserved for extensions)
pub const ARINC_429_MAGIC: u32 = 0x0000_0008;

/// Systemd Journal Export Block magic
pub const SJE_MAGIC: u32 = 0x0000_0009;

/// Decryption Secrets Block magic
pub const DSB_MAGIC: u32 = 0x0000_000A;

/// Sysdig meta-event block: machine information
pub const MEV_MI_MAGIC: u32 = 0x0000_0201;
/// Sysdig meta-event block: process list
pub const MEV_PL_MAGIC: u32 = 0x0000_0202;
/// Sysdig meta-event block: file descriptor list
pub const MEV_FDL_MAGIC: u32 = 0x0000_0208;
/// Sysdig meta-event block: interface list
pub const MEV_IL_MAGIC: u32 = 0x0000_0209;
/// Sysdig meta-event block: user list
pub const MEV_UL_MAGIC: u32 = 0x0000_020A;
/// Sysdig meta-event block: first process list variant
pub const MEV_PL_V2_MAGIC: u32 = 0x0000_0210;
/// Sysdig meta-event block: last process list variant
pub const MEV_PL_V9_MAGIC: u32 = 0x0000_0218;

/// Custom Block magic
pub const CB_MAGIC: u32 = 0x0000_0BAD;

/// Do-not-copy Custom Block magic
pub const DCB_MAGIC: u32 = 0x4000_0BAD;

/// Byte Order magic
pub const BOM_MAGIC: u32 = 0x1A2B_3C4D;

/// Block types with this bit set are reserved for local use
pub const LOCAL_BLOCK_TYPE_MASK: u32 = 0x8000_0000;

/// Minimum size of a block: type, length and trailer
pub const MIN_BLOCK_SIZE: u32 = 12;
/// Minimum size of a Section Header Block
pub const MIN_SHB_SIZE: u32 = 28;
/// Minimum size of an Interface Description Block
pub const MIN_IDB_SIZE: u32 = 20;
/// Minimum size of a Packet Block
pub const MIN_PB_SIZE: u32 = 32;
/// Minimum size of a Simple Packet Block
pub const MIN_SPB_SIZE: u32 = 16;
/// Minimum size of a Name Resolution Block
pub const MIN_NRB_SIZE: u32 = 16;
/// Minimum size of an Interface Statistics Block
pub const MIN_ISB_SIZE: u32 = 24;
/// Minimum size of an Enhanced Packet Block
pub const MIN_EPB_SIZE: u32 = 32;
/// Minimum size of a Systemd Journal Export Block
pub const MIN_SJE_SIZE: u32 = 12;
/// Minimum size of a Decryption Secrets Block
pub const MIN_DSB_SIZE: u32 = 20;
/// Minimum size of a Custom Block
pub const MIN_CB_SIZE: u32 = 16;
/// Minimum size of a Netflix Custom Block
pub const MIN_NFLX_CB_SIZE: u32 = 20;

/// Hard upper limit for the size of any block
///
/// Large enough for an Enhanced Packet Block holding the largest packet (USBPcap) plus
/// generous room for options.
pub const MAX_BLOCK_SIZE: u32 = MIN_EPB_SIZE + MAX_PACKET_SIZE_USBPCAP + 131_072;

/// Default maximum size of a Name Resolution Block when writing
pub const NRB_MAX_SIZE: u32 = 1024 * 1024;

/// Upper bound for decryption secrets and meta-event payloads
pub const MAX_SECRETS_SIZE: u32 = 1024 * 1024 * 1024;

/// Returns true if `block_type` is a sysdig meta-event block type
pub fn is_meta_event_block_type(block_type: u32) -> bool {
    matches!(
        block_type,
        MEV_MI_MAGIC | MEV_PL_MAGIC | MEV_FDL_MAGIC | MEV_IL_MAGIC | MEV_UL_MAGIC
    ) || (MEV_PL_V2_MAGIC..=MEV_PL_V9_MAGIC).contains(&block_type)
}
