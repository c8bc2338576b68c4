//! # PCAPNG reader and writer
//!
//! This crate reads and writes capture files in the pcap-ng format.
//!
//! It supports files with multiple sections, interfaces and endianness, the standard blocks
//! (section header, interface description, enhanced/simple/legacy packets, name resolution,
//! interface statistics, decryption secrets), systemd journal export blocks, sysdig meta-event
//! blocks and custom blocks. Block types and options not known by the crate can be handled by
//! callbacks, registered in a [`Registry`](pcapng/struct.Registry.html).
//!
//! Only safe code is used, and block parsers do not copy data (zero-copy).
//!
//! # Example: reading records
//!
//! The [`CaptureReader`](pcapng/struct.CaptureReader.html) keeps track of sections and
//! interfaces, and returns packets with their link type and timestamp.
//!
//! ```rust
//! use pcapng_codec::*;
//!
//! # let data: &[u8] = &[
//! #     0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00, 0x00, 0x00, 0x4d, 0x3c, 0x2b, 0x1a,
//! #     0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
//! #     0x1c, 0x00, 0x00, 0x00,
//! # ];
//! let registry = Registry::new();
//! let mut reader = CaptureReader::open(data, &registry).expect("CaptureReader");
//! let mut num_packets = 0;
//! loop {
//!     match reader.read_next() {
//!         Ok(record) => {
//!             if let RecordData::Packet(packet) = record.data {
//!                 println!("{:?}: {} bytes", packet.timestamp, packet.data.len());
//!                 num_packets += 1;
//!             }
//!         }
//!         Err(PcapError::Eof) => break,
//!         Err(e) => panic!("error while reading: {:?}", e),
//!     }
//! }
//! println!("num_packets: {}", num_packets);
//! ```
//!
//! # Example: streaming block parser
//!
//! The [`BlockReader`](pcapng/struct.BlockReader.html) returns the raw blocks, borrowed from its
//! internal buffer.
//!
//! ```rust
//! use pcapng_codec::*;
//! use pcapng_codec::traits::PcapReaderIterator;
//!
//! # let data: &[u8] = &[
//! #     0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00, 0x00, 0x00, 0x4d, 0x3c, 0x2b, 0x1a,
//! #     0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
//! #     0x1c, 0x00, 0x00, 0x00,
//! # ];
//! let mut num_blocks = 0;
//! let mut reader = BlockReader::new(65536, data).expect("BlockReader");
//! loop {
//!     match reader.next() {
//!         Ok((offset, _block)) => {
//!             num_blocks += 1;
//!             reader.consume(offset);
//!         }
//!         Err(PcapError::Eof) => break,
//!         Err(PcapError::Incomplete(_)) => {
//!             reader.refill().unwrap();
//!         }
//!         Err(e) => panic!("error while reading: {:?}", e),
//!     }
//! }
//! assert_eq!(num_blocks, 1);
//! ```
//!
//! # Writing
//!
//! With the `serialize` feature (enabled by default), blocks can be serialized using the
//! [`ToVec`](trait.ToVec.html) trait, and captures written with a
//! [`CaptureWriter`](pcapng/struct.CaptureWriter.html).

mod endianness;
mod error;
mod linktype;
pub use endianness::ByteOrder;
pub use error::*;
pub use linktype::*;

pub mod pcapng;
pub use pcapng::*;

pub mod traits;

#[cfg(feature = "serialize")]
mod serialize;
#[cfg(feature = "serialize")]
pub use serialize::*;
