use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::traits::PcapNGPacketBlock;
use crate::{PcapError, SPB_MAGIC};

use super::*;

/// The Simple Packet Block (SPB) is a lightweight container for storing
/// the packets coming from the network.
///
/// This struct is a thin abstraction layer, and stores the raw block data.
/// For ex the `data` field is stored with the padding.
/// It implements the `PcapNGPacketBlock` trait, which provides helper functions.
///
/// The captured length is not stored in the block: it is the smallest of the original length
/// and the snapshot length of interface 0 (see [`SimplePacketBlock::caplen`]).
#[derive(Debug)]
pub struct SimplePacketBlock<'a> {
    /// Block type (little endian)
    pub block_type: u32,
    pub block_len1: u32,
    /// Original packet length
    pub origlen: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a> SimplePacketBlock<'a> {
    /// Captured length, given the snapshot length of the interface (0 means no limit)
    #[inline]
    pub fn caplen(&self, snaplen: u32) -> u32 {
        if snaplen != 0 && snaplen < self.origlen {
            snaplen
        } else {
            self.origlen
        }
    }
}

impl<'a> PcapNGPacketBlock for SimplePacketBlock<'a> {
    fn big_endian(&self) -> bool {
        self.block_type != SPB_MAGIC
    }
    fn truncated(&self) -> bool {
        self.origlen as usize > self.data.len()
    }
    fn orig_len(&self) -> u32 {
        self.origlen
    }
    fn raw_packet_data(&self) -> &[u8] {
        self.data
    }
    fn packet_data(&self) -> &[u8] {
        let caplen = self.origlen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, SimplePacketBlock<'a>>
    for SimplePacketBlock<'a>
{
    const HDR_SZ: usize = MIN_SPB_SIZE as usize;
    const MAGIC: u32 = SPB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SimplePacketBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (data, origlen) = En::parse_u32(i)?;
        // no options: the rest of the block is the packet, with padding
        let block = SimplePacketBlock {
            block_type,
            block_len1,
            origlen,
            data,
            block_len2,
        };
        Ok((&data[data.len()..], block))
    }
}

/// Parse a Simple Packet Block (little-endian)
///
/// *Note: this function does not remove padding in the `data` field.
/// Use `packet_data` to get field without padding.*
pub fn parse_simplepacketblock_le(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<SimplePacketBlock, PcapLE, _>()(i)
}

/// Parse a Simple Packet Block (big-endian)
///
/// *Note: this function does not remove padding*
pub fn parse_simplepacketblock_be(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<SimplePacketBlock, PcapBE, _>()(i)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn spb_snaplen() {
        // SPB, origlen 6, 4 bytes of data stored
        const SPB: &[u8] = &hex!("03 00 00 00 14 00 00 00 06 00 00 00 01 02 03 04 14 00 00 00");
        let (rem, spb) = parse_simplepacketblock_le(SPB).expect("could not parse SPB");
        assert!(rem.is_empty());
        assert!(spb.truncated());
        assert_eq!(spb.caplen(0), 6);
        assert_eq!(spb.caplen(4), 4);
        assert_eq!(spb.caplen(100), 6);
        assert_eq!(spb.packet_data(), &[1, 2, 3, 4]);
    }
}
