use nom::bytes::streaming::take;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::traits::PcapNGPacketBlock;
use crate::{opt_parse_options, PcapError, PcapNGOption, PB_MAGIC};

use super::*;

/// Value of `drops_count` when the number of dropped packets is unknown
pub const PB_DROPS_UNKNOWN: u16 = 0xffff;

/// The Packet Block (PB) is obsolete, and replaced by the Enhanced Packet Block.
///
/// It is still read for compatibility, but never written.
#[derive(Debug)]
pub struct PacketBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u16,
    /// Packets dropped since the previous packet, or `0xffff` if unknown
    pub drops_count: u16,
    pub ts_high: u32,
    pub ts_low: u32,
    /// Captured packet length
    pub caplen: u32,
    /// Original packet length
    pub origlen: u32,
    /// Raw data from packet (with padding)
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> PacketBlock<'a> {
    #[inline]
    pub fn ticks(&self) -> u64 {
        (u64::from(self.ts_high) << 32) | u64::from(self.ts_low)
    }

    /// Number of dropped packets, if known
    #[inline]
    pub fn drops(&self) -> Option<u64> {
        if self.drops_count == PB_DROPS_UNKNOWN {
            None
        } else {
            Some(u64::from(self.drops_count))
        }
    }
}

impl<'a> PcapNGPacketBlock for PacketBlock<'a> {
    fn big_endian(&self) -> bool {
        self.block_type != PB_MAGIC
    }
    fn truncated(&self) -> bool {
        self.origlen != self.caplen
    }
    fn orig_len(&self) -> u32 {
        self.origlen
    }
    fn raw_packet_data(&self) -> &[u8] {
        self.data
    }
    fn packet_data(&self) -> &[u8] {
        let caplen = self.caplen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, PacketBlock<'a>> for PacketBlock<'a> {
    const HDR_SZ: usize = MIN_PB_SIZE as usize;
    const MAGIC: u32 = PB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], PacketBlock<'a>, PcapError<&'a [u8]>> {
        let body_len = i.len();
        let (i, if_id) = En::parse_u16(i)?;
        let (i, drops_count) = En::parse_u16(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
        let padded_length = check_captured_length(PB_MAGIC, body_len, 20, caplen)?;
        let (i, data) = take(padded_length)(i)?;
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = PacketBlock {
            block_type,
            block_len1,
            if_id,
            drops_count,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Packet Block (little-endian)
pub fn parse_packetblock_le(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<PacketBlock, PcapLE, _>()(i)
}

/// Parse a Packet Block (big-endian)
pub fn parse_packetblock_be(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<PacketBlock, PcapBE, _>()(i)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn pb_big_endian() {
        // PB, if_id 2, 7 drops, ts 0x1_00000002, caplen 3, origlen 3
        const PB: &[u8] = &hex!(
            "
00 00 00 02 00 00 00 24 00 02 00 07 00 00 00 01
00 00 00 02 00 00 00 03 00 00 00 03 aa bb cc 00
00 00 00 24"
        );
        let (rem, pb) = parse_packetblock_be(PB).expect("could not parse PB");
        assert!(rem.is_empty());
        assert!(pb.big_endian());
        assert_eq!(pb.if_id, 2);
        assert_eq!(pb.drops(), Some(7));
        assert_eq!(pb.ticks(), 0x1_0000_0002);
        assert_eq!(pb.packet_data(), &[0xaa, 0xbb, 0xcc]);
        assert!(pb.options.is_empty());
    }

    #[test]
    fn pb_unknown_drops() {
        const PB: &[u8] = &hex!(
            "
02 00 00 00 20 00 00 00 00 00 FF FF 00 00 00 00
00 00 00 00 00 00 00 00 00 00 00 00 20 00 00 00"
        );
        let (_, pb) = parse_packetblock_le(PB).expect("could not parse PB");
        assert_eq!(pb.drops(), None);
        assert!(pb.packet_data().is_empty());
    }
}
