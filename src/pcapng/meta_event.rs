use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// Sysdig meta-event block (machine information, process or user lists, etc.)
///
/// The payload is opaque. It is kept by the capture reader so it can be written back.
#[derive(Debug)]
pub struct MetaEventBlock<'a> {
    /// Block type, in native order
    pub block_type: u32,
    pub block_len1: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, MetaEventBlock<'a>> for MetaEventBlock<'a> {
    const HDR_SZ: usize = MIN_BLOCK_SIZE as usize;
    // several block types
    const MAGIC: u32 = 0;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], MetaEventBlock<'a>, PcapError<&'a [u8]>> {
        let block_type = En::native_u32(block_type);
        if !is_meta_event_block_type(block_type) {
            return Err(Err::Error(PcapError::BadFile(format!(
                "block type 0x{:08x} is not a meta-event",
                block_type
            ))));
        }
        if i.len() > MAX_SECRETS_SIZE as usize {
            return Err(Err::Error(PcapError::BadFile(format!(
                "meta-event of {} bytes is larger than the maximum {}",
                i.len(),
                MAX_SECRETS_SIZE
            ))));
        }
        let block = MetaEventBlock {
            block_type,
            block_len1,
            data: i,
            block_len2,
        };
        Ok((&i[i.len()..], block))
    }
}

/// Parse a meta-event block (little-endian)
pub fn parse_metaeventblock_le(i: &[u8]) -> IResult<&[u8], MetaEventBlock, PcapError<&[u8]>> {
    ng_block_parser::<MetaEventBlock, PcapLE, _>()(i)
}

/// Parse a meta-event block (big-endian)
pub fn parse_metaeventblock_be(i: &[u8]) -> IResult<&[u8], MetaEventBlock, PcapError<&[u8]>> {
    ng_block_parser::<MetaEventBlock, PcapBE, _>()(i)
}

/// Meta-event, as kept by the capture reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaEvent {
    pub block_type: u32,
    pub data: Vec<u8>,
}

impl<'a> From<&MetaEventBlock<'a>> for MetaEvent {
    fn from(mev: &MetaEventBlock<'a>) -> Self {
        MetaEvent {
            block_type: mev.block_type,
            data: mev.data.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn meta_event_big_endian() {
        const MEV: &[u8] = &hex!("00 00 02 12 00 00 00 14 01 02 03 04 05 06 07 08 00 00 00 14");
        let (rem, mev) = parse_metaeventblock_be(MEV).expect("could not parse meta-event");
        assert!(rem.is_empty());
        let mev = MetaEvent::from(&mev);
        assert_eq!(mev.block_type, 0x212);
        assert_eq!(mev.data, hex!("01 02 03 04 05 06 07 08"));
    }
}
