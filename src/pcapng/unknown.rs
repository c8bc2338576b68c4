use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// Unknown block (magic not recognized, or not yet implemented)
///
/// Unknown blocks are decoded by the handler registered for their type, if any.
#[derive(Debug)]
pub struct UnknownBlock<'a> {
    /// Block type, in native order
    pub block_type: u32,
    pub block_len1: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
    pub big_endian: bool,
}

impl<'a> UnknownBlock<'a> {
    /// Decode the block with the registered handler for its type
    ///
    /// Returns `None` if there is no handler: the block is skipped.
    pub fn decode(
        &self,
        registry: &Registry,
    ) -> Option<Result<ExtensionRecord, PcapError<&'static [u8]>>> {
        registry
            .block_handler(self.block_type)
            .map(|handler| (handler.read)(self.block_type, self.data, self.big_endian))
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, UnknownBlock<'a>> for UnknownBlock<'a> {
    const HDR_SZ: usize = MIN_BLOCK_SIZE as usize;
    const MAGIC: u32 = 0;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], UnknownBlock<'a>, PcapError<&'a [u8]>> {
        let block = UnknownBlock {
            block_type: En::native_u32(block_type),
            block_len1,
            data: i,
            block_len2,
            big_endian: En::BIG_ENDIAN,
        };
        Ok((&i[i.len()..], block))
    }
}

/// Parse an unknown block (little-endian)
pub fn parse_unknownblock_le(i: &[u8]) -> IResult<&[u8], UnknownBlock, PcapError<&[u8]>> {
    ng_block_parser::<UnknownBlock, PcapLE, _>()(i)
}

/// Parse an unknown block (big-endian)
pub fn parse_unknownblock_be(i: &[u8]) -> IResult<&[u8], UnknownBlock, PcapError<&[u8]>> {
    ng_block_parser::<UnknownBlock, PcapBE, _>()(i)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn read_raw(
        block_type: u32,
        data: &[u8],
        big_endian: bool,
    ) -> Result<ExtensionRecord, PcapError<&'static [u8]>> {
        assert!(big_endian);
        Ok(ExtensionRecord {
            block_type,
            data: data.to_vec(),
        })
    }

    #[test]
    fn unknown_block_with_handler() {
        const UB: &[u8] = &hex!("80 00 00 01 00 00 00 10 de ad be ef 00 00 00 10");
        let (rem, ub) = parse_unknownblock_be(UB).expect("could not parse block");
        assert!(rem.is_empty());
        assert_eq!(ub.block_type, 0x8000_0001);
        let mut registry = Registry::new();
        assert!(ub.decode(&registry).is_none());
        registry
            .register_block(
                0x8000_0001,
                BlockHandler {
                    read: read_raw,
                    write: None,
                },
            )
            .expect("register");
        let record = ub.decode(&registry).expect("handler").expect("decode");
        assert_eq!(record.data, hex!("de ad be ef"));
    }
}
