use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::{opt_parse_options, PcapError, PcapNGOption, ISB_MAGIC};

use super::*;

#[derive(Debug)]
pub struct InterfaceStatisticsBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> InterfaceStatisticsBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.block_type != ISB_MAGIC
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, InterfaceStatisticsBlock<'a>>
    for InterfaceStatisticsBlock<'a>
{
    const HDR_SZ: usize = MIN_ISB_SIZE as usize;
    const MAGIC: u32 = ISB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], InterfaceStatisticsBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, if_id) = En::parse_u32(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        // read options
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = InterfaceStatisticsBlock {
            block_type,
            block_len1,
            if_id,
            ts_high,
            ts_low,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse an InterfaceStatistics Block (little-endian)
#[inline]
pub fn parse_interfacestatisticsblock_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceStatisticsBlock, PcapError<&[u8]>> {
    ng_block_parser::<InterfaceStatisticsBlock, PcapLE, _>()(i)
}

/// Parse an InterfaceStatistics Block (big-endian)
#[inline]
pub fn parse_interfacestatisticsblock_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceStatisticsBlock, PcapError<&[u8]>> {
    ng_block_parser::<InterfaceStatisticsBlock, PcapBE, _>()(i)
}

/// Statistics of an interface, at a given time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceStatistics {
    pub interface_id: u32,
    /// Timestamp, in units of the interface time resolution
    pub timestamp: u64,
    pub options: Options,
}

impl InterfaceStatistics {
    pub fn from_block(
        isb: &InterfaceStatisticsBlock,
        registry: &Registry,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let ctx = OptionContext::new(BlockKind::InterfaceStatistics, isb.big_endian(), registry);
        Ok(InterfaceStatistics {
            interface_id: isb.if_id,
            timestamp: (u64::from(isb.ts_high) << 32) | u64::from(isb.ts_low),
            options: decode_options(&isb.options, &ctx)?,
        })
    }

    /// Number of packets received by the interface, if known
    pub fn received(&self) -> Option<u64> {
        self.options.get_u64(OptionCode::IsbIfRecv)
    }

    /// Number of packets dropped by the interface, if known
    pub fn dropped(&self) -> Option<u64> {
        self.options.get_u64(OptionCode::IsbIfDrop)
    }
}

pub(crate) fn decode_isb_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Option<OptionValue> {
    match code {
        OptionCode::IsbStartTime | OptionCode::IsbEndTime => ctx.timestamp_value(code, value),
        OptionCode::IsbIfRecv
        | OptionCode::IsbIfDrop
        | OptionCode::IsbFilterAccept
        | OptionCode::IsbOsDrop
        | OptionCode::IsbUsrDeliv => ctx.u64_value(code, value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn isb_big_endian() {
        // ISB, if_id 0, isb_starttime 0x1_00000002, isb_ifrecv 10, isb_ifdrop with 4 bytes (ignored)
        const ISB: &[u8] = &hex!(
            "
00 00 00 05 00 00 00 3C 00 00 00 00 00 00 00 01
00 00 00 05 00 02 00 08 00 00 00 01 00 00 00 02
00 04 00 08 00 00 00 00 00 00 00 0A 00 05 00 04
00 00 00 01 00 00 00 00 00 00 00 3C"
        );
        let (rem, isb) = parse_interfacestatisticsblock_be(ISB).expect("could not parse ISB");
        assert!(rem.is_empty());
        assert!(isb.big_endian());
        let registry = Registry::new();
        let stats = InterfaceStatistics::from_block(&isb, &registry).expect("decode");
        assert_eq!(stats.interface_id, 0);
        assert_eq!(stats.timestamp, 0x1_0000_0005);
        assert_eq!(stats.options.get_timestamp(OptionCode::IsbStartTime), Some(0x1_0000_0002));
        assert_eq!(stats.received(), Some(10));
        assert_eq!(stats.dropped(), None);
    }
}
