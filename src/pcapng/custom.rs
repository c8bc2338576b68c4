use nom::{Err, IResult};

use crate::endianness::{ByteOrder, PcapBE, PcapEndianness, PcapLE};
use crate::{opt_parse_options, PcapError, PcapNGOption, CB_MAGIC, DCB_MAGIC};

use super::*;

/// Netflix custom block sub-type: event, followed by options
pub const NFLX_BLOCK_TYPE_EVENT: u32 = 1;
/// Netflix custom block sub-type: skipped events
pub const NFLX_BLOCK_TYPE_SKIP: u32 = 2;

#[derive(Debug)]
pub struct CustomBlock<'a> {
    /// Block type, in native order (`CB_MAGIC` or `DCB_MAGIC`)
    pub block_type: u32,
    pub block_len1: u32,
    // Private Enterprise Number (PEN)
    pub pen: u32,
    /// Custom data and options, with padding
    pub data: &'a [u8],
    pub block_len2: u32,
    pub big_endian: bool,
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, CustomBlock<'a>> for CustomBlock<'a> {
    const HDR_SZ: usize = MIN_CB_SIZE as usize;
    const MAGIC: u32 = CB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], CustomBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, pen) = En::parse_u32(i)?;
        if pen == PEN_NFLX && i.len() + 16 < MIN_NFLX_CB_SIZE as usize {
            return Err(Err::Error(PcapError::BadFile(format!(
                "Netflix custom block has length {}, smaller than the minimum {}",
                i.len() + 16,
                MIN_NFLX_CB_SIZE
            ))));
        }
        // there is no way to differentiate custom data and options,
        // since length of data is not provided
        let data = i;
        let block = CustomBlock {
            block_type: En::native_u32(block_type),
            block_len1,
            pen,
            data,
            block_len2,
            big_endian: En::BIG_ENDIAN,
        };
        Ok((&i[i.len()..], block))
    }
}

struct DCBParser;
impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, CustomBlock<'a>> for DCBParser {
    const HDR_SZ: usize = MIN_CB_SIZE as usize;
    const MAGIC: u32 = DCB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], CustomBlock<'a>, PcapError<&'a [u8]>> {
        <CustomBlock as PcapNGBlockParser<En, CustomBlock<'a>>>::inner_parse(
            block_type, block_len1, i, block_len2,
        )
    }
}

impl<'a> CustomBlock<'a> {
    pub fn do_not_copy(&self) -> bool {
        self.block_type == DCB_MAGIC
    }
}

/// Parse a Custom Block (little-endian)
#[inline]
pub fn parse_customblock_le(i: &[u8]) -> IResult<&[u8], CustomBlock, PcapError<&[u8]>> {
    ng_block_parser::<CustomBlock, PcapLE, _>()(i)
}

/// Parse a Custom Block (big-endian)
#[inline]
pub fn parse_customblock_be(i: &[u8]) -> IResult<&[u8], CustomBlock, PcapError<&[u8]>> {
    ng_block_parser::<CustomBlock, PcapBE, _>()(i)
}

/// Parse a Do-not-copy Custom Block (little-endian)
#[inline]
pub fn parse_dcb_le(i: &[u8]) -> IResult<&[u8], CustomBlock, PcapError<&[u8]>> {
    ng_block_parser::<DCBParser, PcapLE, _>()(i)
}

/// Parse a Do-not-copy Custom Block (big-endian)
#[inline]
pub fn parse_dcb_be(i: &[u8]) -> IResult<&[u8], CustomBlock, PcapError<&[u8]>> {
    ng_block_parser::<DCBParser, PcapBE, _>()(i)
}

/// Content of a custom block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomPayload {
    /// Vendor data (and options, if any), as stored in the block
    Generic(Vec<u8>),
    /// Netflix event, with its options
    NflxEvent { options: Options },
    /// Netflix skipped events
    NflxSkip { skipped: u32, options: Options },
}

/// A custom block, as returned by the capture reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomRecord {
    pub pen: u32,
    /// False for a do-not-copy custom block
    pub copy_allowed: bool,
    pub payload: CustomPayload,
}

fn parse_nflx_options<'a>(
    i: &'a [u8],
    registry: &Registry,
) -> Result<Options, PcapError<&'static [u8]>> {
    let raw = match opt_parse_options::<PcapLE>(i) {
        Ok((_, raw)) => raw,
        Err(Err::Error(e)) | Err(Err::Failure(e)) => return Err(e.to_owned_vec()),
        Err(Err::Incomplete(_)) => {
            return Err(PcapError::BadFile(
                "Netflix custom block options are truncated".to_string(),
            ))
        }
    };
    let ctx =
        OptionContext::new(BlockKind::CustomEvent, false, registry).with_order(ByteOrder::Little);
    decode_options(&raw, &ctx)
}

impl CustomRecord {
    /// Decode a custom block. Netflix blocks are always little-endian.
    pub fn from_block(
        cb: &CustomBlock,
        registry: &Registry,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let payload = if cb.pen == PEN_NFLX {
            let nflx_type = ByteOrder::Little
                .read_u32(false, cb.data.get(..4).unwrap_or_default())
                .ok_or_else(|| PcapError::bad_file("Netflix custom block without a type"))?;
            match nflx_type {
                NFLX_BLOCK_TYPE_EVENT => CustomPayload::NflxEvent {
                    options: parse_nflx_options(&cb.data[4..], registry)?,
                },
                NFLX_BLOCK_TYPE_SKIP => {
                    let skipped = ByteOrder::Little
                        .read_u32(false, cb.data.get(4..8).unwrap_or_default())
                        .ok_or_else(|| {
                            PcapError::bad_file("Netflix skip block is too short for its count")
                        })?;
                    CustomPayload::NflxSkip {
                        skipped,
                        options: parse_nflx_options(&cb.data[8..], registry)?,
                    }
                }
                t => {
                    return Err(PcapError::BadFile(format!(
                        "Netflix custom block has unknown type {}",
                        t
                    )))
                }
            }
        } else {
            CustomPayload::Generic(cb.data.to_vec())
        };
        Ok(CustomRecord {
            pen: cb.pen,
            copy_allowed: !cb.do_not_copy(),
            payload,
        })
    }
}
