use std::net::{Ipv4Addr, Ipv6Addr};

use nom::IResult;
use tracing::debug;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::{opt_parse_options, Linktype, PcapError, PcapNGOption, IDB_MAGIC};

use super::*;

/// An Interface Description Block (IDB) is the container for information
/// describing an interface on which packet data is captured.
#[derive(Debug)]
pub struct InterfaceDescriptionBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub linktype: Linktype,
    pub reserved: u16,
    pub snaplen: u32,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> InterfaceDescriptionBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.block_type != IDB_MAGIC
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, InterfaceDescriptionBlock<'a>>
    for InterfaceDescriptionBlock<'a>
{
    const HDR_SZ: usize = MIN_IDB_SIZE as usize;
    const MAGIC: u32 = IDB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], InterfaceDescriptionBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, linktype) = En::parse_u16(i)?;
        let (i, reserved) = En::parse_u16(i)?;
        let (i, snaplen) = En::parse_u32(i)?;
        // read options
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = InterfaceDescriptionBlock {
            block_type,
            block_len1,
            linktype: Linktype(linktype as i32),
            reserved,
            snaplen,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse an Interface Packet Block (little-endian)
pub fn parse_interfacedescriptionblock_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError<&[u8]>> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapLE, _>()(i)
}

/// Parse an Interface Packet Block (big-endian)
pub fn parse_interfacedescriptionblock_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError<&[u8]>> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapBE, _>()(i)
}

/// One BPF instruction of a capture filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BpfInstruction {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

/// Capture filter of an interface (`if_filter`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureFilter {
    /// Filter expression, in the syntax of the capture tool
    String(String),
    /// Compiled BPF program
    Bpf(Vec<BpfInstruction>),
}

/// Filter type byte: filter expression
pub const FILTER_TYPE_STRING: u8 = 0;
/// Filter type byte: BPF program
pub const FILTER_TYPE_BPF: u8 = 1;

fn decode_filter(
    value: &[u8],
    ctx: &OptionContext,
) -> Result<Option<CaptureFilter>, PcapError<&'static [u8]>> {
    if value.is_empty() {
        return Err(PcapError::BadFile(
            "if_filter option has length 0, no filter type".to_string(),
        ));
    }
    let (filter_type, body) = (value[0], &value[1..]);
    match filter_type {
        FILTER_TYPE_STRING => Ok(Some(CaptureFilter::String(string_from_bytes(body)))),
        FILTER_TYPE_BPF => {
            if body.len() % 8 != 0 {
                return Err(PcapError::BadFile(format!(
                    "if_filter BPF program has length {}, not a multiple of 8",
                    body.len()
                )));
            }
            let big_endian = ctx.big_endian();
            let insns = body
                .chunks_exact(8)
                .map(|c| {
                    let code = if big_endian {
                        u16::from_be_bytes([c[0], c[1]])
                    } else {
                        u16::from_le_bytes([c[0], c[1]])
                    };
                    let k = ctx.read_u32(&c[4..8]).unwrap_or_default();
                    BpfInstruction {
                        code,
                        jt: c[2],
                        jf: c[3],
                        k,
                    }
                })
                .collect();
            Ok(Some(CaptureFilter::Bpf(insns)))
        }
        t => {
            debug!(filter_type = t, "unknown if_filter type, ignored");
            Ok(None)
        }
    }
}

pub(crate) fn decode_idb_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Result<Option<OptionValue>, PcapError<&'static [u8]>> {
    let v = match code {
        OptionCode::IfName
        | OptionCode::IfDescription
        | OptionCode::IfOs
        | OptionCode::IfHardware => Some(ctx.string_value(value)),
        OptionCode::IfIpv4Addr => {
            if value.len() == 8 {
                let addr = Ipv4Addr::new(value[0], value[1], value[2], value[3]);
                let mask = Ipv4Addr::new(value[4], value[5], value[6], value[7]);
                Some(OptionValue::Ipv4Interface(addr, mask))
            } else {
                debug!(len = value.len(), "if_IPv4addr has a wrong length, ignored");
                None
            }
        }
        OptionCode::IfIpv6Addr => {
            if value.len() == 17 {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&value[..16]);
                Some(OptionValue::Ipv6Interface(Ipv6Addr::from(octets), value[16]))
            } else {
                debug!(len = value.len(), "if_IPv6addr has a wrong length, ignored");
                None
            }
        }
        OptionCode::IfMacAddr | OptionCode::IfEuiAddr => {
            let expected = if code == OptionCode::IfMacAddr { 6 } else { 8 };
            if value.len() == expected {
                Some(OptionValue::Bytes(value.to_vec()))
            } else {
                debug!(code = code.0, len = value.len(), "address has a wrong length, ignored");
                None
            }
        }
        OptionCode::IfSpeed => ctx.u64_value(code, value),
        OptionCode::IfTsresol | OptionCode::IfFcslen => ctx.u8_value(code, value),
        OptionCode::IfTzone => ctx.u32_value(code, value),
        OptionCode::IfTsoffset => ctx.i64_value(code, value),
        OptionCode::IfFilter => decode_filter(value, ctx)?.map(OptionValue::Filter),
        _ => None,
    };
    Ok(v)
}
