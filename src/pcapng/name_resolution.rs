use std::net::{Ipv4Addr, Ipv6Addr};

use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};
use tracing::debug;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::{opt_parse_options, PcapError, PcapNGOption, NRB_MAGIC};

use super::*;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct NameRecordType(pub u16);

newtype_enum! {
    impl debug NameRecordType {
        End = 0,
        Ipv4 = 1,
        Ipv6 = 2
    }
}

/// A raw name resolution record
///
/// `record_value` does not include the padding.
#[derive(Debug)]
pub struct NameRecord<'a> {
    pub record_type: NameRecordType,
    pub record_value: &'a [u8],
}

#[derive(Debug)]
pub struct NameResolutionBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Records, without the end marker
    pub nr: Vec<NameRecord<'a>>,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> NameResolutionBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.block_type != NRB_MAGIC
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, NameResolutionBlock<'a>>
    for NameResolutionBlock<'a>
{
    const HDR_SZ: usize = MIN_NRB_SIZE as usize;
    const MAGIC: u32 = NRB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], NameResolutionBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read records
        let (i, nr) = parse_name_record_list::<En>(i)?;
        // read options
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = NameResolutionBlock {
            block_type,
            block_len1,
            nr,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

fn parse_name_record_list<'a, En: PcapEndianness>(
    i: &'a [u8],
) -> IResult<&'a [u8], Vec<NameRecord<'a>>, PcapError<&'a [u8]>> {
    let mut records = Vec::new();
    let mut rem = i;
    loop {
        if rem.len() < 4 {
            return Err(Err::Error(PcapError::BadFile(format!(
                "NRB: {} bytes left, not enough for a record header",
                rem.len()
            ))));
        }
        let (r, record_type) = En::parse_u16(rem)?;
        let (r, record_len) = En::parse_u16(r)?;
        if record_type == NameRecordType::End.0 {
            return Ok((r, records));
        }
        let padded_len = align32!(record_len as usize);
        if padded_len > r.len() {
            return Err(Err::Error(PcapError::BadFile(format!(
                "NRB: record of type {} has length {}, but only {} bytes are left",
                record_type,
                record_len,
                r.len()
            ))));
        }
        records.push(NameRecord {
            record_type: NameRecordType(record_type),
            record_value: &r[..record_len as usize],
        });
        rem = &r[padded_len..];
    }
}

/// Parse a Name Resolution Block (little-endian)
#[inline]
pub fn parse_nameresolutionblock_le(
    i: &[u8],
) -> IResult<&[u8], NameResolutionBlock, PcapError<&[u8]>> {
    ng_block_parser::<NameResolutionBlock, PcapLE, _>()(i)
}

/// Parse a Name Resolution Block (big-endian)
#[inline]
pub fn parse_nameresolutionblock_be(
    i: &[u8],
) -> IResult<&[u8], NameResolutionBlock, PcapError<&[u8]>> {
    ng_block_parser::<NameResolutionBlock, PcapBE, _>()(i)
}

/// An address and the names it resolves to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostName<A> {
    pub address: A,
    pub names: Vec<String>,
}

/// Name resolution entries of one Name Resolution Block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameResolution {
    pub ipv4: Vec<HostName<Ipv4Addr>>,
    pub ipv6: Vec<HostName<Ipv6Addr>>,
    pub options: Options,
}

impl NameResolution {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// Decode the records and options of a block
    pub fn from_block(
        nrb: &NameResolutionBlock,
        registry: &Registry,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let mut res = NameResolution::default();
        for record in &nrb.nr {
            match record.record_type {
                NameRecordType::Ipv4 => {
                    let (addr, names) = split_record(record.record_value, 4, "IPv4")?;
                    res.ipv4.push(HostName {
                        address: Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]),
                        names,
                    });
                }
                NameRecordType::Ipv6 => {
                    let (addr, names) = split_record(record.record_value, 16, "IPv6")?;
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(addr);
                    res.ipv6.push(HostName {
                        address: Ipv6Addr::from(octets),
                        names,
                    });
                }
                t => {
                    debug!(record_type = t.0, "NRB: unknown record type, skipped");
                }
            }
        }
        let ctx = OptionContext::new(BlockKind::NameResolution, nrb.big_endian(), registry);
        res.options = decode_options(&nrb.options, &ctx)?;
        Ok(res)
    }
}

/// Split a record value into the address and the list of NUL-terminated names
fn split_record<'a>(
    value: &'a [u8],
    addr_len: usize,
    name: &str,
) -> Result<(&'a [u8], Vec<String>), PcapError<&'static [u8]>> {
    if value.len() < addr_len {
        return Err(PcapError::BadFile(format!(
            "NRB: {} record has length {}, smaller than an address",
            name,
            value.len()
        )));
    }
    let (addr, names) = value.split_at(addr_len);
    match names.last() {
        Some(0) => (),
        _ => {
            return Err(PcapError::BadFile(format!(
                "NRB: {} record has no terminating NUL for its last name",
                name
            )))
        }
    }
    let names = names[..names.len() - 1]
        .split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();
    Ok((addr, names))
}

pub(crate) fn decode_nrb_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Option<OptionValue> {
    match code {
        OptionCode::NsDnsName => Some(ctx.string_value(value)),
        OptionCode::NsDnsIP4Addr => {
            if value.len() == 4 {
                Some(OptionValue::Ipv4(Ipv4Addr::new(
                    value[0], value[1], value[2], value[3],
                )))
            } else {
                debug!(len = value.len(), "ns_dnsIP4addr has a wrong length, ignored");
                None
            }
        }
        OptionCode::NsDnsIP6Addr => {
            if value.len() == 16 {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(value);
                Some(OptionValue::Ipv6(Ipv6Addr::from(octets)))
            } else {
                debug!(len = value.len(), "ns_dnsIP6addr has a wrong length, ignored");
                None
            }
        }
        _ => None,
    }
}
