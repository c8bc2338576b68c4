use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::error::*;
use nom::number::streaming::{be_u32, le_u32};
use nom::{Err, IResult};
use rusticata_macros::align32;
use tracing::trace;

use crate::endianness::PcapEndianness;
use crate::PcapError;

use super::*;

/// A block from a PcapNG file
#[derive(Debug)]
pub enum Block<'a> {
    SectionHeader(SectionHeaderBlock<'a>),
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    EnhancedPacket(EnhancedPacketBlock<'a>),
    SimplePacket(SimplePacketBlock<'a>),
    Packet(PacketBlock<'a>),
    NameResolution(NameResolutionBlock<'a>),
    InterfaceStatistics(InterfaceStatisticsBlock<'a>),
    SystemdJournalExport(SystemdJournalExportBlock<'a>),
    DecryptionSecrets(DecryptionSecretsBlock<'a>),
    MetaEvent(MetaEventBlock<'a>),
    Custom(CustomBlock<'a>),
    Unknown(UnknownBlock<'a>),
}

impl<'a> Block<'a> {
    /// Returns true if blocks contains a network packet
    pub fn is_data_block(&self) -> bool {
        matches!(
            self,
            &Block::EnhancedPacket(_) | &Block::SimplePacket(_) | &Block::Packet(_)
        )
    }

    /// Returns true if the block only carries metadata, consumed by the capture reader
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            &Block::SectionHeader(_)
                | &Block::InterfaceDescription(_)
                | &Block::NameResolution(_)
                | &Block::InterfaceStatistics(_)
                | &Block::SystemdJournalExport(_)
                | &Block::DecryptionSecrets(_)
                | &Block::MetaEvent(_)
        )
    }

    /// Return the normalized magic number of the block
    pub fn magic(&self) -> u32 {
        match self {
            Block::SectionHeader(_) => SHB_MAGIC,
            Block::InterfaceDescription(_) => IDB_MAGIC,
            Block::EnhancedPacket(_) => EPB_MAGIC,
            Block::SimplePacket(_) => SPB_MAGIC,
            Block::Packet(_) => PB_MAGIC,
            Block::NameResolution(_) => NRB_MAGIC,
            Block::InterfaceStatistics(_) => ISB_MAGIC,
            Block::SystemdJournalExport(_) => SJE_MAGIC,
            Block::DecryptionSecrets(_) => DSB_MAGIC,
            Block::MetaEvent(mev) => mev.block_type,
            Block::Custom(cb) => cb.block_type,
            Block::Unknown(ub) => ub.block_type,
        }
    }
}

/// Parse any block, as little-endian
///
/// To find which endianess to use, read the section header
/// using `parse_sectionheaderblock`
pub fn parse_block_le(i: &[u8]) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    match le_u32(i) {
        Ok((_, id)) => match id {
            SHB_MAGIC => map(parse_sectionheaderblock, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                parse_interfacedescriptionblock_le,
                Block::InterfaceDescription,
            )(i),
            PB_MAGIC => map(parse_packetblock_le, Block::Packet)(i),
            SPB_MAGIC => map(parse_simplepacketblock_le, Block::SimplePacket)(i),
            EPB_MAGIC => map(parse_enhancedpacketblock_le, Block::EnhancedPacket)(i),
            NRB_MAGIC => map(parse_nameresolutionblock_le, Block::NameResolution)(i),
            ISB_MAGIC => map(
                parse_interfacestatisticsblock_le,
                Block::InterfaceStatistics,
            )(i),
            SJE_MAGIC => map(
                parse_systemdjournalexportblock_le,
                Block::SystemdJournalExport,
            )(i),
            DSB_MAGIC => map(parse_decryptionsecretsblock_le, Block::DecryptionSecrets)(i),
            CB_MAGIC => map(parse_customblock_le, Block::Custom)(i),
            DCB_MAGIC => map(parse_dcb_le, Block::Custom)(i),
            id if is_meta_event_block_type(id) => {
                map(parse_metaeventblock_le, Block::MetaEvent)(i)
            }
            _ => map(parse_unknownblock_le, Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}

/// Parse any block, as big-endian
///
/// To find which endianess to use, read the section header
/// using `parse_sectionheaderblock`
pub fn parse_block_be(i: &[u8]) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    match be_u32(i) {
        Ok((_, id)) => match id {
            SHB_MAGIC => map(parse_sectionheaderblock, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                parse_interfacedescriptionblock_be,
                Block::InterfaceDescription,
            )(i),
            PB_MAGIC => map(parse_packetblock_be, Block::Packet)(i),
            SPB_MAGIC => map(parse_simplepacketblock_be, Block::SimplePacket)(i),
            EPB_MAGIC => map(parse_enhancedpacketblock_be, Block::EnhancedPacket)(i),
            NRB_MAGIC => map(parse_nameresolutionblock_be, Block::NameResolution)(i),
            ISB_MAGIC => map(
                parse_interfacestatisticsblock_be,
                Block::InterfaceStatistics,
            )(i),
            SJE_MAGIC => map(
                parse_systemdjournalexportblock_be,
                Block::SystemdJournalExport,
            )(i),
            DSB_MAGIC => map(parse_decryptionsecretsblock_be, Block::DecryptionSecrets)(i),
            CB_MAGIC => map(parse_customblock_be, Block::Custom)(i),
            DCB_MAGIC => map(parse_dcb_be, Block::Custom)(i),
            id if is_meta_event_block_type(id) => {
                map(parse_metaeventblock_be, Block::MetaEvent)(i)
            }
            _ => map(parse_unknownblock_be, Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}

/// Parse any block, using the byte order of the current section
#[inline]
pub fn parse_block(i: &[u8], big_endian: bool) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    if big_endian {
        parse_block_be(i)
    } else {
        parse_block_le(i)
    }
}

pub(crate) trait PcapNGBlockParser<'a, En: PcapEndianness, O: 'a> {
    /// Minimum block size, in bytes
    const HDR_SZ: usize;
    /// Little-endian magic number for this block type
    const MAGIC: u32;

    // caller function must have tested header type(magic) and length
    // `i` holds the complete block body, without header and trailer
    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], O, PcapError<&'a [u8]>>;
}

/// Validate the declared length of a block, and return it rounded up to a multiple of 4
pub(crate) fn check_block_length<I>(
    block_type: u32,
    block_len: u32,
    min_size: u32,
) -> Result<u32, PcapError<I>> {
    if block_len > MAX_BLOCK_SIZE {
        return Err(PcapError::BadFile(format!(
            "block of type 0x{:08x} has length {}, larger than the maximum {}",
            block_type, block_len, MAX_BLOCK_SIZE
        )));
    }
    let rounded = align32!(block_len);
    if rounded < min_size {
        return Err(PcapError::BadFile(format!(
            "block of type 0x{:08x} has length {}, smaller than the minimum {}",
            block_type, block_len, min_size
        )));
    }
    Ok(rounded)
}

/// Create a block parser function, given the parameters (block object and endianness)
pub(crate) fn ng_block_parser<'a, P, En, O>(
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O, PcapError<&'a [u8]>>
where
    P: PcapNGBlockParser<'a, En, O>,
    En: PcapEndianness,
    O: 'a,
{
    move |i: &'a [u8]| {
        // read generic block layout
        //
        if i.len() < 8 {
            return Err(Err::Incomplete(nom::Needed::new(8 - i.len())));
        }
        let (i, block_type) = le_u32(i)?;
        let (i, block_len1) = En::parse_u32(i)?;
        if P::MAGIC != 0 && En::native_u32(block_type) != P::MAGIC {
            return Err(Err::Error(PcapError::from_error_kind(i, ErrorKind::Verify)));
        }
        let block_len = check_block_length(En::native_u32(block_type), block_len1, P::HDR_SZ as u32)
            .map_err(Err::Error)?;
        // 12 is block_type (4) + block_len1 (4) + block_len2 (4)
        let (i, block_content) = take(block_len - 12)(i)?;
        let (i, block_len2) = En::parse_u32(i)?;
        // the trailer is not rounded: it must hold the padded length
        if block_len2 != block_len {
            return Err(Err::Error(PcapError::BadFile(format!(
                "block of type 0x{:08x}: length {} in header does not match trailer length {}",
                En::native_u32(block_type),
                block_len1,
                block_len2
            ))));
        }
        trace!(
            block_type = En::native_u32(block_type),
            block_len = block_len1,
            "block"
        );
        // call block content parsing function
        // the content is complete, so missing bytes mean the block is malformed
        let (_, b) = match P::inner_parse(block_type, block_len1, block_content, block_len2) {
            Err(Err::Incomplete(_)) => {
                return Err(Err::Error(PcapError::BadFile(format!(
                    "block of type 0x{:08x} is too short for its content",
                    En::native_u32(block_type)
                ))))
            }
            r => r?,
        };
        // return the remaining bytes from the container, not content
        Ok((i, b))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn trailer_must_match_rounded_length() {
        // IDB, header length 32, trailer 33
        const BLOCK: &[u8] = &hex!(
            "
01 00 00 00 20 00 00 00 01 00 00 00 FF FF 00 00
09 00 01 00 06 00 00 00 00 00 00 00 21 00 00 00"
        );
        let res = parse_block_le(BLOCK);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn unrounded_header_length() {
        // SPB with header length 21 (rounded to 24), trailer 24
        const BLOCK: &[u8] = &hex!(
            "
03 00 00 00 15 00 00 00 05 00 00 00 01 02 03 04
05 00 00 00 18 00 00 00"
        );
        let (rem, block) = parse_block_le(BLOCK).expect("could not parse SPB");
        assert!(rem.is_empty());
        match block {
            Block::SimplePacket(spb) => {
                assert_eq!(spb.block_len1, 21);
                assert_eq!(spb.block_len2, 24);
                assert_eq!(spb.origlen, 5);
            }
            b => panic!("unexpected block {:?}", b),
        }
    }

    #[test]
    fn unpadded_trailer() {
        // SPB with header length 21, trailer 21 instead of 24
        const BLOCK: &[u8] = &hex!(
            "
03 00 00 00 15 00 00 00 05 00 00 00 01 02 03 04
05 00 00 00 15 00 00 00"
        );
        let res = parse_block_le(BLOCK);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn block_below_minimum() {
        // EPB claiming 16 bytes
        const BLOCK: &[u8] = &hex!("06 00 00 00 10 00 00 00 00 00 00 00 10 00 00 00");
        let res = parse_block_le(BLOCK);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn block_above_maximum() {
        // length is checked before waiting for the block content
        const BLOCK: &[u8] = &hex!("06 00 00 00 00 00 00 F0");
        let res = parse_block_le(BLOCK);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn incomplete_block() {
        const BLOCK: &[u8] = &hex!("06 00 00 00 20 00 00 00 00 00 00 00");
        let res = parse_block_le(BLOCK);
        assert!(matches!(res, Err(Err::Incomplete(_))));
    }
}
