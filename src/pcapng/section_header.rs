use nom::number::streaming::{be_i64, be_u16, le_i64, le_u16, le_u32};
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapLE};
use crate::{opt_parse_options, PcapError, PcapNGOption, SHB_MAGIC};

use super::*;

/// The Section Header Block (SHB) identifies the
/// beginning of a section of the capture capture file.
///
/// The
/// Section Header Block does not contain data but it rather identifies a
/// list of blocks (interfaces, packets) that are logically correlated.
#[derive(Debug)]
pub struct SectionHeaderBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Byte-order magic
    pub bom: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Section length, or -1 if unknown
    pub section_len: i64,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> SectionHeaderBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.bom != BOM_MAGIC
    }
}

fn check_version<'a>(major: u16, minor: u16) -> Result<(), Err<PcapError<&'a [u8]>>> {
    // 1.2 was never a released version, some writers produce it for 1.0
    if major != 1 || (minor != 0 && minor != 2) {
        return Err(Err::Error(PcapError::Unsupported(format!(
            "unknown section header version {}.{}",
            major, minor
        ))));
    }
    Ok(())
}

impl<'a> PcapNGBlockParser<'a, PcapBE, SectionHeaderBlock<'a>> for SectionHeaderBlock<'a> {
    const HDR_SZ: usize = MIN_SHB_SIZE as usize;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, bom) = le_u32(i)?;
        let (i, major_version) = be_u16(i)?;
        let (i, minor_version) = be_u16(i)?;
        check_version(major_version, minor_version)?;
        let (i, section_len) = be_i64(i)?;
        let (i, options) = opt_parse_options::<PcapBE>(i)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

impl<'a> PcapNGBlockParser<'a, PcapLE, SectionHeaderBlock<'a>> for SectionHeaderBlock<'a> {
    const HDR_SZ: usize = MIN_SHB_SIZE as usize;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, bom) = le_u32(i)?;
        let (i, major_version) = le_u16(i)?;
        let (i, minor_version) = le_u16(i)?;
        check_version(major_version, minor_version)?;
        let (i, section_len) = le_i64(i)?;
        let (i, options) = opt_parse_options::<PcapLE>(i)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Section Header Block (little endian)
pub fn parse_sectionheaderblock_le(
    i: &[u8],
) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    ng_block_parser::<SectionHeaderBlock, PcapLE, _>()(i)
}

/// Parse a Section Header Block (big endian)
pub fn parse_sectionheaderblock_be(
    i: &[u8],
) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    ng_block_parser::<SectionHeaderBlock, PcapBE, _>()(i)
}

/// Parse a SectionHeaderBlock (little or big endian)
///
/// The byte-order magic is checked first: if it is not recognized, the error is `NotThisFormat`.
pub fn parse_sectionheaderblock(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    if i.len() < 12 {
        return Err(Err::Incomplete(nom::Needed::new(12 - i.len())));
    }
    let bom = u32::from_le_bytes([i[8], i[9], i[10], i[11]]);
    if bom == BOM_MAGIC {
        parse_sectionheaderblock_le(i)
    } else if bom == u32::from_be(BOM_MAGIC) {
        parse_sectionheaderblock_be(i)
    } else {
        Err(Err::Error(PcapError::NotThisFormat))
    }
}

pub(crate) fn decode_shb_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Option<OptionValue> {
    match code {
        OptionCode::ShbHardware | OptionCode::ShbOs | OptionCode::ShbUserAppl => {
            Some(ctx.string_value(value))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    // SHB, little-endian, version 1.0, unknown length, shb_userappl "test"
    const SHB_LE: &[u8] = &hex!(
        "
0A 0D 0D 0A 28 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF FF FF FF FF 04 00 04 00 74 65 73 74
00 00 00 00 28 00 00 00"
    );

    #[test]
    fn shb_little_endian() {
        let (rem, shb) = parse_sectionheaderblock(SHB_LE).expect("could not parse SHB");
        assert!(rem.is_empty());
        assert!(!shb.big_endian());
        assert_eq!(shb.major_version, 1);
        assert_eq!(shb.minor_version, 0);
        assert_eq!(shb.section_len, -1);
        assert_eq!(shb.options.len(), 1);
        assert_eq!(shb.options[0].code, OptionCode::ShbUserAppl);
        assert_eq!(shb.options[0].value(), b"test");
    }

    #[test]
    fn shb_big_endian() {
        const SHB_BE: &[u8] = &hex!(
            "
0A 0D 0D 0A 00 00 00 1C 1A 2B 3C 4D 00 01 00 00
00 00 00 00 00 00 10 00 00 00 00 1C"
        );
        let (rem, shb) = parse_sectionheaderblock(SHB_BE).expect("could not parse SHB");
        assert!(rem.is_empty());
        assert!(shb.big_endian());
        assert_eq!(shb.section_len, 4096);
        assert!(shb.options.is_empty());
    }

    #[test]
    fn shb_bad_magic() {
        let mut data = SHB_LE.to_vec();
        data[8] = 0x00;
        let res = parse_sectionheaderblock(&data);
        assert!(matches!(res, Err(Err::Error(PcapError::NotThisFormat))));
    }

    #[test]
    fn shb_minor_version_2() {
        let mut data = SHB_LE.to_vec();
        data[14] = 2;
        let (_, shb) = parse_sectionheaderblock(&data).expect("version 1.2 is accepted");
        assert_eq!(shb.minor_version, 2);
    }

    #[test]
    fn shb_unsupported_version() {
        let mut data = SHB_LE.to_vec();
        data[12] = 2;
        let res = parse_sectionheaderblock(&data);
        assert!(matches!(res, Err(Err::Error(PcapError::Unsupported(_)))));
        let mut data = SHB_LE.to_vec();
        data[14] = 1;
        let res = parse_sectionheaderblock(&data);
        assert!(matches!(res, Err(Err::Error(PcapError::Unsupported(_)))));
    }

    #[test]
    fn shb_too_short() {
        // length 24 is below the minimum SHB size
        const SHB: &[u8] = &hex!(
            "
0A 0D 0D 0A 18 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF 18 00 00 00"
        );
        let res = parse_sectionheaderblock(SHB);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }
}
