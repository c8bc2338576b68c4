use std::convert::TryInto;

use nom::error::ParseError;
use nom::number::streaming::{be_i64, be_u16, be_u32, be_u64, le_i64, le_u16, le_u32, le_u64};
use nom::IResult;

pub(crate) struct PcapBE;
pub(crate) struct PcapLE;

pub(crate) trait PcapEndianness {
    const BIG_ENDIAN: bool;

    fn native_u32(n: u32) -> u32;

    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E>;
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E>;
    fn parse_u64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u64, E>;
    fn parse_i64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], i64, E>;

    fn u32_from_bytes(i: [u8; 4]) -> u32;
}

impl PcapEndianness for PcapBE {
    const BIG_ENDIAN: bool = true;

    #[inline]
    fn native_u32(n: u32) -> u32 {
        u32::from_be(n)
    }

    #[inline]
    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E> {
        be_u16(i)
    }

    #[inline]
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E> {
        be_u32(i)
    }

    #[inline]
    fn parse_u64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u64, E> {
        be_u64(i)
    }

    #[inline]
    fn parse_i64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], i64, E> {
        be_i64(i)
    }

    #[inline]
    fn u32_from_bytes(i: [u8; 4]) -> u32 {
        u32::from_be_bytes(i)
    }
}

impl PcapEndianness for PcapLE {
    const BIG_ENDIAN: bool = false;

    #[inline]
    fn native_u32(n: u32) -> u32 {
        u32::from_le(n)
    }

    #[inline]
    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E> {
        le_u16(i)
    }

    #[inline]
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E> {
        le_u32(i)
    }

    #[inline]
    fn parse_u64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u64, E> {
        le_u64(i)
    }

    #[inline]
    fn parse_i64<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], i64, E> {
        le_i64(i)
    }

    #[inline]
    fn u32_from_bytes(i: [u8; 4]) -> u32 {
        u32::from_le_bytes(i)
    }
}

/// Byte order used to decode a numeric value
///
/// Most values follow the byte order of the section they belong to, but some vendor formats
/// always use a fixed byte order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    /// Byte order of the enclosing section
    Section,
    /// Always big-endian
    Big,
    /// Always little-endian
    Little,
}

impl ByteOrder {
    /// Resolve to a concrete byte order, given the byte order of the section
    #[inline]
    pub fn is_big_endian(self, section_big_endian: bool) -> bool {
        match self {
            ByteOrder::Section => section_big_endian,
            ByteOrder::Big => true,
            ByteOrder::Little => false,
        }
    }

    /// Decode a `u16`, or `None` if `b` is not exactly 2 bytes long
    pub fn read_u16(self, section_big_endian: bool, b: &[u8]) -> Option<u16> {
        let a: [u8; 2] = b.try_into().ok()?;
        if self.is_big_endian(section_big_endian) {
            Some(u16::from_be_bytes(a))
        } else {
            Some(u16::from_le_bytes(a))
        }
    }

    /// Decode a `u32`, or `None` if `b` is not exactly 4 bytes long
    pub fn read_u32(self, section_big_endian: bool, b: &[u8]) -> Option<u32> {
        let a: [u8; 4] = b.try_into().ok()?;
        if self.is_big_endian(section_big_endian) {
            Some(u32::from_be_bytes(a))
        } else {
            Some(u32::from_le_bytes(a))
        }
    }

    /// Decode a `u64`, or `None` if `b` is not exactly 8 bytes long
    pub fn read_u64(self, section_big_endian: bool, b: &[u8]) -> Option<u64> {
        let a: [u8; 8] = b.try_into().ok()?;
        if self.is_big_endian(section_big_endian) {
            Some(u64::from_be_bytes(a))
        } else {
            Some(u64::from_le_bytes(a))
        }
    }

    /// Decode an `i64`, or `None` if `b` is not exactly 8 bytes long
    #[inline]
    pub fn read_i64(self, section_big_endian: bool, b: &[u8]) -> Option<i64> {
        self.read_u64(section_big_endian, b).map(|v| v as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_modes() {
        let b = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(ByteOrder::Section.read_u32(false, &b), Some(0x0403_0201));
        assert_eq!(ByteOrder::Section.read_u32(true, &b), Some(0x0102_0304));
        assert_eq!(ByteOrder::Little.read_u32(true, &b), Some(0x0403_0201));
        assert_eq!(ByteOrder::Big.read_u32(false, &b), Some(0x0102_0304));
        assert_eq!(ByteOrder::Section.read_u32(false, &b[..3]), None);
        assert_eq!(ByteOrder::Big.read_u16(false, &b[..2]), Some(0x0102));
        assert_eq!(ByteOrder::Little.read_i64(false, &[0xff; 8]), Some(-1));
    }
}
