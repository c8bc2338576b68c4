use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr};

use nom::bytes::streaming::take;
use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};
use tracing::{debug, trace};

use crate::endianness::{ByteOrder, PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    ShbHardware = 2,
    IfName = 2,
    EpbFlags = 2,
    NsDnsName = 2,
    IsbStartTime = 2,
    ShbOs = 3,
    IfDescription = 3,
    EpbHash = 3,
    NsDnsIP4Addr = 3,
    IsbEndTime = 3,
    ShbUserAppl = 4,
    IfIpv4Addr = 4,
    EpbDropCount = 4,
    NsDnsIP6Addr = 4,
    IsbIfRecv = 4,
    IfIpv6Addr = 5,
    EpbPacketId = 5,
    IsbIfDrop = 5,
    IfMacAddr = 6,
    EpbQueue = 6,
    IsbFilterAccept = 6,
    IfEuiAddr = 7,
    EpbVerdict = 7,
    IsbOsDrop = 7,
    IfSpeed = 8,
    IsbUsrDeliv = 8,
    IfTsresol = 9,
    IfTzone = 10,
    IfFilter = 11,
    IfOs = 12,
    IfFcslen = 13,
    IfTsoffset = 14,
    IfHardware = 15,
    Custom2988 = 2988,
    Custom2989 = 2989,
    Custom19372 = 19372,
    Custom19373 = 19373,
}
}

impl OptionCode {
    /// Returns true for the four custom option codes
    #[inline]
    pub fn is_custom(self) -> bool {
        matches!(
            self,
            OptionCode::Custom2988
                | OptionCode::Custom2989
                | OptionCode::Custom19372
                | OptionCode::Custom19373
        )
    }
}

/// A raw option, as read from a block
///
/// `value` does not include the padding.
#[derive(Debug, Clone)]
pub struct PcapNGOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    pub value: Cow<'a, [u8]>,
}

impl<'a> PcapNGOption<'a> {
    /// Build an option owning its value
    pub fn new_owned(code: OptionCode, value: Vec<u8>) -> PcapNGOption<'static> {
        PcapNGOption {
            code,
            len: value.len() as u16,
            value: Cow::Owned(value),
        }
    }

    /// Return a reference to the option value, as raw bytes (not related to the `len` field)
    #[inline]
    pub fn value(&self) -> &[u8] {
        self.value.as_ref()
    }

    /// Return a reference to the option value, using the `len` field to limit it, or None if length is invalid
    pub fn as_bytes(&self) -> Option<&[u8]> {
        let len = usize::from(self.len);
        if len <= self.value.len() {
            Some(&self.value[..len])
        } else {
            None
        }
    }
}

/// Parse a pcap-ng Option (little-endian)
#[inline]
pub fn parse_option_le(i: &[u8]) -> IResult<&[u8], PcapNGOption, PcapError<&[u8]>> {
    parse_option::<PcapLE>(i)
}

/// Parse a pcap-ng Option (big-endian)
#[inline]
pub fn parse_option_be(i: &[u8]) -> IResult<&[u8], PcapNGOption, PcapError<&[u8]>> {
    parse_option::<PcapBE>(i)
}

pub(crate) fn parse_option<En: PcapEndianness>(
    i: &[u8],
) -> IResult<&[u8], PcapNGOption, PcapError<&[u8]>> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    if code == OptionCode::EndOfOpt.0 {
        let option = PcapNGOption {
            code: OptionCode::EndOfOpt,
            len,
            value: Cow::Borrowed(&[]),
        };
        return Ok((i, option));
    }
    let (i, value) = take(align32!(len as u32))(i)?;
    let option = PcapNGOption {
        code: OptionCode(code),
        len,
        value: Cow::Borrowed(&value[..len as usize]),
    };
    Ok((i, option))
}

/// Parse the option list filling the rest of a block body
///
/// The list stops at the first end-of-options, or when all bytes are used. Remaining bytes after
/// an end-of-options are ignored.
pub(crate) fn opt_parse_options<En: PcapEndianness>(
    i: &[u8],
) -> IResult<&[u8], Vec<PcapNGOption>, PcapError<&[u8]>> {
    let mut options = Vec::new();
    let mut rem = i;
    while !rem.is_empty() {
        if rem.len() < 4 {
            return Err(Err::Error(PcapError::BadFile(format!(
                "{} bytes left in block, not enough for an option header",
                rem.len()
            ))));
        }
        let (_, code) = En::parse_u16(rem)?;
        let (_, len) = En::parse_u16(&rem[2..])?;
        if code != OptionCode::EndOfOpt.0 && align32!(len as usize) > rem.len() - 4 {
            return Err(Err::Error(PcapError::BadFile(format!(
                "option {} has length {}, but only {} bytes are left in block",
                code,
                len,
                rem.len() - 4
            ))));
        }
        let (r, option) = parse_option::<En>(rem)?;
        if option.code == OptionCode::EndOfOpt {
            return Ok((&rem[rem.len()..], options));
        }
        options.push(option);
        rem = r;
    }
    Ok((rem, options))
}

/// Kind of block owning an option list
///
/// Option codes only have a meaning for a given block kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    SectionHeader,
    InterfaceDescription,
    /// Enhanced Packet Block and legacy Packet Block
    Packet,
    NameResolution,
    InterfaceStatistics,
    /// Netflix custom event block
    CustomEvent,
    DecryptionSecrets,
}

impl BlockKind {
    /// Returns true if the option code is decoded natively for this block kind
    pub fn is_builtin_option(self, code: OptionCode) -> bool {
        if code == OptionCode::EndOfOpt || code == OptionCode::Comment || code.is_custom() {
            return true;
        }
        match self {
            BlockKind::SectionHeader => (2..=4).contains(&code.0),
            BlockKind::InterfaceDescription => (2..=15).contains(&code.0),
            BlockKind::Packet => (2..=7).contains(&code.0),
            BlockKind::NameResolution => (2..=4).contains(&code.0),
            BlockKind::InterfaceStatistics => (2..=8).contains(&code.0),
            BlockKind::CustomEvent | BlockKind::DecryptionSecrets => false,
        }
    }
}

/// Private Enterprise Number of Netflix, whose custom options and blocks have a documented format
pub const PEN_NFLX: u32 = 10949;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct NflxOptionType(pub u32);

newtype_enum! {
impl debug NflxOptionType {
    Version = 1,
    TcpInfo = 2,
    DumpInfo = 4,
    DumpTime = 5,
    StackName = 6,
}
}

/// Payload of a custom option
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomData {
    /// Vendor-specific bytes
    Generic(Vec<u8>),
    /// Netflix option: a little-endian type followed by the value
    Nflx {
        option_type: NflxOptionType,
        value: Vec<u8>,
    },
}

/// A custom option: Private Enterprise Number and payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomOption {
    pub pen: u32,
    pub data: CustomData,
}

impl CustomOption {
    /// Length of the option value (PEN included)
    pub fn value_len(&self) -> usize {
        match &self.data {
            CustomData::Generic(v) => 4 + v.len(),
            CustomData::Nflx { value, .. } => 8 + value.len(),
        }
    }
}

/// Decoded option value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    U8(u8),
    U32(u32),
    U64(u64),
    I64(i64),
    /// Timestamp in units of the interface time resolution
    Timestamp(u64),
    String(String),
    Bytes(Vec<u8>),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    /// IPv4 address and netmask
    Ipv4Interface(Ipv4Addr, Ipv4Addr),
    /// IPv6 address and prefix length
    Ipv6Interface(Ipv6Addr, u8),
    Filter(CaptureFilter),
    Hash(PacketHash),
    Verdict(PacketVerdict),
    Custom(CustomOption),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            OptionValue::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            OptionValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            OptionValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<u64> {
        match self {
            OptionValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            OptionValue::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

/// One decoded option of a block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockOption {
    pub code: OptionCode,
    pub value: OptionValue,
}

/// Ordered list of decoded options
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    items: Vec<BlockOption>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<BlockOption> {
        self.items.iter()
    }

    /// Append an option. Multi-valued options (comments, addresses) keep every value
    pub fn push(&mut self, code: OptionCode, value: OptionValue) {
        self.items.push(BlockOption { code, value });
    }

    /// Replace the first value of `code`, or append it
    pub fn set(&mut self, code: OptionCode, value: OptionValue) {
        match self.items.iter_mut().find(|o| o.code == code) {
            Some(o) => o.value = value,
            None => self.push(code, value),
        }
    }

    /// Remove all values of `code`
    pub fn remove(&mut self, code: OptionCode) {
        self.items.retain(|o| o.code != code);
    }

    /// Return the first value of `code`
    pub fn get(&self, code: OptionCode) -> Option<&OptionValue> {
        self.items.iter().find(|o| o.code == code).map(|o| &o.value)
    }

    /// Return all values of `code`
    pub fn get_all(&self, code: OptionCode) -> impl Iterator<Item = &OptionValue> {
        self.items
            .iter()
            .filter(move |o| o.code == code)
            .map(|o| &o.value)
    }

    pub fn get_str(&self, code: OptionCode) -> Option<&str> {
        self.get(code).and_then(OptionValue::as_str)
    }

    pub fn get_u8(&self, code: OptionCode) -> Option<u8> {
        self.get(code).and_then(OptionValue::as_u8)
    }

    pub fn get_u32(&self, code: OptionCode) -> Option<u32> {
        self.get(code).and_then(OptionValue::as_u32)
    }

    pub fn get_u64(&self, code: OptionCode) -> Option<u64> {
        self.get(code).and_then(OptionValue::as_u64)
    }

    pub fn get_i64(&self, code: OptionCode) -> Option<i64> {
        self.get(code).and_then(OptionValue::as_i64)
    }

    pub fn get_timestamp(&self, code: OptionCode) -> Option<u64> {
        self.get(code).and_then(OptionValue::as_timestamp)
    }

    /// Iterate over comments
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.get_all(OptionCode::Comment)
            .filter_map(OptionValue::as_str)
    }

    /// Iterate over custom options, with their option code
    pub fn customs(&self) -> impl Iterator<Item = (OptionCode, &CustomOption)> {
        self.items.iter().filter_map(|o| match &o.value {
            OptionValue::Custom(c) => Some((o.code, c)),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a BlockOption;
    type IntoIter = std::slice::Iter<'a, BlockOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Parameters used to decode the options of one block
pub struct OptionContext<'r> {
    /// Block kind, selecting the meaning of option codes
    pub kind: BlockKind,
    /// Byte order mode for numeric values
    pub order: ByteOrder,
    /// Byte order of the enclosing section
    pub section_big_endian: bool,
    pub registry: &'r Registry,
}

impl<'r> OptionContext<'r> {
    pub fn new(kind: BlockKind, section_big_endian: bool, registry: &'r Registry) -> Self {
        OptionContext {
            kind,
            order: ByteOrder::Section,
            section_big_endian,
            registry,
        }
    }

    /// Use a fixed byte order instead of the section one
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    #[inline]
    pub fn big_endian(&self) -> bool {
        self.order.is_big_endian(self.section_big_endian)
    }

    pub(crate) fn u8_value(&self, code: OptionCode, value: &[u8]) -> Option<OptionValue> {
        if value.len() == 1 {
            Some(OptionValue::U8(value[0]))
        } else {
            ignore_length(self.kind, code, value.len(), 1);
            None
        }
    }

    pub(crate) fn u32_value(&self, code: OptionCode, value: &[u8]) -> Option<OptionValue> {
        match self.order.read_u32(self.section_big_endian, value) {
            Some(v) => Some(OptionValue::U32(v)),
            None => {
                ignore_length(self.kind, code, value.len(), 4);
                None
            }
        }
    }

    pub(crate) fn u64_value(&self, code: OptionCode, value: &[u8]) -> Option<OptionValue> {
        match self.order.read_u64(self.section_big_endian, value) {
            Some(v) => Some(OptionValue::U64(v)),
            None => {
                ignore_length(self.kind, code, value.len(), 8);
                None
            }
        }
    }

    pub(crate) fn i64_value(&self, code: OptionCode, value: &[u8]) -> Option<OptionValue> {
        match self.order.read_i64(self.section_big_endian, value) {
            Some(v) => Some(OptionValue::I64(v)),
            None => {
                ignore_length(self.kind, code, value.len(), 8);
                None
            }
        }
    }

    /// Timestamps are stored as two 32-bit halves, high first
    pub(crate) fn timestamp_value(&self, code: OptionCode, value: &[u8]) -> Option<OptionValue> {
        if value.len() != 8 {
            ignore_length(self.kind, code, value.len(), 8);
            return None;
        }
        let high = self.order.read_u32(self.section_big_endian, &value[..4])?;
        let low = self.order.read_u32(self.section_big_endian, &value[4..])?;
        Some(OptionValue::Timestamp((u64::from(high) << 32) | u64::from(low)))
    }

    pub(crate) fn string_value(&self, value: &[u8]) -> OptionValue {
        OptionValue::String(string_from_bytes(value))
    }

    pub(crate) fn read_u32(&self, value: &[u8]) -> Option<u32> {
        self.order.read_u32(self.section_big_endian, value)
    }

    pub(crate) fn read_u64(&self, value: &[u8]) -> Option<u64> {
        self.order.read_u64(self.section_big_endian, value)
    }
}

fn ignore_length(kind: BlockKind, code: OptionCode, len: usize, expected: usize) {
    debug!(
        ?kind,
        code = code.0,
        len,
        expected,
        "option has a wrong length, ignored"
    );
}

/// Decode a string value. The string stops at the first NUL byte, invalid UTF-8 is replaced
pub(crate) fn string_from_bytes(value: &[u8]) -> String {
    let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
    String::from_utf8_lossy(&value[..end]).into_owned()
}

fn decode_custom_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Result<OptionValue, PcapError<&'static [u8]>> {
    if value.len() < 4 {
        return Err(PcapError::BadFile(format!(
            "custom option {} has length {}, smaller than the PEN",
            code.0,
            value.len()
        )));
    }
    let pen = ctx.read_u32(&value[..4]).unwrap_or_default();
    let data = if pen == PEN_NFLX {
        if value.len() < 8 {
            return Err(PcapError::BadFile(format!(
                "Netflix custom option has length {}, smaller than PEN and type",
                value.len()
            )));
        }
        let option_type = ByteOrder::Little
            .read_u32(false, &value[4..8])
            .unwrap_or_default();
        CustomData::Nflx {
            option_type: NflxOptionType(option_type),
            value: value[8..].to_vec(),
        }
    } else {
        CustomData::Generic(value[4..].to_vec())
    };
    Ok(OptionValue::Custom(CustomOption { pen, data }))
}

/// Decode the raw options of a block
///
/// Comments and custom options are decoded identically for every block kind, other codes use
/// the table of the block kind, then the extension registry. Unknown codes are ignored.
pub fn decode_options(
    options: &[PcapNGOption],
    ctx: &OptionContext,
) -> Result<Options, PcapError<&'static [u8]>> {
    let mut decoded = Options::default();
    for opt in options {
        let code = opt.code;
        let value = opt.value();
        trace!(kind = ?ctx.kind, code = code.0, len = value.len(), "option");
        let v = match code {
            OptionCode::EndOfOpt => break,
            OptionCode::Comment => Some(ctx.string_value(value)),
            code if code.is_custom() => Some(decode_custom_option(code, value, ctx)?),
            code => {
                if let Some(handler) = ctx.registry.option_handler(ctx.kind, code) {
                    Some((handler.parse)(value, ctx.big_endian())?)
                } else {
                    match ctx.kind {
                        BlockKind::SectionHeader => decode_shb_option(code, value, ctx),
                        BlockKind::InterfaceDescription => decode_idb_option(code, value, ctx)?,
                        BlockKind::Packet => decode_packet_option(code, value, ctx)?,
                        BlockKind::NameResolution => decode_nrb_option(code, value, ctx),
                        BlockKind::InterfaceStatistics => decode_isb_option(code, value, ctx),
                        BlockKind::CustomEvent | BlockKind::DecryptionSecrets => {
                            debug!(kind = ?ctx.kind, code = code.0, "unknown option, ignored");
                            None
                        }
                    }
                }
            }
        };
        if let Some(v) = v {
            decoded.push(code, v);
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn parse_options_strict() {
        // comment "abc", then end of options, then garbage
        const OPTS: &[u8] = &hex!("01 00 03 00 61 62 63 00 00 00 00 00 ff ff");
        let (rem, options) = opt_parse_options::<PcapLE>(OPTS).expect("options");
        assert!(rem.is_empty());
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].code, OptionCode::Comment);
        assert_eq!(options[0].value(), b"abc");
    }

    #[test]
    fn option_past_end_of_block() {
        // declared length 8, only 4 bytes available
        const OPTS: &[u8] = &hex!("01 00 08 00 61 62 63 00");
        let res = opt_parse_options::<PcapLE>(OPTS);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn truncated_option_header() {
        const OPTS: &[u8] = &hex!("01 00");
        let res = opt_parse_options::<PcapLE>(OPTS);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }

    #[test]
    fn options_without_end_marker() {
        const OPTS: &[u8] = &hex!("00 01 00 02 61 62 00 00");
        let (_, options) = opt_parse_options::<PcapBE>(OPTS).expect("options");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].len, 2);
        assert_eq!(options[0].value(), b"ab");
    }

    #[test]
    fn decode_comment_and_custom() {
        let registry = Registry::new();
        let ctx = OptionContext::new(BlockKind::SectionHeader, false, &registry);
        let raw = vec![
            PcapNGOption::new_owned(OptionCode::Comment, b"hello\0".to_vec()),
            PcapNGOption::new_owned(
                OptionCode::Custom2989,
                hex!("39 30 00 00 de ad be ef").to_vec(),
            ),
            PcapNGOption::new_owned(OptionCode(99), vec![1, 2, 3]),
        ];
        let options = decode_options(&raw, &ctx).expect("decode");
        assert_eq!(options.len(), 2);
        assert_eq!(options.comments().collect::<Vec<_>>(), vec!["hello"]);
        let (code, custom) = options.customs().next().expect("custom option");
        assert_eq!(code, OptionCode::Custom2989);
        assert_eq!(custom.pen, 12345);
        assert_eq!(custom.data, CustomData::Generic(hex!("de ad be ef").to_vec()));
    }

    #[test]
    fn decode_nflx_custom_option() {
        let registry = Registry::new();
        // big-endian section: PEN follows the section, type is always little-endian
        let ctx = OptionContext::new(BlockKind::Packet, true, &registry);
        let raw = vec![PcapNGOption::new_owned(
            OptionCode::Custom2988,
            hex!("00 00 2a c5 06 00 00 00 74 63 70").to_vec(),
        )];
        let options = decode_options(&raw, &ctx).expect("decode");
        let (_, custom) = options.customs().next().expect("custom option");
        assert_eq!(custom.pen, PEN_NFLX);
        assert_eq!(
            custom.data,
            CustomData::Nflx {
                option_type: NflxOptionType::StackName,
                value: b"tcp".to_vec()
            }
        );
    }

    #[test]
    fn short_custom_option() {
        let registry = Registry::new();
        let ctx = OptionContext::new(BlockKind::Packet, false, &registry);
        let raw = vec![PcapNGOption::new_owned(OptionCode::Custom2988, vec![1, 2])];
        assert!(matches!(
            decode_options(&raw, &ctx),
            Err(PcapError::BadFile(_))
        ));
    }

    #[test]
    fn options_collection() {
        let mut options = Options::new();
        options.push(OptionCode::Comment, OptionValue::String("a".to_string()));
        options.push(OptionCode::Comment, OptionValue::String("b".to_string()));
        options.set(OptionCode::IfSpeed, OptionValue::U64(10));
        options.set(OptionCode::IfSpeed, OptionValue::U64(100));
        assert_eq!(options.len(), 3);
        assert_eq!(options.get_u64(OptionCode::IfSpeed), Some(100));
        assert_eq!(options.comments().count(), 2);
        options.remove(OptionCode::Comment);
        assert_eq!(options.len(), 1);
    }
}
