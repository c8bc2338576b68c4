use nom::bytes::streaming::take;
use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};
use tracing::debug;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::traits::PcapNGPacketBlock;
use crate::{opt_parse_options, PcapError, PcapNGOption, EPB_MAGIC};

use super::*;

/// An Enhanced Packet Block (EPB) is the standard container for storing
/// the packets coming from the network.
///
/// This struct is a thin abstraction layer, and stores the raw block data.
/// For ex the `data` field is stored with the padding.
/// It implements the `PcapNGPacketBlock` trait, which provides helper functions.
///
/// ## Examples
///
/// ```rust
/// use pcapng_codec::pcapng::parse_enhancedpacketblock_le;
/// use pcapng_codec::traits::PcapNGPacketBlock;
///
/// # let pcap_data = &[
/// #     0x06, 0, 0, 0, 0x24, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
/// #     0x04, 0, 0, 0, 0x04, 0, 0, 0, 1, 2, 3, 4, 0x24, 0, 0, 0,
/// # ];
/// let (i, epb) = parse_enhancedpacketblock_le(pcap_data).unwrap();
/// let packet_data = epb.packet_data();
/// if packet_data.len() < epb.orig_len() as usize {
///     // packet was truncated
/// } else {
///     // we have a full packet
/// }
/// ```
#[derive(Debug)]
pub struct EnhancedPacketBlock<'a> {
    // Block type, read as little-endian.
    // If block value is the reverse the the expected magic, this means block is encoded as big-endian
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    /// Captured packet length
    pub caplen: u32,
    /// Original packet length
    pub origlen: u32,
    /// Raw data from packet (with padding)
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> EnhancedPacketBlock<'a> {
    /// Raw timestamp, in units of the interface resolution
    #[inline]
    pub fn ticks(&self) -> u64 {
        (u64::from(self.ts_high) << 32) | u64::from(self.ts_low)
    }
}

impl<'a> PcapNGPacketBlock for EnhancedPacketBlock<'a> {
    fn big_endian(&self) -> bool {
        self.block_type != EPB_MAGIC
    }
    fn truncated(&self) -> bool {
        self.origlen != self.caplen
    }
    fn orig_len(&self) -> u32 {
        self.origlen
    }
    fn raw_packet_data(&self) -> &[u8] {
        self.data
    }
    fn packet_data(&self) -> &[u8] {
        let caplen = self.caplen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

/// Check that a block body holds `hdr_len` bytes of header plus the padded captured data
pub(crate) fn check_captured_length<'a>(
    block_type: u32,
    body_len: usize,
    hdr_len: usize,
    caplen: u32,
) -> Result<u32, Err<PcapError<&'a [u8]>>> {
    // align32 can overflow
    if caplen >= u32::MAX - 4 || hdr_len + align32!(caplen) as usize > body_len {
        return Err(Err::Error(PcapError::BadFile(format!(
            "block of type 0x{:08x}: captured length {} does not fit in block body of {} bytes",
            block_type, caplen, body_len
        ))));
    }
    Ok(align32!(caplen))
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, EnhancedPacketBlock<'a>>
    for EnhancedPacketBlock<'a>
{
    const HDR_SZ: usize = MIN_EPB_SIZE as usize;
    const MAGIC: u32 = EPB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], EnhancedPacketBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let body_len = i.len();
        let (i, if_id) = En::parse_u32(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
        // read packet data
        let padded_length = check_captured_length(EPB_MAGIC, body_len, 20, caplen)?;
        let (i, data) = take(padded_length)(i)?;
        // read options
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = EnhancedPacketBlock {
            block_type,
            block_len1,
            if_id,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse an Enhanced Packet Block (little-endian)
pub fn parse_enhancedpacketblock_le(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<EnhancedPacketBlock, PcapLE, _>()(i)
}

/// Parse an Enhanced Packet Block (big-endian)
pub fn parse_enhancedpacketblock_be(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<EnhancedPacketBlock, PcapBE, _>()(i)
}

/// Mask of the FCS length field in `epb_flags`
pub const EPB_FLAGS_FCS_LEN_MASK: u32 = 0x000F_0000;

/// FCS length in bits, if the `epb_flags` field gives one
#[inline]
pub fn fcs_len_from_flags(flags: u32) -> Option<u32> {
    match (flags & EPB_FLAGS_FCS_LEN_MASK) >> 16 {
        0 => None,
        octets => Some(octets * 8),
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct HashType(pub u8);

newtype_enum! {
impl debug HashType {
    TwosComplement = 0,
    Xor = 1,
    Crc32 = 2,
    Md5 = 3,
    Sha1 = 4,
    Toeplitz = 5,
}
}

/// Packet hash (`epb_hash`): algorithm and digest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketHash {
    pub algorithm: HashType,
    pub digest: Vec<u8>,
}

/// Verdict type byte: hardware verdict
pub const VERDICT_TYPE_HW: u8 = 0;
/// Verdict type byte: Linux eBPF TC
pub const VERDICT_TYPE_LINUX_EBPF_TC: u8 = 1;
/// Verdict type byte: Linux eBPF XDP
pub const VERDICT_TYPE_LINUX_EBPF_XDP: u8 = 2;

/// Verdict on a packet (`epb_verdict`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketVerdict {
    Hardware(Vec<u8>),
    LinuxTc(u64),
    LinuxXdp(u64),
}

fn bad_length(name: &str, len: usize) -> PcapError<&'static [u8]> {
    PcapError::BadFile(format!("{} option has invalid length {}", name, len))
}

fn decode_verdict(
    value: &[u8],
    ctx: &OptionContext,
) -> Result<Option<PacketVerdict>, PcapError<&'static [u8]>> {
    if value.is_empty() {
        return Err(bad_length("epb_verdict", 0));
    }
    match value[0] {
        VERDICT_TYPE_HW => Ok(Some(PacketVerdict::Hardware(value[1..].to_vec()))),
        t @ VERDICT_TYPE_LINUX_EBPF_TC | t @ VERDICT_TYPE_LINUX_EBPF_XDP => {
            if value.len() != 9 {
                return Err(bad_length("epb_verdict", value.len()));
            }
            let v = ctx.read_u64(&value[1..]).unwrap_or_default();
            if t == VERDICT_TYPE_LINUX_EBPF_TC {
                Ok(Some(PacketVerdict::LinuxTc(v)))
            } else {
                Ok(Some(PacketVerdict::LinuxXdp(v)))
            }
        }
        t => {
            debug!(verdict_type = t, "unknown epb_verdict type, ignored");
            Ok(None)
        }
    }
}

/// Decode an option of an Enhanced Packet Block or a Packet Block
///
/// Unlike other blocks, a packet option with a wrong length makes the block invalid.
pub(crate) fn decode_packet_option(
    code: OptionCode,
    value: &[u8],
    ctx: &OptionContext,
) -> Result<Option<OptionValue>, PcapError<&'static [u8]>> {
    let v = match code {
        OptionCode::EpbFlags | OptionCode::EpbQueue => {
            let v = ctx.read_u32(value).ok_or_else(|| {
                let name = if code == OptionCode::EpbFlags {
                    "epb_flags"
                } else {
                    "epb_queue"
                };
                bad_length(name, value.len())
            })?;
            Some(OptionValue::U32(v))
        }
        OptionCode::EpbHash => {
            if value.is_empty() {
                return Err(bad_length("epb_hash", 0));
            }
            Some(OptionValue::Hash(PacketHash {
                algorithm: HashType(value[0]),
                digest: value[1..].to_vec(),
            }))
        }
        OptionCode::EpbDropCount | OptionCode::EpbPacketId => {
            let v = ctx.read_u64(value).ok_or_else(|| {
                let name = if code == OptionCode::EpbDropCount {
                    "epb_dropcount"
                } else {
                    "epb_packetid"
                };
                bad_length(name, value.len())
            })?;
            Some(OptionValue::U64(v))
        }
        OptionCode::EpbVerdict => decode_verdict(value, ctx)?.map(OptionValue::Verdict),
        _ => None,
    };
    Ok(v)
}
