use std::borrow::Cow;
use std::io::Write;

use cookie_factory::bytes::{le_i64, le_u16, le_u32};
use cookie_factory::combinator::slice;
use cookie_factory::multi::many_ref;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, GenError, SerializeFn};
use rusticata_macros::align32;
use tracing::debug;

use crate::pcapng::*;

/// Common trait for all serialization functions
pub trait ToVec {
    /// Serialize to bytes representation (little-endian).
    /// Check values and fix all fields before serializing.
    fn to_vec(&mut self) -> Result<Vec<u8>, GenError> {
        self.fix();
        self.to_vec_raw()
    }

    /// Check and correct all fields: use magic, fix lengths fields and other values if possible.
    fn fix(&mut self) {}

    /// Serialize to bytes representation (little-endian). Do not check values
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError>;
}

fn padding_for<'a, W: Write + 'a>(unaligned_length: u32) -> impl SerializeFn<W> + 'a {
    let length = align32!(unaligned_length) - unaligned_length;
    slice(if length > 0 {
        &[0, 0, 0, 0][..length as usize]
    } else {
        b""
    })
}

impl<'a> ToVec for PcapNGOption<'a> {
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::new();
        gen(pcapngoption_le(self), &mut v).map(|res| res.0.to_vec())
    }
}

fn pcapngoption_le<'a, 'b: 'a, W: Write + 'a>(i: &'b PcapNGOption) -> impl SerializeFn<W> + 'a {
    tuple((
        le_u16(i.code.0),
        le_u16(i.len),
        slice(&i.value),
        padding_for(i.value.len() as u32),
    ))
}

fn options_length(options: &[PcapNGOption]) -> usize {
    options.iter().map(|o| align32!(4 + o.value.len())).sum()
}

fn fix_options(options: &mut Vec<PcapNGOption>) {
    options.retain(|e| e.code != OptionCode::EndOfOpt);
    if options.is_empty() {
        // No EndOfOpt is required if there are no options.
    } else {
        options.push(PcapNGOption {
            code: OptionCode::EndOfOpt,
            len: 0,
            value: Cow::Borrowed(&[]),
        })
    }
}

/// Serialize options, followed by the end-of-options marker if the list is not empty
pub(crate) fn options_to_vec(options: &[PcapNGOption]) -> Result<Vec<u8>, GenError> {
    let mut v = Vec::with_capacity(options_length(options) + 4);
    for opt in options {
        v.extend_from_slice(&opt.to_vec_raw()?);
    }
    if !options.is_empty() {
        v.extend_from_slice(&[0, 0, 0, 0]);
    }
    Ok(v)
}

/// Size of an encoded option value, without padding
///
/// Values decoded by an extension use the size function of their handler. Zero means the option
/// is not written.
pub fn option_value_size(
    kind: BlockKind,
    code: OptionCode,
    value: &OptionValue,
    registry: &Registry,
) -> u32 {
    if let Some(handler) = registry.option_handler(kind, code) {
        return (handler.size)(value);
    }
    let size = match value {
        OptionValue::U8(_) => 1,
        OptionValue::U32(_) => 4,
        OptionValue::U64(_) | OptionValue::I64(_) | OptionValue::Timestamp(_) => 8,
        OptionValue::String(s) => s.len(),
        OptionValue::Bytes(b) => b.len(),
        OptionValue::Ipv4(_) => 4,
        OptionValue::Ipv6(_) => 16,
        OptionValue::Ipv4Interface(_, _) => 8,
        OptionValue::Ipv6Interface(_, _) => 17,
        OptionValue::Filter(CaptureFilter::String(s)) => 1 + s.len(),
        OptionValue::Filter(CaptureFilter::Bpf(prog)) => 1 + 8 * prog.len(),
        OptionValue::Hash(h) => 1 + h.digest.len(),
        OptionValue::Verdict(PacketVerdict::Hardware(v)) => 1 + v.len(),
        OptionValue::Verdict(_) => 9,
        OptionValue::Custom(c) => c.value_len(),
    };
    if size > usize::from(u16::MAX) {
        debug!(code = code.0, size, "option value too large, not written");
        return 0;
    }
    size as u32
}

/// Encode an option value, little-endian, without padding
fn write_option_value(value: &OptionValue, out: &mut Vec<u8>) {
    match value {
        OptionValue::U8(v) => out.push(*v),
        OptionValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        OptionValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        OptionValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
        OptionValue::Timestamp(ticks) => {
            let (high, low) = Timestamp::split_ticks(*ticks);
            out.extend_from_slice(&high.to_le_bytes());
            out.extend_from_slice(&low.to_le_bytes());
        }
        OptionValue::String(s) => out.extend_from_slice(s.as_bytes()),
        OptionValue::Bytes(b) => out.extend_from_slice(b),
        OptionValue::Ipv4(a) => out.extend_from_slice(&a.octets()),
        OptionValue::Ipv6(a) => out.extend_from_slice(&a.octets()),
        OptionValue::Ipv4Interface(addr, mask) => {
            out.extend_from_slice(&addr.octets());
            out.extend_from_slice(&mask.octets());
        }
        OptionValue::Ipv6Interface(addr, prefix) => {
            out.extend_from_slice(&addr.octets());
            out.push(*prefix);
        }
        OptionValue::Filter(CaptureFilter::String(s)) => {
            out.push(FILTER_TYPE_STRING);
            out.extend_from_slice(s.as_bytes());
        }
        OptionValue::Filter(CaptureFilter::Bpf(prog)) => {
            out.push(FILTER_TYPE_BPF);
            for insn in prog {
                out.extend_from_slice(&insn.code.to_le_bytes());
                out.push(insn.jt);
                out.push(insn.jf);
                out.extend_from_slice(&insn.k.to_le_bytes());
            }
        }
        OptionValue::Hash(h) => {
            out.push(h.algorithm.0);
            out.extend_from_slice(&h.digest);
        }
        OptionValue::Verdict(PacketVerdict::Hardware(v)) => {
            out.push(VERDICT_TYPE_HW);
            out.extend_from_slice(v);
        }
        OptionValue::Verdict(PacketVerdict::LinuxTc(v)) => {
            out.push(VERDICT_TYPE_LINUX_EBPF_TC);
            out.extend_from_slice(&v.to_le_bytes());
        }
        OptionValue::Verdict(PacketVerdict::LinuxXdp(v)) => {
            out.push(VERDICT_TYPE_LINUX_EBPF_XDP);
            out.extend_from_slice(&v.to_le_bytes());
        }
        OptionValue::Custom(c) => {
            out.extend_from_slice(&c.pen.to_le_bytes());
            match &c.data {
                CustomData::Generic(data) => out.extend_from_slice(data),
                CustomData::Nflx { option_type, value } => {
                    out.extend_from_slice(&option_type.0.to_le_bytes());
                    out.extend_from_slice(value);
                }
            }
        }
    }
}

/// Encode typed options as raw little-endian options, for a block of kind `kind`
///
/// Do-not-copy custom options (codes 19372 and 19373) and empty values are not written.
/// The end-of-options marker is added when the block is fixed.
pub fn encode_options(
    options: &Options,
    kind: BlockKind,
    registry: &Registry,
) -> Vec<PcapNGOption<'static>> {
    let mut raw = Vec::with_capacity(options.len());
    for opt in options {
        let code = opt.code;
        if code == OptionCode::EndOfOpt
            || code == OptionCode::Custom19372
            || code == OptionCode::Custom19373
        {
            continue;
        }
        let size = option_value_size(kind, code, &opt.value, registry);
        if size == 0 {
            continue;
        }
        let mut value = Vec::with_capacity(size as usize);
        match registry.option_handler(kind, code) {
            Some(handler) => (handler.write)(&opt.value, &mut value),
            None => write_option_value(&opt.value, &mut value),
        }
        raw.push(PcapNGOption::new_owned(code, value));
    }
    raw
}

impl<'a> ToVec for SectionHeaderBlock<'a> {
    /// Check and correct all fields: use magic, version and fix lengths fields
    fn fix(&mut self) {
        self.block_type = SHB_MAGIC;
        self.bom = BOM_MAGIC;
        self.major_version = 1;
        self.minor_version = 0;
        fix_options(&mut self.options);
        // fix length
        let length = (28 + options_length(&self.options)) as u32;
        self.block_len1 = length;
        self.block_len2 = length;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.bom),
                le_u16(self.major_version),
                le_u16(self.minor_version),
                le_i64(self.section_len),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for InterfaceDescriptionBlock<'a> {
    /// Check and correct all fields: use magic and fix lengths fields
    fn fix(&mut self) {
        self.block_type = IDB_MAGIC;
        self.reserved = 0;
        fix_options(&mut self.options);
        // fix length
        let length = (20 + options_length(&self.options)) as u32;
        self.block_len1 = length;
        self.block_len2 = length;
    }

    /// Serialize to bytes representation. Do not check values
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u16(self.linktype.0 as u16),
                le_u16(self.reserved),
                le_u32(self.snaplen),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for EnhancedPacketBlock<'a> {
    /// Check and correct all fields: use magic and fix lengths fields
    fn fix(&mut self) {
        self.block_type = EPB_MAGIC;
        fix_options(&mut self.options);
        // fix length
        let length = 32 + align32!(self.data.len()) + options_length(&self.options);
        self.block_len1 = length as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.if_id),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                le_u32(self.caplen),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len() as u32),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for PacketBlock<'a> {
    fn fix(&mut self) {
        self.block_type = PB_MAGIC;
        fix_options(&mut self.options);
        // fix length
        let length = 32 + align32!(self.data.len()) + options_length(&self.options);
        self.block_len1 = length as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u16(self.if_id),
                le_u16(self.drops_count),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                le_u32(self.caplen),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len() as u32),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for SimplePacketBlock<'a> {
    fn fix(&mut self) {
        self.block_type = SPB_MAGIC;
        // fix length
        self.block_len1 = (16 + align32!(self.data.len())) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 16);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len() as u32),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

fn namerecord_le<'a, 'b: 'a, W: Write + 'a>(i: &'b NameRecord) -> impl SerializeFn<W> + 'a {
    tuple((
        le_u16(i.record_type.0),
        le_u16(i.record_value.len() as u16),
        slice(i.record_value),
        padding_for(i.record_value.len() as u32),
    ))
}

/// Length of the encoded records, end marker included
pub(crate) fn namerecords_length(nr: &[NameRecord]) -> usize {
    nr.iter()
        .map(|n| 4 + align32!(n.record_value.len()))
        .sum::<usize>()
        + 4
}

impl<'a> ToVec for NameResolutionBlock<'a> {
    fn fix(&mut self) {
        self.block_type = NRB_MAGIC;
        fix_options(&mut self.options);
        // fix length
        let length = 12 + namerecords_length(&self.nr) + options_length(&self.options);
        self.block_len1 = length as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                many_ref(&self.nr, namerecord_le),
                // end of records
                le_u16(NameRecordType::End.0),
                le_u16(0),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for InterfaceStatisticsBlock<'a> {
    fn fix(&mut self) {
        self.block_type = ISB_MAGIC;
        fix_options(&mut self.options);
        // fix length
        self.block_len1 = (24 + options_length(&self.options)) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.if_id),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for SystemdJournalExportBlock<'a> {
    fn fix(&mut self) {
        self.block_type = SJE_MAGIC;
        // fix length
        self.block_len1 = (12 + align32!(self.data.len())) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 16);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                slice(self.data),
                padding_for(self.data.len() as u32),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for DecryptionSecretsBlock<'a> {
    fn fix(&mut self) {
        self.block_type = DSB_MAGIC;
        fix_options(&mut self.options);
        // fix length
        self.block_len1 =
            (20 + align32!(self.data.len()) + options_length(&self.options)) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 32);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.secrets_type.0),
                le_u32(self.secrets_len),
                slice(self.data),
                padding_for(self.data.len() as u32),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for MetaEventBlock<'a> {
    fn fix(&mut self) {
        // several valid types, keep it
        self.block_len1 = (12 + align32!(self.data.len())) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 16);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                slice(self.data),
                padding_for(self.data.len() as u32),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for CustomBlock<'a> {
    fn fix(&mut self) {
        if self.block_type != DCB_MAGIC && self.block_type != CB_MAGIC {
            self.block_type = CB_MAGIC;
        }
        // fix length
        self.block_len1 = (16 + align32!(self.data.len())) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 16);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.pen),
                slice(self.data),
                padding_for(self.data.len() as u32),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for UnknownBlock<'a> {
    fn fix(&mut self) {
        // do not touch type, it is unknown
        // fix length
        self.block_len1 = (12 + align32!(self.data.len())) as u32;
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::new();
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                slice(self.data),
                padding_for(self.data.len() as u32),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for Block<'a> {
    fn fix(&mut self) {
        match self {
            Block::SectionHeader(b) => b.fix(),
            Block::InterfaceDescription(b) => b.fix(),
            Block::EnhancedPacket(b) => b.fix(),
            Block::SimplePacket(b) => b.fix(),
            Block::Packet(b) => b.fix(),
            Block::NameResolution(b) => b.fix(),
            Block::InterfaceStatistics(b) => b.fix(),
            Block::SystemdJournalExport(b) => b.fix(),
            Block::DecryptionSecrets(b) => b.fix(),
            Block::MetaEvent(b) => b.fix(),
            Block::Custom(b) => b.fix(),
            Block::Unknown(b) => b.fix(),
        }
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        match self {
            Block::SectionHeader(b) => b.to_vec_raw(),
            Block::InterfaceDescription(b) => b.to_vec_raw(),
            Block::EnhancedPacket(b) => b.to_vec_raw(),
            Block::SimplePacket(b) => b.to_vec_raw(),
            Block::Packet(b) => b.to_vec_raw(),
            Block::NameResolution(b) => b.to_vec_raw(),
            Block::InterfaceStatistics(b) => b.to_vec_raw(),
            Block::SystemdJournalExport(b) => b.to_vec_raw(),
            Block::DecryptionSecrets(b) => b.to_vec_raw(),
            Block::MetaEvent(b) => b.to_vec_raw(),
            Block::Custom(b) => b.to_vec_raw(),
            Block::Unknown(b) => b.to_vec_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::net::Ipv4Addr;

    use hex_literal::hex;

    use crate::pcapng::*;
    use crate::serialize::{encode_options, ToVec};
    use crate::Linktype;

    const SHB_LE: &[u8] = &hex!(
        "
0A 0D 0D 0A 1C 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF FF FF FF FF 1C 00 00 00"
    );
    // EPB, 5 bytes of data, comment "abc"
    const EPB_WITH_COMMENT: &[u8] = &hex!(
        "
06 00 00 00 34 00 00 00 00 00 00 00 00 00 00 00
00 00 00 00 05 00 00 00 05 00 00 00 01 02 03 04
05 00 00 00 01 00 03 00 61 62 63 00 00 00 00 00
34 00 00 00"
    );
    // DSB, TLS key log "keys\n", no options
    const DSB_LE: &[u8] = &hex!(
        "
0A 00 00 00 1C 00 00 00 4B 53 4C 54 05 00 00 00
6B 65 79 73 0A 00 00 00 1C 00 00 00"
    );

    fn frame_should_not_be_fixed(frame: &[u8]) {
        let (rem, mut pkt) = parse_block_le(frame).expect("packet parsing failed");
        assert!(rem.is_empty());
        assert_eq!(pkt.to_vec().unwrap(), frame);
    }

    #[test]
    fn test_shb_not_fixed() {
        frame_should_not_be_fixed(SHB_LE);
    }
    #[test]
    fn test_epb_not_fixed() {
        frame_should_not_be_fixed(EPB_WITH_COMMENT);
    }
    #[test]
    fn test_dsb_not_fixed() {
        frame_should_not_be_fixed(DSB_LE);
    }

    #[test]
    fn test_serialize_shb_fix() {
        let mut shb = SectionHeaderBlock {
            block_type: 0,
            block_len1: 0,
            bom: 0,
            major_version: 0,
            minor_version: 0,
            section_len: -1,
            options: vec![
                // Unaligned option length
                PcapNGOption {
                    code: OptionCode::ShbUserAppl,
                    len: 5,
                    value: Cow::Borrowed(b"meows"),
                },
                // Missing endofopt
            ],
            block_len2: 0,
        };
        let v = shb.to_vec().expect("serialize");
        assert_eq!(v.len(), 28 + 12 + 4);
        let (rem, shb) = parse_sectionheaderblock_le(&v).expect("parse");
        assert!(rem.is_empty());
        assert_eq!(shb.options.len(), 1);
        assert_eq!(shb.options[0].value(), b"meows");
    }

    #[test]
    fn test_serialize_nrb() {
        let value = hex!("0A 00 00 01 61 00");
        let mut nrb = NameResolutionBlock {
            block_type: 0,
            block_len1: 0,
            nr: vec![NameRecord {
                record_type: NameRecordType::Ipv4,
                record_value: &value,
            }],
            options: Vec::new(),
            block_len2: 0,
        };
        let v = nrb.to_vec().expect("serialize");
        assert_eq!(v.len(), 12 + 4 + 8 + 4);
        let (rem, nrb) = parse_nameresolutionblock_le(&v).expect("parse");
        assert!(rem.is_empty());
        let nr = NameResolution::from_block(&nrb, &Registry::new()).expect("decode");
        assert_eq!(nr.ipv4[0].address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(nr.ipv4[0].names, vec!["a".to_string()]);
    }

    #[test]
    fn typed_options_keep_code_and_value() {
        let registry = Registry::new();
        let mut options = Options::new();
        options.push(OptionCode::IfName, OptionValue::String("eth0".to_string()));
        options.push(
            OptionCode::IfIpv4Addr,
            OptionValue::Ipv4Interface(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(255, 255, 255, 0)),
        );
        options.push(OptionCode::IfTsresol, OptionValue::U8(9));
        options.push(
            OptionCode::IfFilter,
            OptionValue::Filter(CaptureFilter::Bpf(vec![BpfInstruction {
                code: 6,
                jt: 0,
                jf: 0,
                k: 0xffff,
            }])),
        );
        options.push(OptionCode::IfTsoffset, OptionValue::I64(-2));
        options.push(OptionCode::Comment, OptionValue::String("c".to_string()));
        let raw = encode_options(&options, BlockKind::InterfaceDescription, &registry);
        assert_eq!(raw.len(), 6);
        let mut idb = InterfaceDescriptionBlock {
            block_type: IDB_MAGIC,
            block_len1: 0,
            linktype: Linktype::ETHERNET,
            reserved: 0,
            snaplen: 0,
            options: raw,
            block_len2: 0,
        };
        let v = idb.to_vec().expect("serialize");
        let (_, idb) = parse_interfacedescriptionblock_le(&v).expect("parse");
        let ctx = OptionContext::new(BlockKind::InterfaceDescription, false, &registry);
        let decoded = decode_options(&idb.options, &ctx).expect("decode");
        assert_eq!(decoded, options);
    }

    #[test]
    fn do_not_copy_custom_options_are_dropped() {
        let registry = Registry::new();
        let custom = OptionValue::Custom(CustomOption {
            pen: 12345,
            data: CustomData::Generic(vec![1, 2, 3]),
        });
        let mut options = Options::new();
        options.push(OptionCode::Custom2989, custom.clone());
        options.push(OptionCode::Custom19373, custom);
        options.push(OptionCode::Comment, OptionValue::String(String::new()));
        let raw = encode_options(&options, BlockKind::Packet, &registry);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].code, OptionCode::Custom2989);
        assert_eq!(raw[0].value(), &hex!("39 30 00 00 01 02 03"));
        assert_eq!(raw[0].to_vec_raw().expect("serialize").len(), 12);
    }
}
