use std::io::{Read, Seek, SeekFrom};

use rusticata_macros::align32;
use tracing::debug;

use crate::error::PcapError;
use crate::linktype::Linktype;
use crate::pcapng::*;
use crate::traits::{PcapNGPacketBlock, PcapReaderIterator};

/// Default size of the buffer of a capture reader
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// Configuration of a [`CaptureReader`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Initial size of the read buffer. It grows on demand, up to `max_block_size`.
    pub buffer_capacity: usize,
    /// Largest block accepted
    pub max_block_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_block_size: MAX_BLOCK_SIZE as usize,
        }
    }
}

/// Metadata accumulated while reading, kept for the lifetime of the reader
///
/// Entries are stored in file order, so they can be written again when dumping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureTables {
    pub name_resolutions: Vec<NameResolution>,
    pub decryption_secrets: Vec<DecryptionSecrets>,
    pub meta_events: Vec<MetaEvent>,
    pub journal_entries: Vec<JournalEntry>,
}

/// A network packet, with the information of its interface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    /// Index of the interface in its section. `None` when writing means "find or create a
    /// matching interface".
    pub interface_id: Option<u32>,
    /// Absolute timestamp. Simple Packet Blocks have none.
    pub timestamp: Option<Timestamp>,
    pub tsprec: TsPrecision,
    pub orig_len: u32,
    pub linktype: Linktype,
    /// Captured bytes, without padding
    pub data: Vec<u8>,
    /// Length of the frame check sequence, in bits
    pub fcs_len: Option<u32>,
    pub options: Options,
}

impl PacketRecord {
    /// Create a record for a complete packet, with no interface, timestamp or options
    pub fn new(linktype: Linktype, data: Vec<u8>) -> Self {
        PacketRecord {
            interface_id: None,
            timestamp: None,
            tsprec: TsPrecision::USEC,
            orig_len: data.len() as u32,
            linktype,
            data,
            fcs_len: None,
            options: Options::new(),
        }
    }

    /// Number of captured bytes
    #[inline]
    pub fn caplen(&self) -> u32 {
        self.data.len() as u32
    }
}

/// Content of a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    Packet(PacketRecord),
    Custom(CustomRecord),
    /// Block decoded by a handler of the registry
    Extension(ExtensionRecord),
}

/// A block visible to the caller, with its location in the file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Index of the section containing the block
    pub section_number: usize,
    /// File offset of the first byte of the block
    pub offset: u64,
    pub data: RecordData,
}

/// Sections, interfaces and tables built from the internal blocks
#[derive(Debug, Default)]
struct ReaderState {
    sections: Vec<Section>,
    tables: CaptureTables,
    file_encap: PerFile<Linktype>,
    file_tsprec: PerFile<TsPrecision>,
}

impl ReaderState {
    fn current_section(&mut self) -> Result<&mut Section, PcapError<&'static [u8]>> {
        self.sections
            .last_mut()
            .ok_or_else(|| PcapError::Internal("block read before any section header".to_string()))
    }

    /// Fold an internal block into the state, or convert a record
    fn handle_block(
        &mut self,
        block: &Block,
        offset: u64,
        registry: &Registry,
    ) -> Result<Option<RecordData>, PcapError<&'static [u8]>> {
        match block {
            Block::SectionHeader(shb) => {
                let number = self.sections.len();
                let section = Section::from_shb(shb, number, offset, registry)?;
                debug!(
                    number,
                    offset,
                    big_endian = section.big_endian,
                    "new section"
                );
                self.sections.push(section);
            }
            Block::InterfaceDescription(idb) => {
                let interface = Interface::from_idb(idb, registry)?;
                self.file_encap.merge(interface.linktype);
                self.file_tsprec.merge(interface.tsprecision);
                self.current_section()?.interfaces.push(interface);
            }
            Block::NameResolution(nrb) => {
                let nr = NameResolution::from_block(nrb, registry)?;
                self.tables.name_resolutions.push(nr);
            }
            Block::InterfaceStatistics(isb) => {
                let stats = InterfaceStatistics::from_block(isb, registry)?;
                let section = self.current_section()?;
                match section.interfaces.get_mut(stats.interface_id as usize) {
                    Some(interface) => interface.statistics.push(stats),
                    None => debug!(
                        if_id = stats.interface_id,
                        "ISB for an unknown interface, ignored"
                    ),
                }
            }
            Block::SystemdJournalExport(sje) => {
                self.tables.journal_entries.push(JournalEntry::from(sje));
                self.file_encap.set_per_packet_if_unknown();
            }
            Block::DecryptionSecrets(dsb) => {
                self.tables
                    .decryption_secrets
                    .push(DecryptionSecrets::from(dsb));
            }
            Block::MetaEvent(mev) => {
                self.tables.meta_events.push(MetaEvent::from(mev));
            }
            _ => {
                let section = self.current_section()?;
                return record_data(section, block, registry);
            }
        }
        Ok(None)
    }
}

fn interface_for(section: &Section, if_id: u32) -> Result<&Interface, PcapError<&'static [u8]>> {
    section.interface(if_id).ok_or_else(|| {
        PcapError::BadFile(format!(
            "packet references interface {}, but only {} interfaces are known",
            if_id,
            section.interfaces.len()
        ))
    })
}

fn check_caplen(interface: &Interface, caplen: u32) -> Result<(), PcapError<&'static [u8]>> {
    let max = interface.linktype.max_snaplen();
    if caplen > max {
        return Err(PcapError::BadFile(format!(
            "packet has captured length {}, larger than the maximum {} for link type {}",
            caplen, max, interface.linktype
        )));
    }
    Ok(())
}

fn packet_options(
    raw: &[PcapNGOption],
    big_endian: bool,
    registry: &Registry,
) -> Result<Options, PcapError<&'static [u8]>> {
    let ctx = OptionContext::new(BlockKind::Packet, big_endian, registry);
    decode_options(raw, &ctx)
}

/// Convert a block visible to the caller, given the section it belongs to
///
/// Returns `None` for internal blocks, and for unknown blocks without a handler.
fn record_data(
    section: &Section,
    block: &Block,
    registry: &Registry,
) -> Result<Option<RecordData>, PcapError<&'static [u8]>> {
    let data = match block {
        Block::EnhancedPacket(epb) => {
            let interface = interface_for(section, epb.if_id)?;
            check_caplen(interface, epb.caplen)?;
            let options = packet_options(&epb.options, epb.big_endian(), registry)?;
            let fcs_len = options
                .get_u32(OptionCode::EpbFlags)
                .and_then(fcs_len_from_flags)
                .or(interface.fcs_len);
            RecordData::Packet(PacketRecord {
                interface_id: Some(epb.if_id),
                timestamp: Some(Timestamp::from_ticks(
                    epb.ticks(),
                    interface.time_units_per_second,
                    interface.tsoffset,
                )),
                tsprec: interface.tsprecision,
                orig_len: epb.origlen,
                linktype: interface.linktype,
                data: epb.packet_data().to_vec(),
                fcs_len,
                options,
            })
        }
        Block::Packet(pb) => {
            let interface = interface_for(section, u32::from(pb.if_id))?;
            check_caplen(interface, pb.caplen)?;
            let mut options = packet_options(&pb.options, pb.big_endian(), registry)?;
            if let Some(drops) = pb.drops() {
                if options.get(OptionCode::EpbDropCount).is_none() {
                    options.push(OptionCode::EpbDropCount, OptionValue::U64(drops));
                }
            }
            RecordData::Packet(PacketRecord {
                interface_id: Some(u32::from(pb.if_id)),
                timestamp: Some(Timestamp::from_ticks(
                    pb.ticks(),
                    interface.time_units_per_second,
                    interface.tsoffset,
                )),
                tsprec: interface.tsprecision,
                orig_len: pb.origlen,
                linktype: interface.linktype,
                data: pb.packet_data().to_vec(),
                fcs_len: interface.fcs_len,
                options,
            })
        }
        Block::SimplePacket(spb) => {
            let interface = interface_for(section, 0)?;
            let caplen = spb.caplen(interface.snaplen);
            check_caplen(interface, caplen)?;
            let caplen = caplen as usize;
            if align32!(caplen) > spb.data.len() {
                return Err(PcapError::BadFile(format!(
                    "SPB holds {} bytes, not enough for a captured length of {}",
                    spb.data.len(),
                    caplen
                )));
            }
            RecordData::Packet(PacketRecord {
                interface_id: Some(0),
                timestamp: None,
                tsprec: interface.tsprecision,
                orig_len: spb.origlen,
                linktype: interface.linktype,
                data: spb.data[..caplen].to_vec(),
                fcs_len: interface.fcs_len,
                options: Options::new(),
            })
        }
        Block::Custom(cb) => RecordData::Custom(CustomRecord::from_block(cb, registry)?),
        Block::Unknown(ub) => match ub.decode(registry) {
            Some(res) => RecordData::Extension(res?),
            None => {
                debug!(
                    block_type = ub.block_type,
                    block_len = ub.block_len1,
                    "unknown block type, skipped"
                );
                return Ok(None);
            }
        },
        _ => return Ok(None),
    };
    Ok(Some(data))
}

fn read_error(e: std::io::Error) -> PcapError<&'static [u8]> {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        PcapError::UnexpectedEof
    } else {
        PcapError::ReadError
    }
}

/// Read the complete block starting at `offset`
fn read_block_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    big_endian: bool,
    max_block_size: usize,
) -> Result<Vec<u8>, PcapError<&'static [u8]>> {
    reader
        .seek(SeekFrom::Start(offset))
        .or(Err(PcapError::ReadError))?;
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).map_err(read_error)?;
    let len_bytes = [header[4], header[5], header[6], header[7]];
    let block_len = if big_endian {
        u32::from_be_bytes(len_bytes)
    } else {
        u32::from_le_bytes(len_bytes)
    };
    let len = align32!(block_len as usize);
    if len < MIN_BLOCK_SIZE as usize || len > max_block_size {
        return Err(PcapError::BadFile(format!(
            "block at offset {} has invalid length {}",
            offset, block_len
        )));
    }
    let mut buf = vec![0u8; len];
    buf[..8].copy_from_slice(&header);
    reader.read_exact(&mut buf[8..]).map_err(read_error)?;
    Ok(buf)
}

/// Record-level reader for pcapng captures
///
/// The reader keeps track of sections and interfaces, and consumes the blocks that only carry
/// metadata: Section Header, Interface Description, Name Resolution, Interface Statistics,
/// Decryption Secrets, systemd journal export and meta-event blocks. Packets, custom blocks and
/// blocks decoded by a handler of the registry are returned as owned [`Record`] values.
///
/// Opening the reader checks that the data starts with a Section Header Block, and reads all the
/// blocks before the first record, so the interfaces of the first section are known.
///
/// ## Example
///
/// ```rust
/// use pcapng_codec::*;
///
/// # let data: &[u8] = &[
/// #     0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00, 0x00, 0x00, 0x4d, 0x3c, 0x2b, 0x1a,
/// #     0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
/// #     0x1c, 0x00, 0x00, 0x00,
/// # ];
/// let registry = Registry::new();
/// let mut reader = CaptureReader::open(data, &registry).expect("not a pcapng file");
/// loop {
///     match reader.read_next() {
///         Ok(record) => {
///             if let RecordData::Packet(packet) = record.data {
///                 println!("{} bytes of {}", packet.data.len(), packet.linktype);
///             }
///         }
///         Err(PcapError::Eof) => break,
///         Err(e) => panic!("error while reading: {:?}", e),
///     }
/// }
/// assert_eq!(reader.sections().len(), 1);
/// ```
pub struct CaptureReader<'r, R>
where
    R: Read,
{
    blocks: BlockReader<R>,
    registry: &'r Registry,
    state: ReaderState,
    pending: Option<Record>,
    max_block_size: usize,
}

impl<'r, R> CaptureReader<'r, R>
where
    R: Read,
{
    /// Open a capture, with the default configuration
    pub fn open(reader: R, registry: &'r Registry) -> Result<Self, PcapError<&'static [u8]>> {
        Self::with_config(reader, registry, ReaderConfig::default())
    }

    /// Open a capture
    ///
    /// Returns `NotThisFormat` if the data does not start with a Section Header Block.
    pub fn with_config(
        reader: R,
        registry: &'r Registry,
        config: ReaderConfig,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let mut blocks = BlockReader::new(config.buffer_capacity, reader)?
            .with_max_block_size(config.max_block_size);
        blocks.fill_at_least(12)?;
        if blocks.data().len() < 12 || blocks.peek_block_type() != Some(SHB_MAGIC) {
            return Err(PcapError::NotThisFormat);
        }
        let mut capture = CaptureReader {
            blocks,
            registry,
            state: ReaderState::default(),
            pending: None,
            max_block_size: config.max_block_size,
        };
        capture.pending = capture.read_until_record()?;
        Ok(capture)
    }

    /// Read blocks until a record is found. Returns `None` at the end of the data.
    fn read_until_record(&mut self) -> Result<Option<Record>, PcapError<&'static [u8]>> {
        loop {
            let offset = self.blocks.consumed() as u64;
            match self.blocks.next() {
                Ok((len, block)) => {
                    let res = self.state.handle_block(&block, offset, self.registry);
                    self.blocks.consume(len);
                    if let Some(data) = res? {
                        let section_number = self.state.sections.len().saturating_sub(1);
                        return Ok(Some(Record {
                            section_number,
                            offset,
                            data,
                        }));
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    self.blocks.refill().map_err(|e| e.to_owned_vec())?;
                }
                Err(PcapError::BufferTooSmall) => self.blocks.grow_for_next_block()?,
                Err(PcapError::NotThisFormat) if self.state.sections.is_empty() => {
                    return Err(PcapError::NotThisFormat)
                }
                Err(PcapError::NotThisFormat) => {
                    return Err(PcapError::BadFile(format!(
                        "section header at offset {} has an unknown byte-order magic",
                        offset
                    )))
                }
                Err(e) => return Err(e.to_owned_vec()),
            }
        }
    }

    /// Read the next record
    ///
    /// Returns `Err(PcapError::Eof)` when all blocks have been read.
    pub fn read_next(&mut self) -> Result<Record, PcapError<&'static [u8]>> {
        if let Some(record) = self.pending.take() {
            return Ok(record);
        }
        self.read_until_record()?.ok_or(PcapError::Eof)
    }

    /// Sections read so far
    pub fn sections(&self) -> &[Section] {
        &self.state.sections
    }

    /// The section of the last block read
    pub fn current_section(&self) -> Option<&Section> {
        self.state.sections.last()
    }

    /// Name resolution, decryption secrets and other metadata read so far
    pub fn tables(&self) -> &CaptureTables {
        &self.state.tables
    }

    /// Link type shared by all interfaces read so far
    pub fn file_encap(&self) -> PerFile<Linktype> {
        self.state.file_encap
    }

    /// Timestamp precision shared by all interfaces read so far
    pub fn file_tsprec(&self) -> PerFile<TsPrecision> {
        self.state.file_tsprec
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Close the capture, returning the underlying reader
    pub fn close(self) -> R {
        self.blocks.into_inner()
    }
}

impl<'r, R> CaptureReader<'r, R>
where
    R: Read + Seek,
{
    /// Read the record starting at `offset`
    ///
    /// The block is decoded using the section containing `offset`, and the interfaces known
    /// for this section. Sequential reading is not affected.
    pub fn seek_read(&mut self, offset: u64) -> Result<Record, PcapError<&'static [u8]>> {
        let idx = find_section(&self.state.sections, offset)
            .ok_or_else(|| PcapError::BadFile(format!("no section before offset {}", offset)))?;
        let big_endian = self.state.sections[idx].big_endian;
        let max_block_size = self.max_block_size;
        let inner = self.blocks.inner_mut();
        let saved = inner.stream_position().or(Err(PcapError::ReadError))?;
        let res = read_block_at(inner, offset, big_endian, max_block_size);
        inner
            .seek(SeekFrom::Start(saved))
            .or(Err(PcapError::ReadError))?;
        let buf = res?;
        let block = match parse_block(&buf, big_endian) {
            Ok((_, block)) => block,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e.to_owned_vec()),
            Err(nom::Err::Incomplete(_)) => {
                return Err(PcapError::BadFile(format!(
                    "block at offset {} is truncated",
                    offset
                )))
            }
        };
        let section = &self.state.sections[idx];
        match record_data(section, &block, self.registry)? {
            Some(data) => Ok(Record {
                section_number: section.number,
                offset,
                data,
            }),
            None => Err(PcapError::BadFile(format!(
                "block at offset {} is not a record",
                offset
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    const SHB_LE: &[u8] = &hex!(
        "
0A 0D 0D 0A 1C 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF FF FF FF FF 1C 00 00 00"
    );
    // ETHERNET, snaplen 4
    const IDB_LE: &[u8] = &hex!("01 00 00 00 14 00 00 00 01 00 00 00 04 00 00 00 14 00 00 00");
    // SPB, origlen 6, 4 bytes stored
    const SPB_LE: &[u8] = &hex!("03 00 00 00 14 00 00 00 06 00 00 00 01 02 03 04 14 00 00 00");

    #[test]
    fn spb_captured_length_uses_snaplen() {
        let data = [SHB_LE, IDB_LE, SPB_LE].concat();
        let registry = Registry::new();
        let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
        assert_eq!(reader.sections()[0].interfaces.len(), 1);
        assert_eq!(reader.file_encap(), PerFile::Single(Linktype::ETHERNET));
        let record = reader.read_next().expect("record");
        assert_eq!(record.offset, 48);
        match record.data {
            RecordData::Packet(p) => {
                assert_eq!(p.interface_id, Some(0));
                assert_eq!(p.timestamp, None);
                assert_eq!(p.orig_len, 6);
                assert_eq!(p.data, vec![1, 2, 3, 4]);
            }
            d => panic!("unexpected record {:?}", d),
        }
        assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
    }

    #[test]
    fn not_a_pcapng_file() {
        let registry = Registry::new();
        let res = CaptureReader::open(&IDB_LE[..], &registry);
        assert!(matches!(res, Err(PcapError::NotThisFormat)));
        let res = CaptureReader::open(&SHB_LE[..8], &registry);
        assert!(matches!(res, Err(PcapError::NotThisFormat)));
        let mut bad_magic = SHB_LE.to_vec();
        bad_magic[8] = 0;
        let res = CaptureReader::open(&bad_magic[..], &registry);
        assert!(matches!(res, Err(PcapError::NotThisFormat)));
    }

    #[test]
    fn packet_for_unknown_interface() {
        let data = [SHB_LE, SPB_LE].concat();
        let registry = Registry::new();
        let res = CaptureReader::open(&data[..], &registry);
        assert!(matches!(res, Err(PcapError::BadFile(_))));
    }

    #[test]
    fn second_section_with_bad_magic() {
        let mut second = SHB_LE.to_vec();
        second[8] = 0;
        let data = [SHB_LE, IDB_LE, &second[..]].concat();
        let registry = Registry::new();
        let mut reader = CaptureReader::open(&data[..], &registry);
        let res = match reader {
            Ok(ref mut r) => r.read_next(),
            Err(e) => Err(e),
        };
        assert!(matches!(res, Err(PcapError::BadFile(_))));
    }
}
