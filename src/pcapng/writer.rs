use std::borrow::Cow;
use std::io::{Read, Write};

use cookie_factory::GenError;
use rusticata_macros::align32;
use tracing::debug;

use crate::error::PcapError;
use crate::linktype::{Linktype, MAX_PACKET_SIZE_STANDARD};
use crate::pcapng::*;
use crate::serialize::{encode_options, options_to_vec, ToVec};

/// Section Header options written by a [`CaptureWriter`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionHeader {
    pub hardware: Option<String>,
    pub os: Option<String>,
    pub user_appl: Option<String>,
    pub comments: Vec<String>,
    /// Length of the section, -1 if unknown
    pub section_length: i64,
}

impl Default for SectionHeader {
    fn default() -> Self {
        SectionHeader {
            hardware: None,
            os: None,
            user_appl: None,
            comments: Vec::new(),
            section_length: -1,
        }
    }
}

impl SectionHeader {
    fn options(&self) -> Options {
        let mut options = Options::new();
        for comment in &self.comments {
            options.push(OptionCode::Comment, OptionValue::String(comment.clone()));
        }
        let fields = [
            (OptionCode::ShbHardware, &self.hardware),
            (OptionCode::ShbOs, &self.os),
            (OptionCode::ShbUserAppl, &self.user_appl),
        ];
        for (code, value) in fields.iter() {
            if let Some(s) = value {
                options.push(*code, OptionValue::String(s.clone()));
            }
        }
        options
    }
}

/// Configuration of a [`CaptureWriter`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterConfig {
    /// Largest Name Resolution Block written. Larger tables are split.
    pub max_name_resolution_block_size: usize,
    pub section: SectionHeader,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            max_name_resolution_block_size: NRB_MAX_SIZE as usize,
            section: SectionHeader::default(),
        }
    }
}

/// Returns true if packets of this encapsulation can be written
///
/// Captures without interfaces, and captures with several link types (or a journal) are
/// writable: the link type is checked for each packet.
pub fn can_write_encap(encap: PerFile<Linktype>) -> bool {
    match encap {
        PerFile::Unknown | PerFile::PerPacket => true,
        PerFile::Single(linktype) => linktype.has_wire_code(),
    }
}

/// Number of entries of each table already written
#[derive(Clone, Copy, Debug, Default)]
struct FlushCursor {
    name_resolutions: usize,
    decryption_secrets: usize,
    meta_events: usize,
    journal_entries: usize,
}

fn gen_error(e: GenError) -> PcapError<&'static [u8]> {
    PcapError::Internal(format!("could not serialize block: {:?}", e))
}

/// Output stream, counting the bytes written
struct Sink<W: Write> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> Sink<W> {
    fn write_block<B: ToVec>(&mut self, block: &mut B) -> Result<(), PcapError<&'static [u8]>> {
        let v = block.to_vec().map_err(gen_error)?;
        self.writer.write_all(&v).or(Err(PcapError::ReadError))?;
        self.bytes_written += v.len() as u64;
        Ok(())
    }
}

/// Record-level writer for pcapng captures
///
/// Blocks are always written little-endian, in a single section. The writer keeps the list of
/// interfaces and the metadata tables (name resolution, decryption secrets, meta-events, journal
/// entries). New table entries are written just before the next record, interface statistics
/// are written by [`finish`](CaptureWriter::finish).
///
/// ## Example
///
/// ```rust
/// use pcapng_codec::*;
///
/// let registry = Registry::new();
/// let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
/// let mut writer = CaptureWriter::open(Vec::new(), &registry, interfaces).expect("open");
/// let mut packet = PacketRecord::new(Linktype::ETHERNET, vec![0u8; 60]);
/// packet.timestamp = Some(Timestamp::new(1_600_000_000, 500_000_000));
/// writer.write_packet(&packet).expect("write");
/// let data = writer.finish().expect("finish");
///
/// let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
/// let record = reader.read_next().expect("record");
/// assert!(matches!(record.data, RecordData::Packet(_)));
/// ```
pub struct CaptureWriter<'r, W>
where
    W: Write,
{
    sink: Sink<W>,
    registry: &'r Registry,
    config: WriterConfig,
    interfaces: Vec<Interface>,
    tables: CaptureTables,
    flushed: FlushCursor,
    /// Interface ids in this capture of the interfaces of each section copied from a reader
    section_interfaces: Vec<Vec<u32>>,
}

impl<'r, W> CaptureWriter<'r, W>
where
    W: Write,
{
    /// Start a capture with the default configuration
    pub fn open(
        writer: W,
        registry: &'r Registry,
        interfaces: Vec<Interface>,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        Self::with_config(
            writer,
            registry,
            WriterConfig::default(),
            interfaces,
            CaptureTables::default(),
        )
    }

    /// Start a capture
    ///
    /// Writes the Section Header Block, then an Interface Description Block for each interface,
    /// then the decryption secrets of `tables`. Other table entries are written before the first
    /// record.
    pub fn with_config(
        writer: W,
        registry: &'r Registry,
        config: WriterConfig,
        interfaces: Vec<Interface>,
        tables: CaptureTables,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let mut capture = CaptureWriter {
            sink: Sink {
                writer,
                bytes_written: 0,
            },
            registry,
            config,
            interfaces: Vec::with_capacity(interfaces.len()),
            tables,
            flushed: FlushCursor::default(),
            section_interfaces: Vec::new(),
        };
        capture.write_section_header()?;
        for interface in interfaces {
            capture.add_interface(interface)?;
        }
        capture.flush_decryption_secrets()?;
        Ok(capture)
    }

    /// Start a capture copying a reader: section header options of the current section, the
    /// interfaces of all sections read so far, and tables
    ///
    /// Interfaces of every section are merged. Records must be written with
    /// [`write_record`](CaptureWriter::write_record), which maps their interface ids, after
    /// calling [`sync_interfaces`](CaptureWriter::sync_interfaces).
    pub fn for_reader<R: Read>(
        writer: W,
        reader: &CaptureReader<'r, R>,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let mut config = WriterConfig::default();
        if let Some(section) = reader.current_section() {
            config.section = SectionHeader {
                hardware: section.hardware().map(str::to_string),
                os: section.os().map(str::to_string),
                user_appl: section.user_appl().map(str::to_string),
                comments: section.options.comments().map(str::to_string).collect(),
                section_length: -1,
            };
        }
        let mut interfaces = Vec::new();
        let mut section_interfaces = Vec::new();
        for section in reader.sections() {
            let first = interfaces.len() as u32;
            let ids: Vec<u32> = (first..first + section.interfaces.len() as u32).collect();
            section_interfaces.push(ids);
            interfaces.extend(section.interfaces.iter().cloned());
        }
        let mut capture = Self::with_config(
            writer,
            reader.registry(),
            config,
            interfaces,
            reader.tables().clone(),
        )?;
        capture.section_interfaces = section_interfaces;
        Ok(capture)
    }

    fn write_section_header(&mut self) -> Result<(), PcapError<&'static [u8]>> {
        let options = encode_options(
            &self.config.section.options(),
            BlockKind::SectionHeader,
            self.registry,
        );
        let mut shb = SectionHeaderBlock {
            block_type: SHB_MAGIC,
            block_len1: 0,
            bom: BOM_MAGIC,
            major_version: 1,
            minor_version: 0,
            section_len: self.config.section.section_length,
            options,
            block_len2: 0,
        };
        self.sink.write_block(&mut shb)
    }

    /// Interfaces defined so far. The index in this list is the interface id in the file.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Number of bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written
    }

    /// Add an interface, and write its description immediately. Returns the interface id.
    pub fn add_interface(&mut self, interface: Interface) -> Result<u32, PcapError<&'static [u8]>> {
        if !interface.linktype.has_wire_code() {
            return Err(PcapError::UnwritableEncap(interface.linktype));
        }
        let mut options = interface.options.clone();
        options.remove(OptionCode::IfTsoffset);
        options.remove(OptionCode::IfTsresol);
        let tsresol = interface.tsresol();
        if tsresol != DEFAULT_TSRESOL {
            options.push(OptionCode::IfTsresol, OptionValue::U8(tsresol));
        }
        if let Some(bits) = interface.fcs_len {
            if options.get(OptionCode::IfFcslen).is_none() && bits / 8 <= u32::from(u8::MAX) {
                options.push(OptionCode::IfFcslen, OptionValue::U8((bits / 8) as u8));
            }
        }
        let mut idb = InterfaceDescriptionBlock {
            block_type: IDB_MAGIC,
            block_len1: 0,
            linktype: interface.linktype,
            reserved: 0,
            snaplen: interface.snaplen,
            options: encode_options(&options, BlockKind::InterfaceDescription, self.registry),
            block_len2: 0,
        };
        self.sink.write_block(&mut idb)?;
        let id = self.interfaces.len() as u32;
        debug!(id, linktype = interface.linktype.0, "interface added");
        self.interfaces.push(interface);
        Ok(id)
    }

    /// Queue name resolution entries, written before the next record
    pub fn add_name_resolution(&mut self, nr: NameResolution) {
        self.tables.name_resolutions.push(nr);
    }

    /// Queue decryption secrets, written before the next record
    pub fn add_decryption_secrets(&mut self, secrets: DecryptionSecrets) {
        self.tables.decryption_secrets.push(secrets);
    }

    /// Queue a meta-event, written before the next record
    pub fn add_meta_event(&mut self, event: MetaEvent) {
        self.tables.meta_events.push(event);
    }

    /// Queue a journal entry, written before the next record
    pub fn add_journal_entry(&mut self, entry: JournalEntry) {
        self.tables.journal_entries.push(entry);
    }

    /// Queue the entries of `tables` not known yet
    ///
    /// `tables` must be a superset of the tables of this writer, for ex the tables of the reader
    /// given to [`for_reader`](CaptureWriter::for_reader), after more blocks have been read.
    pub fn sync_tables(&mut self, tables: &CaptureTables) {
        fn extend<T: Clone>(dst: &mut Vec<T>, src: &[T]) {
            if src.len() > dst.len() {
                dst.extend_from_slice(&src[dst.len()..]);
            }
        }
        extend(&mut self.tables.name_resolutions, &tables.name_resolutions);
        extend(&mut self.tables.decryption_secrets, &tables.decryption_secrets);
        extend(&mut self.tables.meta_events, &tables.meta_events);
        extend(&mut self.tables.journal_entries, &tables.journal_entries);
    }

    /// Add the interfaces of `sections` not known yet, and copy new interface statistics
    ///
    /// `sections` are the sections of the reader given to
    /// [`for_reader`](CaptureWriter::for_reader), after more blocks have been read.
    pub fn sync_interfaces(&mut self, sections: &[Section]) -> Result<(), PcapError<&'static [u8]>> {
        for (number, section) in sections.iter().enumerate() {
            if self.section_interfaces.len() <= number {
                self.section_interfaces.push(Vec::new());
            }
            for (local, interface) in section.interfaces.iter().enumerate() {
                match self.section_interfaces[number].get(local) {
                    Some(&id) => {
                        if let Some(dst) = self.interfaces.get_mut(id as usize) {
                            let known = dst.statistics.len();
                            if interface.statistics.len() > known {
                                dst.statistics
                                    .extend_from_slice(&interface.statistics[known..]);
                            }
                        }
                    }
                    None => {
                        let id = self.add_interface(interface.clone())?;
                        debug!(section = number, local, id, "interface of section mapped");
                        self.section_interfaces[number].push(id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Interface id in this capture of interface `local` of section `section_number`
    ///
    /// Ids are kept unchanged when the writer was not created from a reader.
    fn global_interface_id(
        &self,
        section_number: usize,
        local: u32,
    ) -> Result<u32, PcapError<&'static [u8]>> {
        if self.section_interfaces.is_empty() {
            return Ok(local);
        }
        self.section_interfaces
            .get(section_number)
            .and_then(|ids| ids.get(local as usize))
            .copied()
            .ok_or_else(|| {
                PcapError::Internal(format!(
                    "interface {} of section {} was not added to the writer",
                    local, section_number
                ))
            })
    }

    fn flush_decryption_secrets(&mut self) -> Result<(), PcapError<&'static [u8]>> {
        while self.flushed.decryption_secrets < self.tables.decryption_secrets.len() {
            let secrets = &self.tables.decryption_secrets[self.flushed.decryption_secrets];
            self.flushed.decryption_secrets += 1;
            let mut dsb = DecryptionSecretsBlock {
                block_type: DSB_MAGIC,
                block_len1: 0,
                secrets_type: secrets.secrets_type,
                secrets_len: secrets.data.len() as u32,
                data: &secrets.data,
                options: Vec::new(),
                block_len2: 0,
            };
            self.sink.write_block(&mut dsb)?;
        }
        Ok(())
    }

    /// Write the table entries queued since the last record
    fn flush_tables(&mut self) -> Result<(), PcapError<&'static [u8]>> {
        self.flush_decryption_secrets()?;
        while self.flushed.meta_events < self.tables.meta_events.len() {
            let event = &self.tables.meta_events[self.flushed.meta_events];
            self.flushed.meta_events += 1;
            let mut mev = MetaEventBlock {
                block_type: event.block_type,
                block_len1: 0,
                data: &event.data,
                block_len2: 0,
            };
            self.sink.write_block(&mut mev)?;
        }
        while self.flushed.journal_entries < self.tables.journal_entries.len() {
            let entry = &self.tables.journal_entries[self.flushed.journal_entries];
            self.flushed.journal_entries += 1;
            if entry.data.len() > MAX_PACKET_SIZE_STANDARD as usize {
                return Err(PcapError::PacketTooLarge(entry.data.len() as u32));
            }
            let mut sje = SystemdJournalExportBlock {
                block_type: SJE_MAGIC,
                block_len1: 0,
                data: &entry.data,
                block_len2: 0,
            };
            self.sink.write_block(&mut sje)?;
        }
        while self.flushed.name_resolutions < self.tables.name_resolutions.len() {
            let nr = &self.tables.name_resolutions[self.flushed.name_resolutions];
            self.flushed.name_resolutions += 1;
            write_name_resolution(
                &mut self.sink,
                nr,
                self.config.max_name_resolution_block_size,
                self.registry,
            )?;
        }
        Ok(())
    }

    /// Find an interface for a packet without interface id, or create one
    fn interface_for_packet(
        &mut self,
        packet: &PacketRecord,
    ) -> Result<u32, PcapError<&'static [u8]>> {
        let found = self.interfaces.iter().position(|interface| {
            interface.linktype == packet.linktype
                && (packet.timestamp.is_none() || interface.tsprecision == packet.tsprec)
        });
        match found {
            Some(id) => Ok(id as u32),
            None => {
                let interface = Interface::new(packet.linktype, 0).with_precision(packet.tsprec);
                self.add_interface(interface)
            }
        }
    }

    /// Write a record returned by a reader
    ///
    /// The interface id of a packet is relative to its section, and is mapped to the interface
    /// id in this capture.
    pub fn write_record(&mut self, record: &Record) -> Result<(), PcapError<&'static [u8]>> {
        match &record.data {
            RecordData::Packet(packet) => {
                let if_id = match packet.interface_id {
                    Some(local) => Some(self.global_interface_id(record.section_number, local)?),
                    None => None,
                };
                self.write_packet_to(packet, if_id)
            }
            RecordData::Custom(custom) => self.write_custom(custom),
            RecordData::Extension(ext) => self.write_extension(ext),
        }
    }

    /// Write a packet, as a Simple Packet Block if possible, else as an Enhanced Packet Block
    ///
    /// Returns `PacketTooLarge` or `UnwritableEncap` if the packet cannot be stored. The capture
    /// is still valid, and the next packets can be written.
    pub fn write_packet(&mut self, packet: &PacketRecord) -> Result<(), PcapError<&'static [u8]>> {
        self.write_packet_to(packet, packet.interface_id)
    }

    fn write_packet_to(
        &mut self,
        packet: &PacketRecord,
        interface_id: Option<u32>,
    ) -> Result<(), PcapError<&'static [u8]>> {
        let caplen = packet.caplen();
        if caplen > packet.linktype.max_snaplen() {
            return Err(PcapError::PacketTooLarge(caplen));
        }
        if !packet.linktype.has_wire_code() {
            return Err(PcapError::UnwritableEncap(packet.linktype));
        }
        self.flush_tables()?;
        let if_id = match interface_id {
            Some(id) if (id as usize) < self.interfaces.len() => id,
            Some(id) => {
                return Err(PcapError::Internal(format!(
                    "packet references interface {}, but only {} interfaces are defined",
                    id,
                    self.interfaces.len()
                )))
            }
            None => self.interface_for_packet(packet)?,
        };
        let interface = &self.interfaces[if_id as usize];
        let fits_spb = packet.timestamp.is_none()
            && if_id == 0
            && caplen == packet.orig_len
            && packet.options.is_empty()
            && (packet.fcs_len.is_none() || packet.fcs_len == interface.fcs_len)
            && (interface.snaplen == 0 || packet.orig_len <= interface.snaplen);
        if fits_spb {
            let mut spb = SimplePacketBlock {
                block_type: SPB_MAGIC,
                block_len1: 0,
                origlen: packet.orig_len,
                data: &packet.data,
                block_len2: 0,
            };
            return self.sink.write_block(&mut spb);
        }
        let ticks = match packet.timestamp {
            Some(ts) => ts.to_ticks(interface.time_units_per_second).ok_or_else(|| {
                PcapError::Unsupported(format!(
                    "timestamp {}.{:09} cannot be stored as a tick count",
                    ts.secs, ts.nsecs
                ))
            })?,
            None => 0,
        };
        let (ts_high, ts_low) = Timestamp::split_ticks(ticks);
        let mut options = packet.options.clone();
        if let Some(bits) = packet.fcs_len {
            if Some(bits) != interface.fcs_len && options.get(OptionCode::EpbFlags).is_none() {
                let octets = (bits / 8) << 16;
                options.push(
                    OptionCode::EpbFlags,
                    OptionValue::U32(octets & EPB_FLAGS_FCS_LEN_MASK),
                );
            }
        }
        let mut epb = EnhancedPacketBlock {
            block_type: EPB_MAGIC,
            block_len1: 0,
            if_id,
            ts_high,
            ts_low,
            caplen,
            origlen: packet.orig_len,
            data: &packet.data,
            options: encode_options(&options, BlockKind::Packet, self.registry),
            block_len2: 0,
        };
        self.sink.write_block(&mut epb)
    }

    /// Write a custom block. Do-not-copy blocks are omitted.
    pub fn write_custom(&mut self, custom: &CustomRecord) -> Result<(), PcapError<&'static [u8]>> {
        if !custom.copy_allowed {
            debug!(pen = custom.pen, "do-not-copy custom block omitted");
            return Ok(());
        }
        let data = match &custom.payload {
            CustomPayload::Generic(data) => {
                if data.len() > MAX_PACKET_SIZE_STANDARD as usize {
                    return Err(PcapError::PacketTooLarge(data.len() as u32));
                }
                Cow::Borrowed(&data[..])
            }
            CustomPayload::NflxEvent { options } => {
                let mut v = NFLX_BLOCK_TYPE_EVENT.to_le_bytes().to_vec();
                v.extend_from_slice(&self.nflx_options(options)?);
                Cow::Owned(v)
            }
            CustomPayload::NflxSkip { skipped, options } => {
                let mut v = NFLX_BLOCK_TYPE_SKIP.to_le_bytes().to_vec();
                v.extend_from_slice(&skipped.to_le_bytes());
                v.extend_from_slice(&self.nflx_options(options)?);
                Cow::Owned(v)
            }
        };
        self.flush_tables()?;
        let mut cb = CustomBlock {
            block_type: CB_MAGIC,
            block_len1: 0,
            pen: custom.pen,
            data: &data,
            block_len2: 0,
            big_endian: false,
        };
        self.sink.write_block(&mut cb)
    }

    fn nflx_options(&self, options: &Options) -> Result<Vec<u8>, PcapError<&'static [u8]>> {
        let raw = encode_options(options, BlockKind::CustomEvent, self.registry);
        options_to_vec(&raw).map_err(gen_error)
    }

    /// Write a block decoded by an extension, using the write callback of its handler
    pub fn write_extension(
        &mut self,
        ext: &ExtensionRecord,
    ) -> Result<(), PcapError<&'static [u8]>> {
        let write = self
            .registry
            .block_handler(ext.block_type)
            .and_then(|handler| handler.write)
            .ok_or(PcapError::UnwritableRecord)?;
        let data = write(ext)?;
        self.flush_tables()?;
        let mut block = UnknownBlock {
            block_type: ext.block_type,
            block_len1: 0,
            data: &data,
            block_len2: 0,
            big_endian: false,
        };
        self.sink.write_block(&mut block)
    }

    /// Write the queued table entries, then the statistics of every interface, and return the
    /// underlying writer
    pub fn finish(mut self) -> Result<W, PcapError<&'static [u8]>> {
        self.flush_tables()?;
        for (if_id, interface) in self.interfaces.iter().enumerate() {
            for stats in &interface.statistics {
                let (ts_high, ts_low) = Timestamp::split_ticks(stats.timestamp);
                let mut isb = InterfaceStatisticsBlock {
                    block_type: ISB_MAGIC,
                    block_len1: 0,
                    if_id: if_id as u32,
                    ts_high,
                    ts_low,
                    options: encode_options(
                        &stats.options,
                        BlockKind::InterfaceStatistics,
                        self.registry,
                    ),
                    block_len2: 0,
                };
                self.sink.write_block(&mut isb)?;
            }
        }
        self.sink.writer.flush().or(Err(PcapError::ReadError))?;
        Ok(self.sink.writer)
    }
}

/// Encode the records of a name resolution table: one record per address and name
fn name_records(nr: &NameResolution) -> Vec<(NameRecordType, Vec<u8>)> {
    let mut records = Vec::new();
    let mut push = |record_type: NameRecordType, addr: &[u8], names: &[String]| {
        let max_name_len = usize::from(u16::MAX) - addr.len() - 1;
        for name in names {
            if name.len() > max_name_len {
                debug!(len = name.len(), "NRB: name too long, dropped");
                continue;
            }
            let mut value = Vec::with_capacity(addr.len() + name.len() + 1);
            value.extend_from_slice(addr);
            value.extend_from_slice(name.as_bytes());
            value.push(0);
            records.push((record_type, value));
        }
    };
    for host in &nr.ipv4 {
        push(NameRecordType::Ipv4, &host.address.octets(), &host.names);
    }
    for host in &nr.ipv6 {
        push(NameRecordType::Ipv6, &host.address.octets(), &host.names);
    }
    records
}

/// Write a name resolution table, split into blocks no larger than `max_size`
///
/// Options are written in the first block.
fn write_name_resolution<W: Write>(
    sink: &mut Sink<W>,
    nr: &NameResolution,
    max_size: usize,
    registry: &Registry,
) -> Result<(), PcapError<&'static [u8]>> {
    let records = name_records(nr);
    let mut options = encode_options(&nr.options, BlockKind::NameResolution, registry);
    if records.is_empty() && options.is_empty() {
        return Ok(());
    }
    let options_len: usize = options.iter().map(|o| align32!(4 + o.value.len())).sum();
    let options_len = if options_len > 0 { options_len + 4 } else { 0 };
    let mut start = 0;
    let mut blocks = 0;
    loop {
        // header, end of records, trailer
        let mut size = 16 + if blocks == 0 { options_len } else { 0 };
        let mut end = start;
        while end < records.len() {
            let record_size = 4 + align32!(records[end].1.len());
            // a single record larger than the limit is written alone
            if size + record_size > max_size && end > start {
                break;
            }
            size += record_size;
            end += 1;
        }
        let mut nrb = NameResolutionBlock {
            block_type: NRB_MAGIC,
            block_len1: 0,
            nr: records[start..end]
                .iter()
                .map(|(record_type, value)| NameRecord {
                    record_type: *record_type,
                    record_value: value,
                })
                .collect(),
            options: std::mem::take(&mut options),
            block_len2: 0,
        };
        sink.write_block(&mut nrb)?;
        blocks += 1;
        start = end;
        if start >= records.len() {
            break;
        }
    }
    if blocks > 1 {
        debug!(blocks, "NRB: name resolution table split");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn read_all(data: &[u8], registry: &Registry) -> Vec<Record> {
        let mut reader = CaptureReader::open(data, registry).expect("open");
        let mut records = Vec::new();
        loop {
            match reader.read_next() {
                Ok(record) => records.push(record),
                Err(PcapError::Eof) => break,
                Err(e) => panic!("error while reading: {:?}", e),
            }
        }
        records
    }

    #[test]
    fn writable_encapsulations() {
        assert!(can_write_encap(PerFile::Unknown));
        assert!(can_write_encap(PerFile::PerPacket));
        assert!(can_write_encap(PerFile::Single(Linktype::ETHERNET)));
        assert!(!can_write_encap(PerFile::Single(Linktype(-1))));
    }

    #[test]
    fn empty_capture() {
        let registry = Registry::new();
        let writer = CaptureWriter::open(Vec::new(), &registry, Vec::new()).expect("open");
        assert_eq!(writer.bytes_written(), 28);
        let data = writer.finish().expect("finish");
        assert_eq!(&data[..4], &[0x0a, 0x0d, 0x0d, 0x0a]);
        assert!(read_all(&data, &registry).is_empty());
    }

    #[test]
    fn generated_interface_is_reused() {
        let registry = Registry::new();
        let mut writer = CaptureWriter::open(Vec::new(), &registry, Vec::new()).expect("open");
        let mut packet = PacketRecord::new(Linktype::RAW, vec![0x45, 0, 0, 20]);
        packet.timestamp = Some(Timestamp::new(10, 1000));
        writer.write_packet(&packet).expect("write");
        writer.write_packet(&packet).expect("write");
        packet.tsprec = TsPrecision::NSEC;
        writer.write_packet(&packet).expect("write");
        assert_eq!(writer.interfaces().len(), 2);
        assert_eq!(writer.interfaces()[1].time_units_per_second, 1_000_000_000);
        let data = writer.finish().expect("finish");
        let records = read_all(&data, &registry);
        assert_eq!(records.len(), 3);
        for (record, if_id) in records.iter().zip([0, 0, 1].iter()) {
            match &record.data {
                RecordData::Packet(p) => {
                    assert_eq!(p.interface_id, Some(*if_id));
                    assert_eq!(p.timestamp, Some(Timestamp::new(10, 1000)));
                }
                d => panic!("unexpected record {:?}", d),
            }
        }
    }

    #[test]
    fn unknown_interface_id() {
        let registry = Registry::new();
        let mut writer = CaptureWriter::open(Vec::new(), &registry, Vec::new()).expect("open");
        let mut packet = PacketRecord::new(Linktype::ETHERNET, vec![0; 14]);
        packet.interface_id = Some(3);
        assert!(matches!(writer.write_packet(&packet), Err(PcapError::Internal(_))));
    }

    #[test]
    fn packet_too_large_is_not_fatal() {
        let registry = Registry::new();
        let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
        let mut writer = CaptureWriter::open(Vec::new(), &registry, interfaces).expect("open");
        let big = PacketRecord::new(Linktype::ETHERNET, vec![0; 262_145]);
        assert!(matches!(
            writer.write_packet(&big),
            Err(PcapError::PacketTooLarge(262_145))
        ));
        let bad = PacketRecord::new(Linktype(0x1_0000), vec![0; 4]);
        assert!(matches!(
            writer.write_packet(&bad),
            Err(PcapError::UnwritableEncap(_))
        ));
        let small = PacketRecord::new(Linktype::ETHERNET, vec![0; 60]);
        writer.write_packet(&small).expect("write");
        let data = writer.finish().expect("finish");
        assert_eq!(read_all(&data, &registry).len(), 1);
    }

    #[test]
    fn fcs_length_needs_enhanced_packet() {
        let registry = Registry::new();
        let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
        let mut writer = CaptureWriter::open(Vec::new(), &registry, interfaces).expect("open");
        let mut packet = PacketRecord::new(Linktype::ETHERNET, vec![0xab; 64]);
        packet.interface_id = Some(0);
        packet.fcs_len = Some(32);
        writer.write_packet(&packet).expect("write");
        let data = writer.finish().expect("finish");
        // SHB (28), IDB (20), then an EPB carrying the FCS length in its flags
        assert_eq!(&data[48..52], &EPB_MAGIC.to_le_bytes());
        let records = read_all(&data, &registry);
        match &records[0].data {
            RecordData::Packet(p) => {
                assert_eq!(p.fcs_len, Some(32));
                assert_eq!(p.data, packet.data);
            }
            d => panic!("unexpected record {:?}", d),
        }
    }

    #[test]
    fn timestamp_before_epoch() {
        let registry = Registry::new();
        let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
        let mut writer = CaptureWriter::open(Vec::new(), &registry, interfaces).expect("open");
        let mut packet = PacketRecord::new(Linktype::ETHERNET, vec![0; 14]);
        packet.timestamp = Some(Timestamp::new(-10, 0));
        assert!(matches!(
            writer.write_packet(&packet),
            Err(PcapError::Unsupported(_))
        ));
        packet.timestamp = Some(Timestamp::new(10, 0));
        writer.write_packet(&packet).expect("write");
        let data = writer.finish().expect("finish");
        assert_eq!(read_all(&data, &registry).len(), 1);
    }

    #[test]
    fn name_resolution_is_split() {
        let registry = Registry::new();
        let config = WriterConfig {
            max_name_resolution_block_size: 64,
            ..WriterConfig::default()
        };
        let mut tables = CaptureTables::default();
        tables.name_resolutions.push(NameResolution {
            ipv4: vec![HostName {
                address: Ipv4Addr::new(10, 0, 0, 1),
                names: (0..6).map(|i| format!("host{}.example", i)).collect(),
            }],
            ipv6: Vec::new(),
            options: Options::new(),
        });
        let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
        let mut writer =
            CaptureWriter::with_config(Vec::new(), &registry, config, interfaces, tables)
                .expect("open");
        writer
            .write_packet(&PacketRecord::new(Linktype::ETHERNET, vec![0; 14]))
            .expect("write");
        let data = writer.finish().expect("finish");
        let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
        // each record is 4 + 20 bytes: two records per block
        let tables = reader.tables().clone();
        assert_eq!(tables.name_resolutions.len(), 3);
        let names: Vec<String> = tables
            .name_resolutions
            .iter()
            .flat_map(|nr| nr.ipv4.iter().flat_map(|h| h.names.clone()))
            .collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[5], "host5.example");
        assert!(reader.read_next().is_ok());
    }

    #[test]
    fn statistics_written_at_finish() {
        let registry = Registry::new();
        let mut interface = Interface::new(Linktype::ETHERNET, 0);
        let mut options = Options::new();
        options.push(OptionCode::IsbIfRecv, OptionValue::U64(12));
        interface.statistics.push(InterfaceStatistics {
            interface_id: 0,
            timestamp: 0x1_0000_0002,
            options,
        });
        let writer = CaptureWriter::open(Vec::new(), &registry, vec![interface]).expect("open");
        let data = writer.finish().expect("finish");
        let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
        assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
        let interface = &reader.sections()[0].interfaces[0];
        assert_eq!(interface.statistics.len(), 1);
        assert_eq!(interface.statistics[0].timestamp, 0x1_0000_0002);
        assert_eq!(interface.statistics[0].received(), Some(12));
    }
}
