use crate::PcapError;

use super::*;

/// A value shared by a whole file, or varying per packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerFile<T> {
    /// No interface seen yet
    Unknown,
    /// Interfaces disagree: the value must be read from each packet
    PerPacket,
    Single(T),
}

impl<T> Default for PerFile<T> {
    fn default() -> Self {
        PerFile::Unknown
    }
}

impl<T: Copy + PartialEq> PerFile<T> {
    /// Account for a new interface value
    pub fn merge(&mut self, value: T) {
        *self = match *self {
            PerFile::Unknown => PerFile::Single(value),
            PerFile::Single(v) if v == value => PerFile::Single(v),
            _ => PerFile::PerPacket,
        }
    }

    /// Switch to `PerPacket` if no value is known yet
    pub fn set_per_packet_if_unknown(&mut self) {
        if let PerFile::Unknown = self {
            *self = PerFile::PerPacket;
        }
    }
}

/// A section of a pcap-ng file: its header and the interfaces described so far
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Index of the section in the file, starting at 0
    pub number: usize,
    pub big_endian: bool,
    pub major_version: u16,
    /// Minor version. Version 1.2 is read as 1.0
    pub minor_version: u16,
    /// Section length, if known
    pub section_length: Option<u64>,
    /// Offset of the Section Header Block in the file
    pub offset: u64,
    pub interfaces: Vec<Interface>,
    pub options: Options,
}

impl Section {
    pub fn from_shb(
        shb: &SectionHeaderBlock,
        number: usize,
        offset: u64,
        registry: &Registry,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let ctx = OptionContext::new(BlockKind::SectionHeader, shb.big_endian(), registry);
        let section_length = if shb.section_len < 0 {
            None
        } else {
            Some(shb.section_len as u64)
        };
        Ok(Section {
            number,
            big_endian: shb.big_endian(),
            major_version: shb.major_version,
            minor_version: if shb.minor_version == 2 {
                0
            } else {
                shb.minor_version
            },
            section_length,
            offset,
            interfaces: Vec::new(),
            options: decode_options(&shb.options, &ctx)?,
        })
    }

    pub fn interface(&self, id: u32) -> Option<&Interface> {
        self.interfaces.get(id as usize)
    }

    pub fn hardware(&self) -> Option<&str> {
        self.options.get_str(OptionCode::ShbHardware)
    }

    pub fn os(&self) -> Option<&str> {
        self.options.get_str(OptionCode::ShbOs)
    }

    pub fn user_appl(&self) -> Option<&str> {
        self.options.get_str(OptionCode::ShbUserAppl)
    }
}

/// Find the section containing `offset`: the last one starting at or before it
///
/// `sections` must be sorted by offset.
pub fn find_section(sections: &[Section], offset: u64) -> Option<usize> {
    sections.iter().rposition(|s| s.offset <= offset)
}
