use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::{PcapError, SJE_MAGIC};

use super::*;

/// Minimum size of a journal entry
pub const MIN_JOURNAL_ENTRY_SIZE: usize = 23;

const REALTIME_TIMESTAMP_FIELD: &[u8] = b"__REALTIME_TIMESTAMP=";

#[derive(Debug)]
pub struct SystemdJournalExportBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Journal entry, without the trailing NUL padding
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a> SystemdJournalExportBlock<'a> {
    /// Entry timestamp, from the `__REALTIME_TIMESTAMP` field (microseconds)
    pub fn timestamp(&self) -> Option<Timestamp> {
        journal_timestamp(self.data)
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, SystemdJournalExportBlock<'a>>
    for SystemdJournalExportBlock<'a>
{
    const HDR_SZ: usize = MIN_BLOCK_SIZE as usize + MIN_JOURNAL_ENTRY_SIZE;
    const MAGIC: u32 = SJE_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SystemdJournalExportBlock<'a>, PcapError<&'a [u8]>> {
        let end = i.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        let data = &i[..end];
        if data.len() < MIN_JOURNAL_ENTRY_SIZE {
            return Err(Err::Error(PcapError::BadFile(format!(
                "journal entry of {} bytes is smaller than the minimum {}",
                data.len(),
                MIN_JOURNAL_ENTRY_SIZE
            ))));
        }
        let block = SystemdJournalExportBlock {
            block_type,
            block_len1,
            data,
            block_len2,
        };
        Ok((&i[i.len()..], block))
    }
}

/// Parse a SystemdJournalExport Block (little-endian)
#[inline]
pub fn parse_systemdjournalexportblock_le(
    i: &[u8],
) -> IResult<&[u8], SystemdJournalExportBlock, PcapError<&[u8]>> {
    ng_block_parser::<SystemdJournalExportBlock, PcapLE, _>()(i)
}

/// Parse a SystemdJournalExport Block (big-endian)
#[inline]
pub fn parse_systemdjournalexportblock_be(
    i: &[u8],
) -> IResult<&[u8], SystemdJournalExportBlock, PcapError<&[u8]>> {
    ng_block_parser::<SystemdJournalExportBlock, PcapBE, _>()(i)
}

/// Find the `__REALTIME_TIMESTAMP` field of a journal entry
pub fn journal_timestamp(entry: &[u8]) -> Option<Timestamp> {
    let value = entry
        .split(|&b| b == b'\n')
        .find_map(|line| line.strip_prefix(REALTIME_TIMESTAMP_FIELD))?;
    let digits = value.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let micros: u64 = std::str::from_utf8(&value[..digits]).ok()?.parse().ok()?;
    Some(Timestamp::new(
        (micros / 1_000_000) as i64,
        ((micros % 1_000_000) * 1000) as u32,
    ))
}

/// Journal entry, as kept by the capture reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    pub data: Vec<u8>,
    pub timestamp: Option<Timestamp>,
}

impl<'a> From<&SystemdJournalExportBlock<'a>> for JournalEntry {
    fn from(sje: &SystemdJournalExportBlock<'a>) -> Self {
        JournalEntry {
            data: sje.data.to_vec(),
            timestamp: sje.timestamp(),
        }
    }
}
