use nom::error::{ErrorKind, ParseError};

use crate::linktype::Linktype;

/// Errors raised while reading or writing pcap-ng data
///
/// The type parameter is the parser input. Errors returned by the streaming parsers borrow the
/// input buffer; use [`PcapError::to_owned_vec`] to detach them.
#[derive(Debug, thiserror::Error)]
pub enum PcapError<I: Sized> {
    /// No more data to read
    #[error("end of file")]
    Eof,
    /// Read or write error from the underlying stream
    #[error("read/write error on the underlying stream")]
    ReadError,
    /// Need more data. The value is the number of missing bytes, if known
    #[error("incomplete data ({0} bytes missing)")]
    Incomplete(usize),
    /// The stream ended in the middle of a block
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// A single block does not fit in the reader buffer
    #[error("buffer too small to hold a block")]
    BufferTooSmall,

    /// The data does not start with a Section Header Block
    #[error("not a pcap-ng file")]
    NotThisFormat,
    /// The file is structurally invalid
    #[error("bad file: {0}")]
    BadFile(String),
    /// The value is recognized but cannot be handled
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// An internal invariant was broken
    #[error("internal error: {0}")]
    Internal(String),

    /// The record is larger than the maximum size for its encapsulation
    #[error("packet too large ({0} bytes)")]
    PacketTooLarge(u32),
    /// The encapsulation has no pcap-ng link type
    #[error("link type {0} cannot be written")]
    UnwritableEncap(Linktype),
    /// The record kind cannot be written
    #[error("record cannot be written")]
    UnwritableRecord,

    /// Nom parser error
    #[error("nom error: {1:?}")]
    NomError(I, ErrorKind),
    /// Nom parser error, with a copy of the input
    #[error("nom error: {1:?}")]
    OwnedNomError(Vec<u8>, ErrorKind),
}

impl<I> PcapError<I> {
    /// Creates a `BadFile` error from any message
    pub fn bad_file<S: Into<String>>(msg: S) -> Self {
        PcapError::BadFile(msg.into())
    }

    /// Creates an `Unsupported` error from any message
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        PcapError::Unsupported(msg.into())
    }
}

impl<I> PcapError<I>
where
    I: AsRef<[u8]> + Sized,
{
    /// Creates a `PcapError` by converting borrowed input references to an owned `Vec<u8>`
    pub fn to_owned_vec(&self) -> PcapError<&'static [u8]> {
        match self {
            PcapError::Eof => PcapError::Eof,
            PcapError::ReadError => PcapError::ReadError,
            PcapError::Incomplete(n) => PcapError::Incomplete(*n),
            PcapError::UnexpectedEof => PcapError::UnexpectedEof,
            PcapError::BufferTooSmall => PcapError::BufferTooSmall,
            PcapError::NotThisFormat => PcapError::NotThisFormat,
            PcapError::BadFile(s) => PcapError::BadFile(s.clone()),
            PcapError::Unsupported(s) => PcapError::Unsupported(s.clone()),
            PcapError::Internal(s) => PcapError::Internal(s.clone()),
            PcapError::PacketTooLarge(n) => PcapError::PacketTooLarge(*n),
            PcapError::UnwritableEncap(l) => PcapError::UnwritableEncap(*l),
            PcapError::UnwritableRecord => PcapError::UnwritableRecord,
            PcapError::NomError(i, e) => PcapError::OwnedNomError(i.as_ref().to_vec(), *e),
            PcapError::OwnedNomError(v, e) => PcapError::OwnedNomError(v.clone(), *e),
        }
    }
}

impl<I> ParseError<I> for PcapError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(input, kind)
    }
    fn append(input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(input, kind)
    }
}
