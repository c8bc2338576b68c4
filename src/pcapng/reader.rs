use std::io::Read;

use circular::Buffer;
use nom::{Needed, Offset};
use tracing::debug;

use crate::endianness::ByteOrder;
use crate::error::PcapError;
use crate::pcapng::*;
use crate::traits::{BlockResult, PcapReaderIterator};

/// Parsing iterator over pcapng blocks (streaming version)
///
/// ## Block Reader
///
/// This reader is a streaming parser based on a circular buffer, which means memory
/// usage is constant, and that it can be used to parse huge files or infinite streams.
/// It creates an abstraction over any input providing the `Read` trait, and takes care
/// of managing the circular buffer to provide an iterator-like interface.
///
/// The reader only tracks the byte order of the current section: each Section Header Block
/// read by `next` sets the byte order used for the following blocks. Everything else
/// (interfaces, time resolution, etc.) is left to the caller, see
/// [`CaptureReader`](struct.CaptureReader.html) for a reader keeping this state.
///
/// The size of the circular buffer has to be big enough for at least one complete block. Using a
/// larger value (at least 65k) is advised to avoid frequent reads and buffer shifts.
/// When `next` returns `BufferTooSmall`, call
/// [`grow_for_next_block`](struct.BlockReader.html#method.grow_for_next_block).
///
/// **There are precautions to take when reading multiple blocks before consuming data. See
/// [`PcapReaderIterator`] for details.**
///
/// ## Example
///
/// ```rust
/// use pcapng_codec::*;
/// use pcapng_codec::traits::PcapReaderIterator;
///
/// # let data: &[u8] = &[
/// #     0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00, 0x00, 0x00, 0x4d, 0x3c, 0x2b, 0x1a,
/// #     0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
/// #     0x1c, 0x00, 0x00, 0x00,
/// # ];
/// let mut reader = BlockReader::new(65536, data).expect("BlockReader");
/// let mut num_blocks = 0;
/// let mut if_linktypes = Vec::new();
/// loop {
///     match reader.next() {
///         Ok((offset, block)) => {
///             num_blocks += 1;
///             match block {
///                 Block::SectionHeader(_) => {
///                     // starting a new section, clear known interfaces
///                     if_linktypes = Vec::new();
///                 }
///                 Block::InterfaceDescription(ref idb) => {
///                     if_linktypes.push(idb.linktype);
///                 }
///                 _ => (),
///             }
///             reader.consume(offset);
///         }
///         Err(PcapError::Eof) => break,
///         Err(PcapError::Incomplete(_)) => {
///             reader.refill().expect("Could not refill reader");
///         }
///         Err(e) => panic!("error while reading: {:?}", e),
///     }
/// }
/// assert_eq!(num_blocks, 1);
/// ```
pub struct BlockReader<R>
where
    R: Read,
{
    big_endian: bool,
    reader: R,
    buffer: Buffer,
    consumed: usize,
    reader_exhausted: bool,
    max_block_size: usize,
}

impl<R> BlockReader<R>
where
    R: Read,
{
    /// Creates a new `BlockReader<R>` with the provided buffer capacity.
    pub fn new(capacity: usize, reader: R) -> Result<BlockReader<R>, PcapError<&'static [u8]>> {
        let buffer = Buffer::with_capacity(capacity);
        Self::from_buffer(buffer, reader)
    }

    /// Creates a new `BlockReader<R>` using the provided `Buffer`.
    ///
    /// The first read is done immediately. Content is not checked: use
    /// [`CaptureReader`](struct.CaptureReader.html) to reject data which is not a pcapng file.
    pub fn from_buffer(
        mut buffer: Buffer,
        mut reader: R,
    ) -> Result<BlockReader<R>, PcapError<&'static [u8]>> {
        let sz = reader.read(buffer.space()).or(Err(PcapError::ReadError))?;
        buffer.fill(sz);
        Ok(BlockReader {
            big_endian: false,
            reader,
            buffer,
            consumed: 0,
            reader_exhausted: sz == 0,
            max_block_size: MAX_BLOCK_SIZE as usize,
        })
    }

    /// Set the largest block size `grow_for_next_block` will allocate for
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    /// Returns true if the current section is big-endian
    #[inline]
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// Access the underlying reader
    ///
    /// The reader position is ahead of the data already buffered. Callers moving it (for ex.
    /// using `Seek`) must restore it before reading more blocks.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the `BlockReader`, returning the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Type of the next block, if at least 4 bytes are buffered
    pub fn peek_block_type(&self) -> Option<u32> {
        ByteOrder::Section.read_u32(self.big_endian, self.buffer.data().get(..4)?)
    }

    /// Read more data until at least `len` bytes are buffered or the reader is exhausted
    pub fn fill_at_least(&mut self, len: usize) -> Result<(), PcapError<&'static [u8]>> {
        while self.buffer.available_data() < len && !self.reader_exhausted {
            self.refill().map_err(|e| e.to_owned_vec())?;
        }
        Ok(())
    }

    /// Grow the internal buffer so the next block fits, after `next` returned `BufferTooSmall`
    ///
    /// The size of the next block is read from its header. If it is larger than the configured
    /// maximum, return an error.
    pub fn grow_for_next_block(&mut self) -> Result<(), PcapError<&'static [u8]>> {
        let data = self.buffer.data();
        if data.len() < 8 {
            return Err(PcapError::BufferTooSmall);
        }
        // a Section Header Block gives its own byte order
        let big_endian = match ByteOrder::Little.read_u32(false, &data[..4]) {
            Some(SHB_MAGIC) if data.len() >= 12 => {
                ByteOrder::Big.read_u32(false, &data[8..12]) == Some(BOM_MAGIC)
            }
            _ => self.big_endian,
        };
        let block_len = ByteOrder::Section
            .read_u32(big_endian, &data[4..8])
            .ok_or(PcapError::BufferTooSmall)?;
        let needed = rusticata_macros::align32!(block_len as usize);
        if needed > self.max_block_size {
            return Err(PcapError::BadFile(format!(
                "block has length {}, larger than the maximum {}",
                block_len, self.max_block_size
            )));
        }
        let new_size = needed
            .checked_next_power_of_two()
            .unwrap_or(needed)
            .min(self.max_block_size)
            .max(needed);
        debug!(
            capacity = self.buffer.capacity(),
            new_size, "growing block reader buffer"
        );
        self.buffer.shift();
        self.buffer.grow(new_size);
        self.refill().map_err(|e| e.to_owned_vec())
    }
}

impl<R> PcapReaderIterator for BlockReader<R>
where
    R: Read,
{
    fn next(&mut self) -> BlockResult {
        // Return EOF if
        // 1) all bytes have been read
        // 2) no more data is available
        if self.buffer.available_data() == 0
            && (self.buffer.position() == 0 && self.reader_exhausted)
        {
            return Err(PcapError::Eof);
        }
        let data = self.buffer.data();
        match parse_block(data, self.big_endian) {
            Ok((rem, b)) => {
                let offset = data.offset(rem);
                if let Block::SectionHeader(ref shb) = b {
                    self.big_endian = shb.big_endian();
                }
                Ok((offset, b))
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
            Err(nom::Err::Incomplete(n)) => {
                if self.reader_exhausted {
                    // expected more bytes but reader is EOF, truncated file?
                    Err(PcapError::UnexpectedEof)
                } else {
                    match n {
                        Needed::Size(n) => {
                            if self.buffer.available_data() + usize::from(n)
                                >= self.buffer.capacity()
                            {
                                Err(PcapError::BufferTooSmall)
                            } else {
                                Err(PcapError::Incomplete(n.into()))
                            }
                        }
                        Needed::Unknown => Err(PcapError::Incomplete(0)),
                    }
                }
            }
        }
    }
    fn consume(&mut self, offset: usize) {
        self.consumed += offset;
        self.buffer.consume(offset);
    }
    fn consume_noshift(&mut self, offset: usize) {
        self.consumed += offset;
        self.buffer.consume_noshift(offset);
    }
    fn consumed(&self) -> usize {
        self.consumed
    }
    fn refill(&mut self) -> Result<(), PcapError<&[u8]>> {
        self.buffer.shift();
        let space = self.buffer.space();
        // check if available space is empty, so we can distinguish
        // a read() returning 0 because of EOF or because we requested 0
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space).or(Err(PcapError::ReadError))?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }
    fn position(&self) -> usize {
        self.buffer.position()
    }
    fn grow(&mut self, new_size: usize) -> bool {
        self.buffer.grow(new_size)
    }
    fn data(&self) -> &[u8] {
        self.buffer.data()
    }
    fn reader_exhausted(&self) -> bool {
        self.reader_exhausted
    }
}
