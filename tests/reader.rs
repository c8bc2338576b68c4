use std::io::Cursor;

use hex_literal::hex;
use pcapng_codec::*;

static SHB_LE: &[u8] = &hex!(
    "
0A 0D 0D 0A 1C 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF FF FF FF FF 1C 00 00 00"
);
// ETHERNET, no snaplen, microseconds
static IDB_LE: &[u8] = &hex!("01 00 00 00 14 00 00 00 01 00 00 00 00 00 00 00 14 00 00 00");
// 1 second, 4 of 8 bytes captured
static EPB_LE: &[u8] = &hex!(
    "
06 00 00 00 24 00 00 00 00 00 00 00 00 00 00 00
40 42 0F 00 04 00 00 00 08 00 00 00 01 02 03 04
24 00 00 00"
);

static SHB_BE: &[u8] = &hex!(
    "
0A 0D 0D 0A 00 00 00 1C 1A 2B 3C 4D 00 01 00 00
FF FF FF FF FF FF FF FF 00 00 00 1C"
);
// RAW, no snaplen, if_tsresol 9
static IDB_BE: &[u8] = &hex!(
    "
00 00 00 01 00 00 00 20 00 65 00 00 00 00 00 00
00 09 00 01 09 00 00 00 00 00 00 00 00 00 00 20"
);
// 2.000000005 seconds
static EPB_BE: &[u8] = &hex!(
    "
00 00 00 06 00 00 00 24 00 00 00 00 00 00 00 00
77 35 94 05 00 00 00 04 00 00 00 04 45 00 00 04
00 00 00 24"
);

/// Wrap a body in a little-endian block
fn block_le(block_type: u32, body: &[u8]) -> Vec<u8> {
    let padded = (body.len() + 3) & !3;
    let len = (12 + padded) as u32;
    let mut v = Vec::new();
    v.extend_from_slice(&block_type.to_le_bytes());
    v.extend_from_slice(&len.to_le_bytes());
    v.extend_from_slice(body);
    v.resize(8 + padded, 0);
    v.extend_from_slice(&len.to_le_bytes());
    v
}

fn two_sections() -> Vec<u8> {
    [SHB_LE, IDB_LE, EPB_LE, SHB_BE, IDB_BE, EPB_BE].concat()
}

fn packet(record: &Record) -> &PacketRecord {
    match &record.data {
        RecordData::Packet(p) => p,
        d => panic!("unexpected record {:?}", d),
    }
}

fn check_two_sections(reader: &mut CaptureReader<Cursor<Vec<u8>>>) -> Vec<Record> {
    let mut records = Vec::new();
    loop {
        match reader.read_next() {
            Ok(record) => records.push(record),
            Err(PcapError::Eof) => break,
            Err(e) => panic!("error while reading: {:?}", e),
        }
    }
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].section_number, 0);
    assert_eq!(records[0].offset, 48);
    let p = packet(&records[0]);
    assert_eq!(p.linktype, Linktype::ETHERNET);
    assert_eq!(p.timestamp, Some(Timestamp::new(1, 0)));
    assert_eq!(p.tsprec, TsPrecision::USEC);
    assert_eq!(p.orig_len, 8);
    assert_eq!(p.data, vec![1, 2, 3, 4]);

    assert_eq!(records[1].section_number, 1);
    assert_eq!(records[1].offset, 144);
    let p = packet(&records[1]);
    assert_eq!(p.linktype, Linktype::RAW);
    assert_eq!(p.timestamp, Some(Timestamp::new(2, 5)));
    assert_eq!(p.tsprec, TsPrecision::NSEC);
    assert_eq!(p.data, hex!("45 00 00 04").to_vec());

    let sections = reader.sections();
    assert_eq!(sections.len(), 2);
    assert!(!sections[0].big_endian);
    assert!(sections[1].big_endian);
    assert_eq!(sections[1].offset, 84);
    assert_eq!(reader.file_encap(), PerFile::PerPacket);
    assert_eq!(reader.file_tsprec(), PerFile::PerPacket);
    records
}

#[test]
fn test_empty_reader_error() {
    let registry = Registry::new();
    let empty: &[u8] = &[];
    let res = CaptureReader::open(empty, &registry);
    assert!(matches!(res, Err(PcapError::NotThisFormat)));
}

#[test]
fn test_reader_two_sections() {
    let registry = Registry::new();
    let mut reader = CaptureReader::open(Cursor::new(two_sections()), &registry).expect("open");
    check_two_sections(&mut reader);
    assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
}

#[test]
fn test_reader_small_buffer() {
    let registry = Registry::new();
    let config = ReaderConfig {
        buffer_capacity: 32,
        ..ReaderConfig::default()
    };
    let mut reader = CaptureReader::with_config(Cursor::new(two_sections()), &registry, config)
        .expect("open");
    check_two_sections(&mut reader);
}

#[test]
fn test_reader_seek_read() {
    let registry = Registry::new();
    let mut reader = CaptureReader::open(Cursor::new(two_sections()), &registry).expect("open");
    let records = check_two_sections(&mut reader);
    // random access, in any order
    let second = reader.seek_read(144).expect("seek_read");
    assert_eq!(second, records[1]);
    let first = reader.seek_read(48).expect("seek_read");
    assert_eq!(first, records[0]);
    // not a record
    assert!(matches!(reader.seek_read(28), Err(PcapError::BadFile(_))));
    assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
    let cursor = reader.close();
    assert_eq!(cursor.position(), 180);
}

#[test]
fn test_reader_journal_and_custom_block() {
    let entry = b"__REALTIME_TIMESTAMP=1500000000123456\nMESSAGE=x\n";
    let mut cb_body = 12345u32.to_le_bytes().to_vec();
    cb_body.extend_from_slice(&hex!("01 02 03 04 05 06 07 08"));
    let data = [
        SHB_LE.to_vec(),
        block_le(SJE_MAGIC, entry),
        block_le(CB_MAGIC, &cb_body),
    ]
    .concat();
    let registry = Registry::new();
    let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
    let record = reader.read_next().expect("record");
    assert_eq!(
        record.data,
        RecordData::Custom(CustomRecord {
            pen: 12345,
            copy_allowed: true,
            payload: CustomPayload::Generic(hex!("01 02 03 04 05 06 07 08").to_vec()),
        })
    );
    let journal = &reader.tables().journal_entries;
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].data, entry.to_vec());
    assert_eq!(
        journal[0].timestamp,
        Some(Timestamp::new(1_500_000_000, 123_456_000))
    );
    assert_eq!(reader.file_encap(), PerFile::PerPacket);
    assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
}

fn read_local_block(
    block_type: u32,
    data: &[u8],
    _big_endian: bool,
) -> Result<ExtensionRecord, PcapError<&'static [u8]>> {
    Ok(ExtensionRecord {
        block_type,
        data: data.to_vec(),
    })
}

#[test]
fn test_reader_extension_block() {
    let local = block_le(0x8000_0001, b"local");
    let skipped = block_le(0x8000_0002, b"skipped");
    let data = [SHB_LE.to_vec(), skipped, local].concat();
    let mut registry = Registry::new();
    registry
        .register_block(
            0x8000_0001,
            BlockHandler {
                read: read_local_block,
                write: None,
            },
        )
        .expect("register");
    registry.finalize();
    assert!(registry
        .register_block(
            0x8000_0003,
            BlockHandler {
                read: read_local_block,
                write: None,
            },
        )
        .is_err());
    let mut reader = CaptureReader::open(&data[..], &registry).expect("open");
    let record = reader.read_next().expect("record");
    assert_eq!(record.offset, 28 + 20);
    match record.data {
        RecordData::Extension(ext) => {
            assert_eq!(ext.block_type, 0x8000_0001);
            // the body is padded
            assert_eq!(ext.data, b"local\0\0\0".to_vec());
        }
        d => panic!("unexpected record {:?}", d),
    }
    assert!(matches!(reader.read_next(), Err(PcapError::Eof)));
}

#[test]
fn test_reader_refuses_builtin_block_handler() {
    let mut registry = Registry::new();
    let res = registry.register_block(
        EPB_MAGIC,
        BlockHandler {
            read: read_local_block,
            write: None,
        },
    );
    assert!(matches!(res, Err(PcapError::Unsupported(_))));
}
