use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pcapng_codec::traits::PcapReaderIterator;
use pcapng_codec::*;

const NUM_PACKETS: usize = 5000;

fn packets() -> Vec<PacketRecord> {
    (0..NUM_PACKETS)
        .map(|i| {
            let len = 60 + (i * 37) % 1440;
            let mut packet = PacketRecord::new(Linktype::ETHERNET, vec![(i % 256) as u8; len]);
            packet.timestamp = Some(Timestamp::new(1_600_000_000 + i as i64, (i * 1000) as u32));
            packet
        })
        .collect()
}

fn write_capture(registry: &Registry, packets: &[PacketRecord]) -> Vec<u8> {
    let interfaces = vec![Interface::new(Linktype::ETHERNET, 0)];
    let mut writer =
        CaptureWriter::open(Vec::new(), registry, interfaces).expect("could not create writer");
    for packet in packets {
        writer.write_packet(packet).expect("could not write packet");
    }
    writer.finish().expect("could not finish capture")
}

fn do_block_reader(bytes: &[u8], buffer_size: usize) {
    let mut num_blocks = 0;
    let mut reader = BlockReader::new(buffer_size, bytes).expect("could not create reader");
    loop {
        match reader.next() {
            Ok((offset, _block)) => {
                num_blocks += 1;
                reader.consume_noshift(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader.refill().unwrap();
            }
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }
    assert_eq!(num_blocks, NUM_PACKETS + 2);
}

fn do_capture_reader(bytes: &[u8], registry: &Registry) {
    let mut num_packets = 0;
    let mut reader = CaptureReader::open(bytes, registry).expect("could not create reader");
    loop {
        match reader.read_next() {
            Ok(_) => num_packets += 1,
            Err(PcapError::Eof) => break,
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }
    assert_eq!(num_packets, NUM_PACKETS);
}

fn bench_block_reader(c: &mut Criterion) {
    let registry = Registry::new();
    let bytes = write_capture(&registry, &packets());
    c.bench_function("block_reader generated", |b| {
        b.iter(|| do_block_reader(&bytes, 65536))
    });
}

fn bench_block_reader_buffer_size(c: &mut Criterion) {
    let registry = Registry::new();
    let bytes = write_capture(&registry, &packets());
    let mut group = c.benchmark_group("block_reader buffer_size");
    const KB16: usize = 16384;
    for buffer_size in [KB16, KB16 * 2, KB16 * 4, KB16 * 8, KB16 * 16].iter() {
        group.throughput(Throughput::Bytes(*buffer_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            buffer_size,
            |b, &size| b.iter(|| do_block_reader(&bytes, size)),
        );
    }
}

fn bench_capture_reader(c: &mut Criterion) {
    let registry = Registry::new();
    let bytes = write_capture(&registry, &packets());
    c.bench_function("capture_reader generated", |b| {
        b.iter(|| do_capture_reader(&bytes, &registry))
    });
}

fn bench_capture_writer(c: &mut Criterion) {
    let registry = Registry::new();
    let packets = packets();
    c.bench_function("capture_writer generated", |b| {
        b.iter(|| write_capture(&registry, &packets))
    });
}

criterion_group!(
    benches,
    bench_block_reader,
    bench_block_reader_buffer_size,
    bench_capture_reader,
    bench_capture_writer
);
criterion_main!(benches);
