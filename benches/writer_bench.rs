use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use lake_writer::conf::WriterConfig;
use lake_writer::fs::ObjectFileSystem;
use lake_writer::testutil::{memory_tablet, sample_batch};
use lake_writer::writer::TabletWriter;

const BATCH_ROWS: usize = 4096;
const BATCH_COUNTS: &[usize] = &[16, 128];
const SEGMENT_SIZES: &[u64] = &[64 * 1024, 16 * 1024 * 1024];

fn bench_tablet_writer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let batch = sample_batch(0, BATCH_ROWS);

    for &max_segment_file_size in SEGMENT_SIZES {
        let mut group = c.benchmark_group(format!("writer/segment_{}", max_segment_file_size));
        let config = WriterConfig::with_max_segment_file_size(max_segment_file_size);

        for &num_batches in BATCH_COUNTS {
            group.throughput(Throughput::Elements((num_batches * BATCH_ROWS) as u64));
            group.bench_with_input(
                BenchmarkId::new("batches", num_batches),
                &num_batches,
                |b, &num_batches| {
                    b.iter(|| {
                        rt.block_on(async {
                            let mut writer = TabletWriter::new(
                                memory_tablet(1),
                                Arc::new(ObjectFileSystem::in_memory()),
                                &config,
                            );
                            writer.open().unwrap();
                            for _ in 0..num_batches {
                                writer.write(black_box(&batch)).await.unwrap();
                            }
                            writer.finish().await.unwrap();
                            black_box(writer.output())
                        })
                    })
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_tablet_writer);
criterion_main!(benches);
