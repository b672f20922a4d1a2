use std::sync::Arc;

use tempfile::TempDir;

use lake_writer::conf::{Config, WriterConfig};
use lake_writer::core::setup_logging;
use lake_writer::fs::{FileSystem, ObjectFileSystem, create_from_config, create_from_location};
use lake_writer::segment::{SegmentReader, is_segment_filename};
use lake_writer::tablet::{LakeTablet, MetadataCell, Tablet, TabletMetadata};
use lake_writer::testutil::{batch_keys, sample_batch, sample_schema};
use lake_writer::writer::TabletWriter;

fn local_tablet(dir: &TempDir, id: i64) -> Arc<LakeTablet> {
    let cell = MetadataCell::with_metadata(TabletMetadata::new(id, sample_schema()));
    let root = format!("file://{}", dir.path().join(id.to_string()).display());
    Arc::new(LakeTablet::new(id, root, Arc::new(cell)))
}

/// Published segment files of a tablet. In-progress uploads are skipped.
fn data_files(dir: &TempDir, id: i64) -> Vec<String> {
    let data_dir = dir.path().join(id.to_string()).join("data");
    let Ok(entries) = std::fs::read_dir(data_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| is_segment_filename(name))
        .collect();
    names.sort();
    names
}

/// Write, finish, publish: the new metadata version lists exactly the
/// segments that are on disk, and they hold every row in order.
#[tokio::test]
async fn test_write_finish_publish_local() {
    setup_logging();
    let dir = TempDir::new().unwrap();
    let toml = format!(
        "[writer]\nmax_segment_file_size = 2048\n\n[storage]\nroot = \"file://{}\"\n",
        dir.path().display()
    );
    let config = Config::from_str(&toml).unwrap();
    let fs = create_from_config(&config.storage).unwrap();
    let tablet = local_tablet(&dir, 10);
    assert!(tablet.root_location().starts_with(&config.storage.root));

    let mut writer = TabletWriter::new(tablet.clone(), fs.clone(), &config.writer);
    writer.open().unwrap();
    for i in 0..20 {
        writer.write(&sample_batch(i * 50, 50)).await.unwrap();
    }
    writer.finish().await.unwrap();
    let output = writer.output();
    writer.close().await;

    assert!(output.files.len() > 1);
    assert_eq!(output.num_rows, 1000);
    assert!(output.files.iter().all(|f| is_segment_filename(f)));

    let mut on_disk = output.files.clone();
    on_disk.sort();
    assert_eq!(data_files(&dir, 10), on_disk);

    let mut keys = Vec::new();
    let mut total_size = 0u64;
    for name in &output.files {
        let path = tablet.segment_location(name).unwrap();
        total_size += fs.read_file(&path).await.unwrap().len() as u64;
        let reader = SegmentReader::open(fs.as_ref(), &path).await.unwrap();
        keys.extend(reader.batches().iter().flat_map(batch_keys));
    }
    assert_eq!(keys, (0..1000).collect::<Vec<i64>>());
    assert_eq!(total_size, output.data_size);

    let base = tablet.metadata().current().await.unwrap();
    let published = tablet
        .metadata()
        .publish(base.next_version(&output).unwrap())
        .await
        .unwrap();
    assert_eq!(published.version, 2);
    assert_eq!(published.rowsets[0].segments, output.files);
    assert_eq!(published.num_rows(), 1000);
    assert_eq!(base.version, 1);
}

/// Abandoning a writer removes everything it wrote, including a segment
/// that was never finalized.
#[tokio::test]
async fn test_abort_removes_local_files() {
    let dir = TempDir::new().unwrap();
    let tablet = local_tablet(&dir, 11);
    let fs: Arc<dyn FileSystem> = Arc::new(ObjectFileSystem::local());

    let mut writer = TabletWriter::new(
        tablet.clone(),
        fs,
        &WriterConfig::with_max_segment_file_size(1),
    );
    writer.open().unwrap();
    for i in 0..3 {
        writer.write(&sample_batch(i * 10, 10)).await.unwrap();
    }
    assert_eq!(writer.files().len(), 3);
    // The third segment is still open.
    assert_eq!(data_files(&dir, 11).len(), 2);

    writer.close().await;
    assert!(writer.files().is_empty());
    assert!(data_files(&dir, 11).is_empty());
}

/// A single write followed by close leaves nothing behind.
#[tokio::test]
async fn test_single_write_then_close() {
    let dir = TempDir::new().unwrap();
    let tablet = local_tablet(&dir, 12);
    let fs = create_from_location(tablet.root_location()).unwrap();

    let mut writer = TabletWriter::new(tablet, fs, &WriterConfig::default());
    writer.open().unwrap();
    writer.write(&sample_batch(0, 100)).await.unwrap();
    assert_eq!(writer.files().len(), 1);

    writer.close().await;
    assert!(writer.files().is_empty());
    assert!(data_files(&dir, 12).is_empty());
}

/// Two writers on one tablet, one finishing and one aborting, only touch
/// their own files.
#[tokio::test]
async fn test_concurrent_writers_same_tablet() {
    let dir = TempDir::new().unwrap();
    let tablet = local_tablet(&dir, 13);
    let fs: Arc<dyn FileSystem> = Arc::new(ObjectFileSystem::local());
    let config = WriterConfig::with_max_segment_file_size(1);

    let mut keep = TabletWriter::new(tablet.clone(), fs.clone(), &config);
    let mut abort = TabletWriter::new(tablet.clone(), fs.clone(), &config);
    keep.open().unwrap();
    abort.open().unwrap();

    for i in 0..3 {
        keep.write(&sample_batch(i, 1)).await.unwrap();
        abort.write(&sample_batch(100 + i, 1)).await.unwrap();
    }
    keep.finish().await.unwrap();
    let kept = keep.output().files;
    keep.close().await;
    abort.close().await;

    let mut kept_sorted = kept.clone();
    kept_sorted.sort();
    assert_eq!(data_files(&dir, 13), kept_sorted);
}
