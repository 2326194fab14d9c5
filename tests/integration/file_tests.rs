//! File-backed source integration tests.
//!
//! Tests verify:
//! - Pixels written through the cache survive a flush and a reopen
//! - Metadata is stored in the header and read back
//! - Malformed files are rejected with descriptive errors
//! - Temporary sources clean up after themselves

use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use skyframe::{
    BufferedImage, Image, ImageSource, IoError, Metadata, MetadataEntry, PixelType,
    RawFileSource, TemporaryFileSource, WriteableBufferedImage, WriteableImage,
};

use super::test_utils::{manager, pixels};

fn survey_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("TELESCOP".into(), MetadataEntry::new("VISTA", "Telescope"));
    metadata.insert("EXPTIME".into(), MetadataEntry::new(12.5, "Exposure [s]"));
    metadata.insert("NCOMBINE".into(), MetadataEntry::new(6i64, ""));
    metadata.insert("PHOTOMET".into(), MetadataEntry::new(true, ""));
    metadata
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_write_flush_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("science.raw");
    let (width, height) = (10, 7);

    {
        let source: Arc<dyn ImageSource> = Arc::new(
            RawFileSource::create(&path, width, height, PixelType::F32, survey_metadata())
                .unwrap(),
        );
        // Budget of two tiles forces evictions while writing
        let manager = manager(4, 4, 2 * 4 * 4 * 4);
        let writer = WriteableBufferedImage::<f32>::with_manager(source, manager.clone());
        for y in 0..height {
            for x in 0..width {
                writer.set_value(x, y, (x * 100 + y) as f32 * 0.5).unwrap();
            }
        }
        manager.flush().unwrap();
        assert!(manager.stats().evictions > 0);
    }

    let reopened = RawFileSource::open(&path).unwrap();
    assert_eq!((reopened.width(), reopened.height()), (width, height));
    assert_eq!(reopened.pixel_type(), PixelType::F32);
    assert_eq!(reopened.metadata(), survey_metadata());

    let image = BufferedImage::<f32>::with_manager(Arc::new(reopened), manager(3, 3, 1 << 20));
    let expected: Vec<f32> = (0..width * height)
        .map(|i| ((i % width) * 100 + i / width) as f32 * 0.5)
        .collect();
    assert_eq!(pixels(&image), expected);
}

#[test]
fn test_checkpoint_visible_to_second_handle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.raw");
    let source: Arc<dyn ImageSource> =
        Arc::new(RawFileSource::create(&path, 6, 6, PixelType::I64, Metadata::new()).unwrap());
    let manager = manager(4, 4, 1 << 20);
    let writer = WriteableBufferedImage::<i64>::with_manager(source, manager.clone());

    writer.set_value(5, 5, -7).unwrap();
    writer.set_value(0, 1, i64::MAX).unwrap();
    manager.save_all_tiles().unwrap();
    assert_eq!(manager.len(), 2);

    let other = BufferedImage::<i64>::with_manager(
        Arc::new(RawFileSource::open(&path).unwrap()),
        manager.clone(),
    );
    assert_eq!(other.value(5, 5).unwrap(), -7);
    assert_eq!(other.value(0, 1).unwrap(), i64::MAX);
    assert_eq!(other.value(3, 3).unwrap(), 0);
}

#[test]
fn test_fill_then_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flat.raw");
    let source = RawFileSource::create(&path, 5, 3, PixelType::U32, Metadata::new()).unwrap();
    source.fill(17u32).unwrap();

    let image = BufferedImage::<u32>::with_manager(Arc::new(source), manager(2, 2, 1 << 20));
    assert_eq!(image.full_chunk().unwrap().to_vec(), vec![17; 15]);
}

#[test]
fn test_file_size_matches_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layout.raw");
    RawFileSource::create(&path, 4, 3, PixelType::F64, Metadata::new()).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..8], b"SKYRAW01");
    assert_eq!(bytes[8], PixelType::F64.code());
    // Empty metadata is stored as "{}"
    assert_eq!(bytes.len(), 24 + 2 + 4 * 3 * 8);
}

// =============================================================================
// Invalid Files
// =============================================================================

#[test]
fn test_open_missing_file() {
    let dir = tempdir().unwrap();
    let err = RawFileSource::open(dir.path().join("absent.raw")).err().unwrap();
    assert!(matches!(err, IoError::NotFound(_)));
}

#[test]
fn test_open_rejects_bad_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.raw");
    fs::write(&path, vec![0x42u8; 64]).unwrap();

    let err = RawFileSource::open(&path).err().unwrap();
    assert!(matches!(err, IoError::InvalidFormat { ref reason, .. } if reason.contains("magic")));
}

#[test]
fn test_open_rejects_truncated_pixels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.raw");
    RawFileSource::create(&path, 8, 8, PixelType::F32, Metadata::new()).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    let err = RawFileSource::open(&path).err().unwrap();
    assert!(matches!(err, IoError::InvalidFormat { .. }));
    assert!(err.to_string().contains("short.raw"));
}

#[test]
fn test_metadata_is_read_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixed.raw");
    let source = RawFileSource::create(&path, 2, 2, PixelType::F32, survey_metadata()).unwrap();
    let err = source.set_metadata(Metadata::new()).unwrap_err();
    assert!(matches!(err, IoError::ReadOnly(_)));
    assert_eq!(source.metadata(), survey_metadata());
}

#[test]
#[should_panic(expected = "image requested f64")]
fn test_wrong_pixel_type_panics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("typed.raw");
    let source = RawFileSource::create(&path, 2, 2, PixelType::F32, Metadata::new()).unwrap();
    BufferedImage::<f64>::with_manager(Arc::new(source), manager(2, 2, 1 << 20));
}

// =============================================================================
// Temporary Files
// =============================================================================

#[test]
fn test_temporary_source_round_trip_and_cleanup() {
    let dir = tempdir().unwrap();
    let temp = Arc::new(TemporaryFileSource::new_in(dir.path(), 6, 4, PixelType::F32).unwrap());
    let path = temp.path().to_path_buf();
    assert!(path.exists());

    {
        let source: Arc<dyn ImageSource> = temp.clone();
        let manager = manager(4, 4, 1 << 20);
        let writer = WriteableBufferedImage::<f32>::with_manager(source.clone(), manager.clone());
        writer.set_value(5, 3, 2.0).unwrap();
        manager.flush().unwrap();

        let reader = BufferedImage::<f32>::with_manager(source, manager);
        assert_eq!(reader.value(5, 3).unwrap(), 2.0);
        assert_eq!(reader.value(0, 0).unwrap(), 0.0);
    }

    drop(temp);
    assert!(!path.exists());
}
