use std::path::Path;

use tempfile::NamedTempFile;

use super::metadata::Metadata;
use super::raw_file::RawFileSource;
use super::source::ImageSource;
use crate::error::IoError;
use crate::image::PixelType;
use crate::tile::ImageTile;

/// Raw image in a temporary file, deleted when the source is dropped.
///
/// Used for intermediate products that do not fit in memory. Flush the tile
/// cache before dropping the last handle if tiles of this source were
/// modified; the source stays alive while any of its tiles is cached.
pub struct TemporaryFileSource {
    // Declared first so the handle closes before the file is removed
    inner: RawFileSource,
    _file: NamedTempFile,
}

impl TemporaryFileSource {
    /// Zero-filled temporary image in the system temp directory.
    pub fn new(width: usize, height: usize, pixel_type: PixelType) -> Result<Self, IoError> {
        let file = tempfile::Builder::new()
            .prefix("skyframe-")
            .suffix(".raw")
            .tempfile()
            .map_err(|e| IoError::from_io("temporary file", e))?;
        Self::from_named(file, width, height, pixel_type)
    }

    /// Zero-filled temporary image inside `dir`.
    pub fn new_in(
        dir: impl AsRef<Path>,
        width: usize,
        height: usize,
        pixel_type: PixelType,
    ) -> Result<Self, IoError> {
        let dir = dir.as_ref();
        let file = tempfile::Builder::new()
            .prefix("skyframe-")
            .suffix(".raw")
            .tempfile_in(dir)
            .map_err(|e| IoError::from_io(dir.display(), e))?;
        Self::from_named(file, width, height, pixel_type)
    }

    fn from_named(
        file: NamedTempFile,
        width: usize,
        height: usize,
        pixel_type: PixelType,
    ) -> Result<Self, IoError> {
        let path = file.path().to_path_buf();
        let handle = file
            .reopen()
            .map_err(|e| IoError::from_io(path.display(), e))?;
        let inner =
            RawFileSource::initialize(handle, path, width, height, pixel_type, Metadata::new())?;
        Ok(Self { inner, _file: file })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

impl ImageSource for TemporaryFileSource {
    fn repr(&self) -> String {
        format!("TemporaryFileSource({})", self.inner.path().display())
    }

    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn pixel_type(&self) -> PixelType {
        self.inner.pixel_type()
    }

    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError> {
        self.inner.image_tile(x, y, width, height)
    }

    fn save_tile(&self, tile: &ImageTile) -> Result<(), IoError> {
        self.inner.save_tile(tile)
    }
}
