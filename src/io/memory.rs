use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::metadata::Metadata;
use super::source::{check_tile_bounds, ImageSource};
use crate::error::{ImageError, IoError};
use crate::image::{Image, Pixel, PixelType};
use crate::tile::ImageTile;

/// Source backed by a row-major vector.
///
/// Saves copy tile pixels back into the vector. Load and save counts are
/// kept for inspection.
pub struct MemorySource<T: Pixel> {
    width: usize,
    height: usize,
    data: RwLock<Vec<T>>,
    metadata: RwLock<Metadata>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl<T: Pixel> MemorySource<T> {
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "source buffer holds {} pixels, expected {width}x{height}",
            data.len()
        );
        Self {
            width,
            height,
            data: RwLock::new(data),
            metadata: RwLock::new(Metadata::new()),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn zeroed(width: usize, height: usize) -> Self {
        Self::from_vec(width, height, vec![T::zero(); width * height])
    }

    /// Materialize an image into memory.
    pub fn from_image(image: &dyn Image<T>) -> Result<Self, ImageError> {
        let chunk = image.full_chunk()?;
        Ok(Self::from_vec(image.width(), image.height(), chunk.to_vec()))
    }

    /// Copy of the stored pixels.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.read().clone()
    }

    /// Number of tiles produced so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of tiles saved so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl<T: Pixel> ImageSource for MemorySource<T> {
    fn repr(&self) -> String {
        format!("MemorySource<{}, {}x{}>", T::TYPE, self.width, self.height)
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        T::TYPE
    }

    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError> {
        check_tile_bounds(self, x, y, width, height)?;
        let data = self.data.read();
        let mut pixels = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            pixels.extend_from_slice(&data[start..start + width]);
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(ImageTile::from_vec(x, y, width, height, pixels))
    }

    fn save_tile(&self, tile: &ImageTile) -> Result<(), IoError> {
        check_tile_bounds(self, tile.x(), tile.y(), tile.width(), tile.height())?;
        let pixels = tile.data::<T>();
        let mut data = self.data.write();
        for (row, line) in pixels.chunks_exact(tile.width().max(1)).enumerate() {
            let start = (tile.y() + row) * self.width + tile.x();
            data[start..start + tile.width()].copy_from_slice(line);
        }
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn metadata(&self) -> Metadata {
        self.metadata.read().clone()
    }

    fn set_metadata(&self, metadata: Metadata) -> Result<(), IoError> {
        *self.metadata.write() = metadata;
        Ok(())
    }
}
