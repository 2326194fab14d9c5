//! Physical tile storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tracing::error;

use crate::error::IoError;
use crate::image::{ImageChunk, Pixel, PixelType, TileBuffer};
use crate::io::ImageSource;

/// One block of pixels aligned to the cache's tile grid.
///
/// Coordinates passed to the accessors are absolute image coordinates. The
/// pixel buffer is a copy-on-write `Arc<Vec<T>>`, so chunks handed out by
/// [`chunk`](Self::chunk) are immutable snapshots that later writes never
/// alter.
///
/// Once admitted into the cache the tile remembers its source weakly. A tile
/// that is still modified when dropped, typically because a writer kept it
/// after eviction, is saved to that source on drop.
pub struct ImageTile {
    pixel_type: PixelType,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    buffer: RwLock<TileBuffer>,
    modified: AtomicBool,
    resident: AtomicBool,
    owner: OnceLock<Weak<dyn ImageSource>>,
}

impl ImageTile {
    /// Zero-filled tile.
    pub fn new(pixel_type: PixelType, x: usize, y: usize, width: usize, height: usize) -> Self {
        Self::from_buffer(x, y, width, height, pixel_type.zeroed(width * height))
    }

    /// Tile over an owned row-major vector.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn from_vec<T: Pixel>(
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        data: Vec<T>,
    ) -> Self {
        Self::from_buffer(x, y, width, height, T::into_buffer(data))
    }

    /// Tile over an existing tagged buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not hold exactly `width * height` pixels.
    pub fn from_buffer(
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        buffer: TileBuffer,
    ) -> Self {
        assert_eq!(
            buffer.len(),
            width * height,
            "tile buffer holds {} pixels, expected {width}x{height}",
            buffer.len()
        );
        Self {
            pixel_type: buffer.pixel_type(),
            x,
            y,
            width,
            height,
            buffer: RwLock::new(buffer),
            modified: AtomicBool::new(false),
            resident: AtomicBool::new(false),
            owner: OnceLock::new(),
        }
    }

    #[inline]
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// True when the absolute pixel `(x, y)` lies in this tile.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    /// Bytes counted against the cache budget.
    pub fn memory_size(&self) -> usize {
        self.width * self.height * self.pixel_type.size()
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    /// True while the tile is held by the cache.
    pub fn is_resident(&self) -> bool {
        self.resident.load(Ordering::Acquire)
    }

    /// Pixel at absolute `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the tile's pixel type or the pixel lies outside.
    pub fn value<T: Pixel>(&self, x: usize, y: usize) -> T {
        let index = self.index(x, y);
        let buffer = self.buffer.read();
        typed::<T>(&buffer, self.pixel_type)[index]
    }

    /// Write the pixel at absolute `(x, y)` and mark the tile modified.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the tile's pixel type or the pixel lies outside.
    pub fn set_value<T: Pixel>(&self, x: usize, y: usize, value: T) {
        let index = self.index(x, y);
        let mut buffer = self.buffer.write();
        self.write_locked(&mut buffer, index, value);
    }

    /// Like [`set_value`](Self::set_value), but only while the tile is cached.
    ///
    /// Returns false and leaves the tile untouched once the cache has retired
    /// it. Residency is checked under the buffer lock that eviction also
    /// takes, so an accepted write is always part of the eviction save.
    pub(crate) fn set_value_if_resident<T: Pixel>(&self, x: usize, y: usize, value: T) -> bool {
        let index = self.index(x, y);
        let mut buffer = self.buffer.write();
        if !self.resident.load(Ordering::Acquire) {
            return false;
        }
        self.write_locked(&mut buffer, index, value);
        true
    }

    /// Zero-copy view of the absolute rectangle at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the tile's pixel type or the window leaves the tile.
    pub fn chunk<T: Pixel>(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> ImageChunk<T> {
        assert!(
            x >= self.x
                && y >= self.y
                && x + width <= self.x + self.width
                && y + height <= self.y + self.height,
            "window {width}x{height} at ({x}, {y}) outside tile at ({}, {})",
            self.x,
            self.y
        );
        let offset = (y - self.y) * self.width + (x - self.x);
        ImageChunk::from_shared(self.data::<T>(), offset, self.width, width, height)
    }

    /// Snapshot of the whole pixel buffer.
    pub fn data<T: Pixel>(&self) -> Arc<Vec<T>> {
        let buffer = self.buffer.read();
        Arc::clone(typed::<T>(&buffer, self.pixel_type))
    }

    /// Snapshot of the tagged buffer, for sources that dispatch on type.
    pub fn buffer(&self) -> TileBuffer {
        self.buffer.read().clone()
    }

    /// Save through `source` if modified.
    ///
    /// Returns whether a save happened. The modified flag is cleared before
    /// the save and restored if it fails, so writes racing with the save keep
    /// the tile dirty.
    pub fn save_if_modified(&self, source: &dyn ImageSource) -> Result<bool, IoError> {
        if !self.modified.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        match source.save_tile(self) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.modified.store(true, Ordering::Release);
                Err(err)
            }
        }
    }

    pub(crate) fn attach(&self, source: &Arc<dyn ImageSource>) {
        let _ = self.owner.set(Arc::downgrade(source));
        self.resident.store(true, Ordering::Release);
    }

    /// Must run before the tile's final save.
    pub(crate) fn mark_evicted(&self) {
        let _buffer = self.buffer.write();
        self.resident.store(false, Ordering::Release);
    }

    /// Forget pending writes after a save failed for good.
    pub(crate) fn discard_modifications(&self) {
        self.modified.store(false, Ordering::Release);
    }

    fn write_locked<T: Pixel>(&self, buffer: &mut TileBuffer, index: usize, value: T) {
        let data = match T::buffer_mut(buffer) {
            Some(data) => data,
            None => type_mismatch(T::TYPE, self.pixel_type),
        };
        Arc::make_mut(data)[index] = value;
        self.modified.store(true, Ordering::Release);
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            self.contains(x, y),
            "pixel ({x}, {y}) outside tile {}x{} at ({}, {})",
            self.width,
            self.height,
            self.x,
            self.y
        );
        (y - self.y) * self.width + (x - self.x)
    }
}

impl Drop for ImageTile {
    fn drop(&mut self) {
        if !*self.modified.get_mut() {
            return;
        }
        let Some(source) = self.owner.get().and_then(Weak::upgrade) else {
            return;
        };
        if let Err(err) = self.save_if_modified(source.as_ref()) {
            error!(
                source = %source.repr(),
                x = self.x,
                y = self.y,
                error = %err,
                "Failed to save modified tile on drop"
            );
        }
    }
}

impl std::fmt::Debug for ImageTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTile")
            .field("pixel_type", &self.pixel_type)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("modified", &self.is_modified())
            .finish()
    }
}

fn typed<T: Pixel>(buffer: &TileBuffer, tile_type: PixelType) -> &Arc<Vec<T>> {
    match T::buffer(buffer) {
        Some(data) => data,
        None => type_mismatch(T::TYPE, tile_type),
    }
}

#[cold]
#[track_caller]
fn type_mismatch(requested: PixelType, actual: PixelType) -> ! {
    panic!("pixel type mismatch: requested {requested}, tile holds {actual}")
}
