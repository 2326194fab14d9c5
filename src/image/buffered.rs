//! Images backed by the tile cache.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::chunk::ImageChunk;
use super::pixel::Pixel;
use super::traits::{check_chunk_request, Image, WriteableImage};
use crate::error::ImageError;
use crate::io::ImageSource;
use crate::tile::{ImageTile, TileManager};

/// Read access to an [`ImageSource`] through a [`TileManager`].
///
/// A request that falls inside one tile is a zero-copy view of that tile's
/// buffer. A request spanning tiles is assembled into a new buffer with one
/// cache lookup per tile.
pub struct BufferedImage<T: Pixel> {
    source: Arc<dyn ImageSource>,
    manager: Arc<TileManager>,
    _pixel: PhantomData<fn() -> T>,
}

impl<T: Pixel> BufferedImage<T> {
    /// Buffer `source` through the global tile cache.
    ///
    /// # Panics
    ///
    /// Panics if the source's pixel type is not `T`.
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self::with_manager(source, TileManager::global())
    }

    /// Buffer `source` through a specific tile cache.
    ///
    /// # Panics
    ///
    /// Panics if the source's pixel type is not `T`.
    pub fn with_manager(source: Arc<dyn ImageSource>, manager: Arc<TileManager>) -> Self {
        assert_eq!(
            source.pixel_type(),
            T::TYPE,
            "{} holds {} pixels, image requested {}",
            source.repr(),
            source.pixel_type(),
            T::TYPE
        );
        Self {
            source,
            manager,
            _pixel: PhantomData,
        }
    }

    pub fn source(&self) -> &Arc<dyn ImageSource> {
        &self.source
    }

    pub fn manager(&self) -> &Arc<TileManager> {
        &self.manager
    }

    fn tile(&self, x: usize, y: usize) -> Result<Arc<ImageTile>, ImageError> {
        Ok(self.manager.tile_for_pixel(x, y, &self.source)?)
    }
}

impl<T: Pixel> Image<T> for BufferedImage<T> {
    fn repr(&self) -> String {
        format!("BufferedImage({})", self.source.repr())
    }

    fn width(&self) -> usize {
        self.source.width()
    }

    fn height(&self) -> usize {
        self.source.height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        check_chunk_request(self, x, y, width, height);
        if width == 0 || height == 0 {
            return Ok(ImageChunk::from_vec(width, height, Vec::new()));
        }

        let first = self.tile(x, y)?;
        if first.contains(x + width - 1, y + height - 1) {
            return Ok(first.chunk(x, y, width, height));
        }

        let (x_end, y_end) = (x + width, y + height);
        let mut data = vec![T::zero(); width * height];
        let mut cy = y;
        while cy < y_end {
            let mut cx = x;
            let mut band_end = y_end;
            while cx < x_end {
                let tile = if (cx, cy) == (x, y) {
                    Arc::clone(&first)
                } else {
                    self.tile(cx, cy)?
                };
                let tile_x_end = (tile.x() + tile.width()).min(x_end);
                band_end = (tile.y() + tile.height()).min(y_end);

                let view = tile.chunk::<T>(cx, cy, tile_x_end - cx, band_end - cy);
                for (row, line) in view.rows().enumerate() {
                    let start = (cy - y + row) * width + (cx - x);
                    data[start..start + line.len()].copy_from_slice(line);
                }
                cx = tile_x_end;
            }
            cy = band_end;
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        check_chunk_request(self, x, y, 1, 1);
        Ok(self.tile(x, y)?.value(x, y))
    }
}

/// [`BufferedImage`] that also accepts writes.
///
/// Writes land in the cached tile and reach the source when the tile is
/// evicted or the cache is flushed. The last written tile is remembered so
/// sequential writes skip the cache lookup. A write never lands in a tile the
/// cache has already retired, so a stale tile cannot overwrite a newer copy
/// when it is dropped.
pub struct WriteableBufferedImage<T: Pixel> {
    inner: BufferedImage<T>,
    current: Mutex<Option<Arc<ImageTile>>>,
}

impl<T: Pixel> WriteableBufferedImage<T> {
    /// # Panics
    ///
    /// Panics if the source's pixel type is not `T`.
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self::with_manager(source, TileManager::global())
    }

    /// # Panics
    ///
    /// Panics if the source's pixel type is not `T`.
    pub fn with_manager(source: Arc<dyn ImageSource>, manager: Arc<TileManager>) -> Self {
        Self {
            inner: BufferedImage::with_manager(source, manager),
            current: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &Arc<dyn ImageSource> {
        self.inner.source()
    }

    pub fn manager(&self) -> &Arc<TileManager> {
        self.inner.manager()
    }
}

impl<T: Pixel> Image<T> for WriteableBufferedImage<T> {
    fn repr(&self) -> String {
        format!("WriteableBufferedImage({})", self.inner.source.repr())
    }

    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        self.inner.chunk(x, y, width, height)
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        self.inner.value(x, y)
    }
}

impl<T: Pixel> WriteableImage<T> for WriteableBufferedImage<T> {
    fn set_value(&self, x: usize, y: usize, value: T) -> Result<(), ImageError> {
        check_chunk_request(self, x, y, 1, 1);
        let mut current = self.current.lock();
        loop {
            let tile = match current.as_ref() {
                Some(tile) if tile.contains(x, y) => Arc::clone(tile),
                _ => {
                    let tile = self.inner.tile(x, y)?;
                    *current = Some(Arc::clone(&tile));
                    tile
                }
            };
            if tile.set_value_if_resident(x, y, value) {
                return Ok(());
            }
            // Retired since the lookup; write to the reloaded tile instead
            *current = None;
        }
    }
}
