//! Test utilities for integration tests.
//!
//! This module provides mock sources that count and delay tile loads, fail
//! on demand, and record which tiles were saved.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use skyframe::error::IoError;
use skyframe::{Image, ImageChunk, ImageError, ImageSource, ImageTile, PixelType, TileManager};

// =============================================================================
// Mock Source with Load and Save Tracking
// =============================================================================

/// An `f32` source whose pixel `(x, y)` starts as `y * width + x`.
///
/// Loads can be slowed down or made to fail; saves are recorded by tile
/// origin and can fail too.
pub struct MockSource {
    name: String,
    width: usize,
    height: usize,
    data: RwLock<Vec<f32>>,
    delay: Duration,
    loads: AtomicUsize,
    saved: Mutex<Vec<(usize, usize)>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MockSource {
    pub fn new(name: impl Into<String>, width: usize, height: usize) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            data: RwLock::new((0..width * height).map(|v| v as f32).collect()),
            delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
            fail_loads: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Sleep for `delay` inside every load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Origins of saved tiles, in save order.
    pub fn saved(&self) -> Vec<(usize, usize)> {
        self.saved.lock().clone()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Pixel as currently persisted in the backing vector.
    pub fn stored(&self, x: usize, y: usize) -> f32 {
        self.data.read()[y * self.width + x]
    }
}

impl ImageSource for MockSource {
    fn repr(&self) -> String {
        format!("Mock({})", self.name)
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        PixelType::F32
    }

    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(IoError::Io {
                path: self.name.clone(),
                message: "injected load failure".to_string(),
            });
        }
        let data = self.data.read();
        let mut pixels = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            pixels.extend_from_slice(&data[start..start + width]);
        }
        Ok(ImageTile::from_vec(x, y, width, height, pixels))
    }

    fn save_tile(&self, tile: &ImageTile) -> Result<(), IoError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(IoError::Io {
                path: self.name.clone(),
                message: "injected save failure".to_string(),
            });
        }
        let pixels = tile.data::<f32>();
        let mut data = self.data.write();
        for row in 0..tile.height() {
            let start = (tile.y() + row) * self.width + tile.x();
            data[start..start + tile.width()]
                .copy_from_slice(&pixels[row * tile.width()..(row + 1) * tile.width()]);
        }
        self.saved.lock().push((tile.x(), tile.y()));
        Ok(())
    }
}

// =============================================================================
// Image with Request Tracking
// =============================================================================

/// Wraps an image and counts chunk requests.
pub struct CountingImage<I> {
    inner: I,
    requests: AtomicUsize,
}

impl<I> CountingImage<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl<I: Image<f32>> Image<f32> for CountingImage<I> {
    fn repr(&self) -> String {
        format!("Counting({})", self.inner.repr())
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
    ) -> Result<ImageChunk<f32>, ImageError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.chunk(x, y, width, height)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Private manager so tests never share the global cache.
pub fn manager(tile_width: usize, tile_height: usize, max_memory: usize) -> Arc<TileManager> {
    Arc::new(TileManager::with_options(tile_width, tile_height, max_memory))
}

/// Mock source behind the trait object the cache expects.
pub fn shared(source: MockSource) -> (Arc<MockSource>, Arc<dyn ImageSource>) {
    let concrete = Arc::new(source);
    let dynamic: Arc<dyn ImageSource> = concrete.clone();
    (concrete, dynamic)
}

/// Row-major `f32` values of a whole image.
pub fn pixels(image: &dyn Image<f32>) -> Vec<f32> {
    image
        .full_chunk()
        .map(|chunk| chunk.to_vec())
        .unwrap_or_else(|e| panic!("reading {} failed: {}", image.repr(), e))
}
