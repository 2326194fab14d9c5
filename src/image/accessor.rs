//! Chunked single-pixel reads.

use super::chunk::ImageChunk;
use super::pixel::Pixel;
use super::traits::Image;
use crate::error::ImageError;

/// Default read width of an [`ImageAccessor`]
pub const DEFAULT_READ_WIDTH: usize = 64;

/// Default read height of an [`ImageAccessor`]
pub const DEFAULT_READ_HEIGHT: usize = 1;

/// Where upcoming reads are expected relative to the coordinate that missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessHint {
    /// Reads move right and down
    #[default]
    TopLeft,
    /// Reads stay around the coordinate
    Centered,
    /// Reads move left and up
    BottomRight,
}

/// Pixel reader that fetches whole chunks and serves later reads from them.
///
/// Holds one chunk at a time. A read outside it drops the chunk and fetches a
/// new `read_width x read_height` window placed around the coordinate
/// according to the [`AccessHint`] and clipped to the image. Not meant to be
/// shared between threads; create one accessor per worker.
///
/// ```
/// use skyframe::{AccessHint, ImageAccessor, VectorImage};
///
/// let image = VectorImage::from_vec(4, 1, vec![1.0f64, 2.0, 3.0, 4.0]);
/// let mut accessor = ImageAccessor::with_hint(&image, AccessHint::TopLeft, 4, 1);
/// let sum: f64 = (0..4).map(|x| accessor.value(x, 0).unwrap()).sum();
/// assert_eq!(sum, 10.0);
/// ```
pub struct ImageAccessor<'a, T: Pixel> {
    image: &'a dyn Image<T>,
    hint: AccessHint,
    read_width: usize,
    read_height: usize,
    chunk: Option<ImageChunk<T>>,
    chunk_x: usize,
    chunk_y: usize,
}

impl<'a, T: Pixel> ImageAccessor<'a, T> {
    /// Top-left hint with 64x1 reads.
    pub fn new(image: &'a dyn Image<T>) -> Self {
        Self::with_hint(image, AccessHint::TopLeft, DEFAULT_READ_WIDTH, DEFAULT_READ_HEIGHT)
    }

    /// # Panics
    ///
    /// Panics if a read dimension is zero.
    pub fn with_hint(
        image: &'a dyn Image<T>,
        hint: AccessHint,
        read_width: usize,
        read_height: usize,
    ) -> Self {
        assert!(
            read_width > 0 && read_height > 0,
            "read size must be non-zero, got {read_width}x{read_height}"
        );
        Self {
            image,
            hint,
            read_width,
            read_height,
            chunk: None,
            chunk_x: 0,
            chunk_y: 0,
        }
    }

    /// Pixel at image coordinate `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the image.
    pub fn value(&mut self, x: usize, y: usize) -> Result<T, ImageError> {
        let (width, height) = (self.image.width(), self.image.height());
        assert!(
            x < width && y < height,
            "pixel ({x}, {y}) outside {} of {width}x{height}",
            self.image.repr()
        );

        if let Some(chunk) = &self.chunk {
            if x >= self.chunk_x
                && y >= self.chunk_y
                && x < self.chunk_x + chunk.width()
                && y < self.chunk_y + chunk.height()
            {
                return Ok(chunk.get(x - self.chunk_x, y - self.chunk_y));
            }
        }

        self.chunk = None;
        let (cx, cy) = self.window_origin(x, y);
        let cw = self.read_width.min(width - cx);
        let ch = self.read_height.min(height - cy);
        let chunk = self.image.chunk(cx, cy, cw, ch)?;
        let value = chunk.get(x - cx, y - cy);
        self.chunk = Some(chunk);
        self.chunk_x = cx;
        self.chunk_y = cy;
        Ok(value)
    }

    pub fn hint(&self) -> AccessHint {
        self.hint
    }

    pub fn repr(&self) -> String {
        self.image.repr()
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Forwarded to the wrapped image; does not touch the held chunk.
    pub fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        self.image.chunk(x, y, width, height)
    }

    fn window_origin(&self, x: usize, y: usize) -> (usize, usize) {
        let (x, y) = (x as i64, y as i64);
        let (w, h) = (self.read_width as i64, self.read_height as i64);
        let (ox, oy) = match self.hint {
            AccessHint::TopLeft => (x, y),
            AccessHint::Centered => (x - w / 2, y - h / 2),
            AccessHint::BottomRight => (x - w + 1, y - h + 1),
        };
        // The window always contains (x, y) after clipping
        (ox.max(0) as usize, oy.max(0) as usize)
    }
}
