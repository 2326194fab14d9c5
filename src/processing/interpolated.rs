//! Replacing high-variance pixels by nearby good ones.
//!
//! A pixel whose variance is at or above the threshold takes the value of
//! the nearest pixel along a row or column, at most `gap` pixels away, whose
//! variance is below the threshold. At each distance the candidates are tried
//! left, up, right then down. A pixel with no such neighbour keeps its value.

use std::marker::PhantomData;

use crate::error::{ImageError, IoError};
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, PixelType, SharedImage};
use crate::io::{check_tile_bounds, ImageSource};
use crate::tile::ImageTile;

/// Shared inputs of [`InterpolatedImage`] and [`InterpolatedImageSource`].
struct Interpolator<T: Pixel, V: Pixel> {
    image: SharedImage<T>,
    variance: SharedImage<V>,
    threshold: V,
    gap: usize,
}

impl<T: Pixel, V: Pixel> Interpolator<T, V> {
    fn new(image: SharedImage<T>, variance: SharedImage<V>, threshold: V, gap: usize) -> Self {
        assert!(
            image.width() == variance.width() && image.height() == variance.height(),
            "variance {} of {}x{} does not match image {} of {}x{}",
            variance.repr(),
            variance.width(),
            variance.height(),
            image.repr(),
            image.width(),
            image.height()
        );
        Self {
            image,
            variance,
            threshold,
            gap,
        }
    }

    fn repr(&self) -> String {
        format!("Interpolated({}, gap {})", self.image.repr(), self.gap)
    }

    /// Interpolated pixels of the rectangle, row-major.
    fn region(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<Vec<T>, ImageError> {
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        // Read the request plus a `gap` margin, clipped to the image
        let x0 = x.saturating_sub(self.gap);
        let y0 = y.saturating_sub(self.gap);
        let x1 = (x + width + self.gap).min(self.image.width());
        let y1 = (y + height + self.gap).min(self.image.height());
        let pixels = self.image.chunk(x0, y0, x1 - x0, y1 - y0)?;
        let variance = self.variance.chunk(x0, y0, x1 - x0, y1 - y0)?;

        let mut out = Vec::with_capacity(width * height);
        for iy in y - y0..y - y0 + height {
            for ix in x - x0..x - x0 + width {
                out.push(self.pixel(&pixels, &variance, ix, iy));
            }
        }
        Ok(out)
    }

    fn pixel(&self, pixels: &ImageChunk<T>, variance: &ImageChunk<V>, x: usize, y: usize) -> T {
        let good = |cx: usize, cy: usize| variance.get(cx, cy) < self.threshold;
        if good(x, y) {
            return pixels.get(x, y);
        }
        let (w, h) = (pixels.width(), pixels.height());
        for i in 1..=self.gap {
            if x >= i && good(x - i, y) {
                return pixels.get(x - i, y);
            }
            if y >= i && good(x, y - i) {
                return pixels.get(x, y - i);
            }
            if x + i < w && good(x + i, y) {
                return pixels.get(x + i, y);
            }
            if y + i < h && good(x, y + i) {
                return pixels.get(x, y + i);
            }
        }
        pixels.get(x, y)
    }
}

/// Interpolated image computed on every request.
pub struct InterpolatedImage<T: Pixel, V: Pixel> {
    inner: Interpolator<T, V>,
}

impl<T: Pixel, V: Pixel> InterpolatedImage<T, V> {
    /// # Panics
    ///
    /// Panics if the variance map and the image differ in size.
    pub fn new(image: SharedImage<T>, variance: SharedImage<V>, threshold: V, gap: usize) -> Self {
        Self {
            inner: Interpolator::new(image, variance, threshold, gap),
        }
    }
}

impl<T: Pixel, V: Pixel> Image<T> for InterpolatedImage<T, V> {
    fn repr(&self) -> String {
        self.inner.repr()
    }

    fn width(&self) -> usize {
        self.inner.image.width()
    }

    fn height(&self) -> usize {
        self.inner.image.height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        check_chunk_request(self, x, y, width, height);
        let data = self.inner.region(x, y, width, height)?;
        Ok(ImageChunk::from_vec(width, height, data))
    }
}

/// Interpolated image as a read-only tile source, so results are cached.
pub struct InterpolatedImageSource<T: Pixel, V: Pixel> {
    inner: Interpolator<T, V>,
    _pixel: PhantomData<fn() -> T>,
}

impl<T: Pixel, V: Pixel> InterpolatedImageSource<T, V> {
    /// # Panics
    ///
    /// Panics if the variance map and the image differ in size.
    pub fn new(image: SharedImage<T>, variance: SharedImage<V>, threshold: V, gap: usize) -> Self {
        Self {
            inner: Interpolator::new(image, variance, threshold, gap),
            _pixel: PhantomData,
        }
    }
}

impl<T: Pixel, V: Pixel> ImageSource for InterpolatedImageSource<T, V> {
    fn repr(&self) -> String {
        format!("{}Source", self.inner.repr())
    }

    fn width(&self) -> usize {
        self.inner.image.width()
    }

    fn height(&self) -> usize {
        self.inner.image.height()
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
        let data = self
            .inner
            .region(x, y, width, height)
            .map_err(|err| IoError::upstream(self.repr(), &err))?;
        Ok(ImageTile::from_vec(x, y, width, height, data))
    }

    fn save_tile(&self, _tile: &ImageTile) -> Result<(), IoError> {
        Err(IoError::ReadOnly(self.repr()))
    }
}
