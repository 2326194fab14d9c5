use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, SharedImage};

/// Rectangular window into an upstream image.
pub struct ClippedImage<T: Pixel> {
    upstream: SharedImage<T>,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl<T: Pixel> ClippedImage<T> {
    /// # Panics
    ///
    /// Panics if the window leaves the upstream image.
    pub fn new(upstream: SharedImage<T>, x: usize, y: usize, width: usize, height: usize) -> Self {
        check_chunk_request(upstream.as_ref(), x, y, width, height);
        Self {
            upstream,
            x,
            y,
            width,
            height,
        }
    }
}

impl<T: Pixel> Image<T> for ClippedImage<T> {
    fn repr(&self) -> String {
        format!(
            "Clipped({}, {}x{} at ({}, {}))",
            self.upstream.repr(),
            self.width,
            self.height,
            self.x,
            self.y
        )
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        check_chunk_request(self, x, y, width, height);
        self.upstream.chunk(self.x + x, self.y + y, width, height)
    }
}
