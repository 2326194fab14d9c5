use std::sync::Arc;

use super::chunk::ImageChunk;
use super::pixel::Pixel;
use crate::error::ImageError;

/// Random-access rectangular pixel data.
///
/// Implementations are either backed by the tile cache
/// ([`BufferedImage`](super::BufferedImage)) or synthesized from upstream
/// images. All coordinates are pixels from the top-left corner.
///
/// Requesting a chunk that leaves the image is a caller bug and panics; only
/// backing-store failures are reported through `Err`.
pub trait Image<T: Pixel>: Send + Sync {
    /// Human-readable description, nested for composed images.
    fn repr(&self) -> String;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Dense copy or view of the rectangle at `(x, y)`.
    fn chunk(&self, x: usize, y: usize, width: usize, height: usize)
        -> Result<ImageChunk<T>, ImageError>;

    /// Single pixel, read through a 1x1 chunk.
    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        Ok(self.chunk(x, y, 1, 1)?.get(0, 0))
    }

    /// The whole image as one chunk.
    fn full_chunk(&self) -> Result<ImageChunk<T>, ImageError> {
        self.chunk(0, 0, self.width(), self.height())
    }
}

/// Image accepting single-pixel writes.
pub trait WriteableImage<T: Pixel>: Image<T> {
    fn set_value(&self, x: usize, y: usize, value: T) -> Result<(), ImageError>;
}

/// Shared handle to any image.
pub type SharedImage<T> = Arc<dyn Image<T>>;

impl<T: Pixel, I: Image<T> + ?Sized> Image<T> for Arc<I> {
    fn repr(&self) -> String {
        (**self).repr()
    }

    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        (**self).chunk(x, y, width, height)
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        (**self).value(x, y)
    }
}

/// Panic unless the rectangle lies within `image`.
///
/// Zero-area requests are accepted as long as the origin does not pass the
/// far edge.
#[track_caller]
pub(crate) fn check_chunk_request<T: Pixel, I: Image<T> + ?Sized>(
    image: &I,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) {
    let (image_width, image_height) = (image.width(), image.height());
    let fits = x.checked_add(width).is_some_and(|end| end <= image_width)
        && y.checked_add(height).is_some_and(|end| end <= image_height);
    assert!(
        fits,
        "chunk {width}x{height} at ({x}, {y}) outside {} of {image_width}x{image_height}",
        image.repr()
    );
}
