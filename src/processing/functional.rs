use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, SharedImage};

/// Pixel-wise function of an upstream image.
///
/// Each output pixel is `f(x, y, upstream(x, y))` in image coordinates.
pub struct FunctionalImage<T: Pixel, F> {
    upstream: SharedImage<T>,
    function: F,
    name: String,
}

impl<T, F> FunctionalImage<T, F>
where
    T: Pixel,
    F: Fn(usize, usize, T) -> T + Send + Sync,
{
    pub fn new(upstream: SharedImage<T>, name: impl Into<String>, function: F) -> Self {
        Self {
            upstream,
            function,
            name: name.into(),
        }
    }
}

impl<T, F> Image<T> for FunctionalImage<T, F>
where
    T: Pixel,
    F: Fn(usize, usize, T) -> T + Send + Sync,
{
    fn repr(&self) -> String {
        format!("{}({})", self.name, self.upstream.repr())
    }

    fn width(&self) -> usize {
        self.upstream.width()
    }

    fn height(&self) -> usize {
        self.upstream.height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        check_chunk_request(self, x, y, width, height);
        let input = self.upstream.chunk(x, y, width, height)?;
        let mut data = Vec::with_capacity(width * height);
        for (row, line) in input.rows().enumerate() {
            data.extend(
                line.iter()
                    .enumerate()
                    .map(|(col, &v)| (self.function)(x + col, y + row, v)),
            );
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }
}
