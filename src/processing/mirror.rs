use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, SharedImage};

/// Upstream image rotated by 180 degrees: `upstream(W-1-x, H-1-y)`.
pub struct MirrorImage<T: Pixel> {
    upstream: SharedImage<T>,
}

impl<T: Pixel> MirrorImage<T> {
    pub fn new(upstream: SharedImage<T>) -> Self {
        Self { upstream }
    }
}

impl<T: Pixel> Image<T> for MirrorImage<T> {
    fn repr(&self) -> String {
        format!("Mirror({})", self.upstream.repr())
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
        let source = self.upstream.chunk(
            self.width() - x - width,
            self.height() - y - height,
            width,
            height,
        )?;
        let mut data = Vec::with_capacity(width * height);
        for row in (0..height).rev() {
            data.extend(source.row(row).iter().rev().copied());
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }
}
