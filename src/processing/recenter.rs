use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, PixelCoordinate, SharedImage};

/// Cyclic shift moving `center` to the origin.
///
/// Pixel `(x, y)` is `upstream((x + cx) mod W, (y + cy) mod H)`. A request is
/// served with at most four upstream chunks, one per wrapped quadrant.
pub struct RecenterImage<T: Pixel> {
    upstream: SharedImage<T>,
    cx: usize,
    cy: usize,
}

impl<T: Pixel> RecenterImage<T> {
    /// The center wraps around the image, negative values included.
    ///
    /// # Panics
    ///
    /// Panics if the upstream image is empty.
    pub fn new(upstream: SharedImage<T>, center: PixelCoordinate) -> Self {
        let (width, height) = (upstream.width(), upstream.height());
        assert!(
            width > 0 && height > 0,
            "cannot recenter empty image {}",
            upstream.repr()
        );
        Self {
            cx: center.x.rem_euclid(width as i64) as usize,
            cy: center.y.rem_euclid(height as i64) as usize,
            upstream,
        }
    }

    /// Shift moving the geometric center `(W/2, H/2)` to the origin.
    pub fn centered(upstream: SharedImage<T>) -> Self {
        let center = PixelCoordinate::new(
            (upstream.width() / 2) as i64,
            (upstream.height() / 2) as i64,
        );
        Self::new(upstream, center)
    }
}

/// Split `[start, start + len)` shifted by `shift` modulo `size` into
/// `(output offset, upstream start, length)` spans.
fn wrapped_spans(
    start: usize,
    len: usize,
    shift: usize,
    size: usize,
) -> Vec<(usize, usize, usize)> {
    let first = (start + shift) % size;
    let head = len.min(size - first);
    let mut spans = vec![(0, first, head)];
    if head < len {
        spans.push((head, 0, len - head));
    }
    spans
}

impl<T: Pixel> Image<T> for RecenterImage<T> {
    fn repr(&self) -> String {
        format!("Recenter({}, {}, {})", self.upstream.repr(), self.cx, self.cy)
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
        if width == 0 || height == 0 {
            return Ok(ImageChunk::from_vec(width, height, Vec::new()));
        }
        let x_spans = wrapped_spans(x, width, self.cx, self.width());
        let y_spans = wrapped_spans(y, height, self.cy, self.height());
        if let ([(_, sx, _)], [(_, sy, _)]) = (x_spans.as_slice(), y_spans.as_slice()) {
            return self.upstream.chunk(*sx, *sy, width, height);
        }

        let mut data = vec![T::zero(); width * height];
        for &(oy, sy, h) in &y_spans {
            for &(ox, sx, w) in &x_spans {
                let part = self.upstream.chunk(sx, sy, w, h)?;
                for (row, line) in part.rows().enumerate() {
                    let start = (oy + row) * width + ox;
                    data[start..start + w].copy_from_slice(line);
                }
            }
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }
}
