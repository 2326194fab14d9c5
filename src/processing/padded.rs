//! Padding an image to a larger size.
//!
//! The upstream image is centred in the padded one: it starts at
//! `((W' - W) / 2, (H' - H) / 2)`. Outside of it, coordinates are remapped by
//! the [`Padding`] policy, one axis at a time:
//!
//! ```text
//! Constant    iiii|01234|iiii
//! Replicate   0000|01234|4444
//! Reflect     3210|01234|4321
//! Reflect101  4321|01234|3210
//! Wrap        1234|01234|0123
//! ```

use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, SharedImage};

/// How pixels outside the upstream image are produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Padding<T> {
    /// Fixed value
    Constant(T),
    /// Repeat the edge pixel
    Replicate,
    /// Mirror, repeating the edge pixel
    Reflect,
    /// Mirror around the edge pixel
    Reflect101,
    /// Periodic
    Wrap,
}

impl<T> Padding<T> {
    /// Map a coordinate of any sign into `[0, size)`.
    ///
    /// Returns `None` for constant padding outside the range.
    pub fn map(&self, v: i64, size: usize) -> Option<usize> {
        let n = size as i64;
        if (0..n).contains(&v) {
            return Some(v as usize);
        }
        let mapped = match self {
            Padding::Constant(_) => return None,
            Padding::Replicate => v.clamp(0, n - 1),
            Padding::Reflect => {
                let v = if v < 0 { (v + 1).abs() } else { v };
                let (period, offset) = (v / n, v % n);
                if period % 2 == 0 {
                    offset
                } else {
                    n - offset - 1
                }
            }
            Padding::Reflect101 => {
                let max = n - 1;
                if max == 0 {
                    0
                } else {
                    let v = v.abs();
                    let (period, offset) = (v / max, v % max);
                    if period % 2 == 0 {
                        offset
                    } else {
                        max - offset
                    }
                }
            }
            Padding::Wrap => v.rem_euclid(n),
        };
        Some(mapped as usize)
    }
}

/// Upstream image enlarged with padding.
pub struct PaddedImage<T: Pixel> {
    upstream: SharedImage<T>,
    width: usize,
    height: usize,
    padding: Padding<T>,
    left: usize,
    top: usize,
}

impl<T: Pixel> PaddedImage<T> {
    /// # Panics
    ///
    /// Panics if the target is smaller than the upstream image in either
    /// dimension, or if the upstream image is empty.
    pub fn new(upstream: SharedImage<T>, width: usize, height: usize, padding: Padding<T>) -> Self {
        assert!(
            width >= upstream.width() && height >= upstream.height(),
            "cannot pad {} of {}x{} to {width}x{height}",
            upstream.repr(),
            upstream.width(),
            upstream.height()
        );
        assert!(
            upstream.width() > 0 && upstream.height() > 0,
            "cannot pad empty image {}",
            upstream.repr()
        );
        let left = (width - upstream.width()) / 2;
        let top = (height - upstream.height()) / 2;
        Self {
            upstream,
            width,
            height,
            padding,
            left,
            top,
        }
    }

    /// Position of the upstream image inside the padded one.
    pub fn offset(&self) -> (usize, usize) {
        (self.left, self.top)
    }

    fn constant_chunk(
        &self,
        fill: T,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        let mut data = vec![fill; width * height];
        let x0 = x.max(self.left);
        let y0 = y.max(self.top);
        let x1 = (x + width).min(self.left + self.upstream.width());
        let y1 = (y + height).min(self.top + self.upstream.height());
        if x0 < x1 && y0 < y1 {
            let inner = self
                .upstream
                .chunk(x0 - self.left, y0 - self.top, x1 - x0, y1 - y0)?;
            for (row, line) in inner.rows().enumerate() {
                let start = (y0 - y + row) * width + (x0 - x);
                data[start..start + line.len()].copy_from_slice(line);
            }
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }

    fn remapped_chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        let columns = axis_map(&self.padding, x, width, self.left, self.upstream.width());
        let rows = axis_map(&self.padding, y, height, self.top, self.upstream.height());
        let (Some(&cmin), Some(&cmax)) = (columns.iter().min(), columns.iter().max()) else {
            return Ok(ImageChunk::from_vec(width, height, Vec::new()));
        };
        let (Some(&rmin), Some(&rmax)) = (rows.iter().min(), rows.iter().max()) else {
            return Ok(ImageChunk::from_vec(width, height, Vec::new()));
        };

        let source = self
            .upstream
            .chunk(cmin, rmin, cmax - cmin + 1, rmax - rmin + 1)?;
        let mut data = Vec::with_capacity(width * height);
        for &row in &rows {
            let line = source.row(row - rmin);
            data.extend(columns.iter().map(|&col| line[col - cmin]));
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }
}

fn axis_map<T>(
    padding: &Padding<T>,
    start: usize,
    len: usize,
    pad: usize,
    size: usize,
) -> Vec<usize> {
    (start..start + len)
        .map(|v| {
            padding
                .map(v as i64 - pad as i64, size)
                .unwrap_or_default()
        })
        .collect()
}

impl<T: Pixel> Image<T> for PaddedImage<T> {
    fn repr(&self) -> String {
        format!(
            "PaddedImage<{}x{}>({})",
            self.width,
            self.height,
            self.upstream.repr()
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
        let inside = x >= self.left
            && y >= self.top
            && x + width <= self.left + self.upstream.width()
            && y + height <= self.top + self.upstream.height();
        if inside {
            return self
                .upstream
                .chunk(x - self.left, y - self.top, width, height);
        }
        match self.padding {
            Padding::Constant(fill) => self.constant_chunk(fill, x, y, width, height),
            _ => self.remapped_chunk(x, y, width, height),
        }
    }
}
