//! Dense rectangular pixel views.

use std::sync::Arc;

use super::pixel::Pixel;
use super::traits::{check_chunk_request, Image};
use crate::error::ImageError;

/// Immutable dense rectangle of pixels.
///
/// A chunk is a window of `width x height` pixels starting at `offset` in a
/// shared row-major buffer whose rows are `stride` elements apart. Cloning
/// and sub-chunking never copy pixel data; the buffer lives as long as any
/// chunk referencing it.
#[derive(Clone)]
pub struct ImageChunk<T: Pixel> {
    data: Arc<Vec<T>>,
    offset: usize,
    stride: usize,
    width: usize,
    height: usize,
}

impl<T: Pixel> ImageChunk<T> {
    /// Freeze an owned row-major buffer into a chunk.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "chunk buffer holds {} pixels, expected {width}x{height}",
            data.len()
        );
        Self {
            data: Arc::new(data),
            offset: 0,
            stride: width,
            width,
            height,
        }
    }

    /// View into a shared buffer.
    ///
    /// # Panics
    ///
    /// Panics if the window does not fit inside `data`.
    pub fn from_shared(
        data: Arc<Vec<T>>,
        offset: usize,
        stride: usize,
        width: usize,
        height: usize,
    ) -> Self {
        if width > 0 && height > 0 {
            assert!(stride >= width, "stride {stride} smaller than width {width}");
            let end = offset + (height - 1) * stride + width;
            assert!(
                end <= data.len(),
                "chunk window ends at {end}, buffer holds {}",
                data.len()
            );
        }
        Self {
            data,
            offset,
            stride,
            width,
            height,
        }
    }

    /// Chunk with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self::from_vec(width, height, vec![value; width * height])
    }

    /// Zero-filled chunk.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::zero())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at chunk-local `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` lies outside the chunk.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside chunk of {}x{}",
            self.width,
            self.height
        );
        self.data[self.offset + y * self.stride + x]
    }

    /// Row `y` as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} outside chunk of height {}", self.height);
        let start = self.offset + y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Zero-copy window at chunk-local `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the window leaves the chunk.
    pub fn sub_chunk(&self, x: usize, y: usize, width: usize, height: usize) -> Self {
        check_chunk_request(self, x, y, width, height);
        Self {
            data: Arc::clone(&self.data),
            offset: self.offset + y * self.stride + x,
            stride: self.stride,
            width,
            height,
        }
    }

    /// Owned row-major copy.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// True when both chunks view the same backing buffer.
    pub fn shares_buffer_with(&self, other: &ImageChunk<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T: Pixel> std::fmt::Debug for ImageChunk<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageChunk")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("offset", &self.offset)
            .field("stride", &self.stride)
            .finish()
    }
}

impl<T: Pixel> Image<T> for ImageChunk<T> {
    fn repr(&self) -> String {
        format!("ImageChunk<{}x{}>", self.width, self.height)
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
        Ok(self.sub_chunk(x, y, width, height))
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        Ok(self.get(x, y))
    }
}
