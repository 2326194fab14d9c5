use super::chunk::ImageChunk;
use super::pixel::Pixel;
use super::traits::{check_chunk_request, Image};
use crate::error::ImageError;

/// Owned in-memory image.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorImage<T: Pixel> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Pixel> VectorImage<T> {
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "image buffer holds {} pixels, expected {width}x{height}",
            data.len()
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self::from_vec(width, height, vec![value; width * height])
    }

    /// Copy any image into memory.
    pub fn from_image(image: &dyn Image<T>) -> Result<Self, ImageError> {
        Ok(Self::from_vec(
            image.width(),
            image.height(),
            image.full_chunk()?.to_vec(),
        ))
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside image");
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside image");
        self.data[y * self.width + x] = value;
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Pixel> Image<T> for VectorImage<T> {
    fn repr(&self) -> String {
        format!("VectorImage<{}x{}>", self.width, self.height)
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
        let mut out = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            out.extend_from_slice(&self.data[start..start + width]);
        }
        Ok(ImageChunk::from_vec(width, height, out))
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        Ok(self.get(x, y))
    }
}

/// Image whose every pixel is the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantImage<T: Pixel> {
    width: usize,
    height: usize,
    value: T,
}

impl<T: Pixel> ConstantImage<T> {
    pub fn new(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            value,
        }
    }
}

impl<T: Pixel> Image<T> for ConstantImage<T> {
    fn repr(&self) -> String {
        format!("ConstantImage<{}x{}>({:?})", self.width, self.height, self.value)
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
        Ok(ImageChunk::filled(width, height, self.value))
    }

    fn value(&self, x: usize, y: usize) -> Result<T, ImageError> {
        check_chunk_request(self, x, y, 1, 1);
        Ok(self.value)
    }
}
