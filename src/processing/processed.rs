use std::sync::Arc;

use crate::error::ImageError;
use crate::image::{check_chunk_request, ConstantImage, Image, ImageChunk, Pixel, SharedImage};

/// Pixel-wise binary operation signature used by the named constructors.
pub type BinaryOp<T> = fn(T, T) -> T;

/// Combination of two same-sized images: `op(a(x, y), b(x, y))`.
pub struct ProcessedImage<T: Pixel, F> {
    a: SharedImage<T>,
    b: SharedImage<T>,
    op: F,
    name: &'static str,
}

impl<T, F> ProcessedImage<T, F>
where
    T: Pixel,
    F: Fn(T, T) -> T + Send + Sync,
{
    /// # Panics
    ///
    /// Panics if the images differ in size.
    pub fn new(a: SharedImage<T>, b: SharedImage<T>, name: &'static str, op: F) -> Self {
        assert!(
            a.width() == b.width() && a.height() == b.height(),
            "cannot combine {} of {}x{} with {} of {}x{}",
            a.repr(),
            a.width(),
            a.height(),
            b.repr(),
            b.width(),
            b.height()
        );
        Self { a, b, op, name }
    }

    /// Combine an image with a constant right-hand operand.
    pub fn with_constant(a: SharedImage<T>, value: T, name: &'static str, op: F) -> Self {
        let b: SharedImage<T> = Arc::new(ConstantImage::new(a.width(), a.height(), value));
        Self::new(a, b, name, op)
    }
}

impl<T: Pixel> ProcessedImage<T, BinaryOp<T>> {
    pub fn add(a: SharedImage<T>, b: SharedImage<T>) -> Self {
        Self::new(a, b, "Add", |a, b| a + b)
    }

    pub fn subtract(a: SharedImage<T>, b: SharedImage<T>) -> Self {
        Self::new(a, b, "Subtract", |a, b| a - b)
    }

    pub fn multiply(a: SharedImage<T>, b: SharedImage<T>) -> Self {
        Self::new(a, b, "Multiply", |a, b| a * b)
    }

    /// Integer division by zero panics.
    pub fn divide(a: SharedImage<T>, b: SharedImage<T>) -> Self {
        Self::new(a, b, "Divide", |a, b| a / b)
    }

    /// Signal-to-noise ratio `a / sqrt(b)`, with `b` a variance.
    pub fn snr(a: SharedImage<T>, b: SharedImage<T>) -> Self {
        Self::new(a, b, "Snr", |a, b| T::from_f64(a.as_f64() / b.as_f64().sqrt()))
    }
}

impl<T, F> Image<T> for ProcessedImage<T, F>
where
    T: Pixel,
    F: Fn(T, T) -> T + Send + Sync,
{
    fn repr(&self) -> String {
        format!("{}({}, {})", self.name, self.a.repr(), self.b.repr())
    }

    fn width(&self) -> usize {
        self.a.width()
    }

    fn height(&self) -> usize {
        self.a.height()
    }

    fn chunk(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageChunk<T>, ImageError> {
        check_chunk_request(self, x, y, width, height);
        let a = self.a.chunk(x, y, width, height)?;
        let b = self.b.chunk(x, y, width, height)?;
        let mut data = Vec::with_capacity(width * height);
        for (la, lb) in a.rows().zip(b.rows()) {
            data.extend(la.iter().zip(lb).map(|(&va, &vb)| (self.op)(va, vb)));
        }
        Ok(ImageChunk::from_vec(width, height, data))
    }
}
