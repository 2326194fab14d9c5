use std::sync::atomic::{AtomicUsize, Ordering};

use num_traits::PrimInt;

use crate::error::ImageError;
use crate::image::{check_chunk_request, Image, ImageChunk, Pixel, SharedImage};

/// Test applied to each mask pixel against the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskOp {
    /// `mask & flag != 0`
    #[default]
    BitAnd,
    /// `mask == flag`
    Equal,
    /// `mask != flag`
    NotEqual,
}

impl MaskOp {
    pub fn apply<M: PrimInt>(self, mask: M, flag: M) -> bool {
        match self {
            MaskOp::BitAnd => (mask & flag) != M::zero(),
            MaskOp::Equal => mask == flag,
            MaskOp::NotEqual => mask != flag,
        }
    }
}

/// Image with masked pixels replaced by a fixed value.
///
/// A pixel is masked when `op(mask(x, y), flag)` holds. Counts of masked and
/// unmasked pixels served are accumulated across all requests.
pub struct MaskedImage<T: Pixel, M: Pixel + PrimInt> {
    upstream: SharedImage<T>,
    mask: SharedImage<M>,
    replacement: T,
    flag: M,
    op: MaskOp,
    masked: AtomicUsize,
    unmasked: AtomicUsize,
}

impl<T: Pixel, M: Pixel + PrimInt> MaskedImage<T, M> {
    /// # Panics
    ///
    /// Panics if the mask and the image differ in size.
    pub fn new(
        upstream: SharedImage<T>,
        mask: SharedImage<M>,
        replacement: T,
        flag: M,
        op: MaskOp,
    ) -> Self {
        assert!(
            upstream.width() == mask.width() && upstream.height() == mask.height(),
            "mask {} of {}x{} does not match image {} of {}x{}",
            mask.repr(),
            mask.width(),
            mask.height(),
            upstream.repr(),
            upstream.width(),
            upstream.height()
        );
        Self {
            upstream,
            mask,
            replacement,
            flag,
            op,
            masked: AtomicUsize::new(0),
            unmasked: AtomicUsize::new(0),
        }
    }

    /// Pixels replaced so far.
    pub fn masked_count(&self) -> usize {
        self.masked.load(Ordering::Relaxed)
    }

    /// Pixels passed through so far.
    pub fn unmasked_count(&self) -> usize {
        self.unmasked.load(Ordering::Relaxed)
    }
}

impl<T: Pixel, M: Pixel + PrimInt> Image<T> for MaskedImage<T, M> {
    fn repr(&self) -> String {
        let area = (self.upstream.width() * self.upstream.height()).max(1);
        format!(
            "Masked({}) with {:.1}% masked pixels",
            self.upstream.repr(),
            100.0 * self.masked_count() as f64 / area as f64
        )
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
        let pixels = self.upstream.chunk(x, y, width, height)?;
        let mask = self.mask.chunk(x, y, width, height)?;

        let mut masked = 0;
        let mut data = Vec::with_capacity(width * height);
        for (line, mask_line) in pixels.rows().zip(mask.rows()) {
            for (&value, &m) in line.iter().zip(mask_line) {
                if self.op.apply(m, self.flag) {
                    masked += 1;
                    data.push(self.replacement);
                } else {
                    data.push(value);
                }
            }
        }
        self.masked.fetch_add(masked, Ordering::Relaxed);
        self.unmasked
            .fetch_add(width * height - masked, Ordering::Relaxed);
        Ok(ImageChunk::from_vec(width, height, data))
    }
}
