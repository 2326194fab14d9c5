//! The image abstraction.
//!
//! # Architecture
//!
//! - [`Image`]: random-access rectangular pixel data, the interface every
//!   pipeline stage consumes
//! - [`ImageChunk`]: dense, immutable, possibly shared rectangle of pixels
//! - [`Pixel`] / [`PixelType`] / [`TileBuffer`]: the closed set of element types
//! - [`BufferedImage`] / [`WriteableBufferedImage`]: images over an
//!   [`ImageSource`](crate::io::ImageSource), read through the tile cache
//! - [`VectorImage`] / [`ConstantImage`]: in-memory images
//! - [`ImageAccessor`]: cheap repeated single-pixel reads

mod accessor;
mod buffered;
mod chunk;
mod coordinate;
mod pixel;
mod traits;
mod vector;

pub use accessor::{AccessHint, ImageAccessor, DEFAULT_READ_HEIGHT, DEFAULT_READ_WIDTH};
pub use buffered::{BufferedImage, WriteableBufferedImage};
pub use chunk::ImageChunk;
pub use coordinate::PixelCoordinate;
pub use pixel::{Pixel, PixelType, TileBuffer};
pub(crate) use traits::check_chunk_request;
pub use traits::{Image, SharedImage, WriteableImage};
pub use vector::{ConstantImage, VectorImage};
