//! # skyframe
//!
//! Lazy, composable, tile-cached images for astronomical pipelines.
//!
//! Images larger than memory are read through a process-wide tile cache
//! with a byte budget. Transformations (padding, masking, mirroring,
//! recentring, interpolation, scaling, arithmetic) are virtual images that
//! compute pixels on request from their upstream images.
//!
//! ## Architecture
//!
//! - [`image`] - the [`Image`] trait, chunks, pixel types, buffered images
//!   and the single-pixel [`ImageAccessor`]
//! - [`tile`] - [`TileManager`], the tile cache, and [`ImageTile`]
//! - [`io`] - the [`ImageSource`] trait and the bundled backing stores
//! - [`processing`] - virtual images
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use skyframe::{BufferedImage, Image, MemorySource, MirrorImage, TileManager};
//!
//! let source = Arc::new(MemorySource::from_vec(4, 2, (0..8).collect::<Vec<i32>>()));
//! let manager = Arc::new(TileManager::with_options(2, 2, 1 << 20));
//! let image = Arc::new(BufferedImage::<i32>::with_manager(source, manager));
//!
//! let mirrored = MirrorImage::new(image);
//! assert_eq!(mirrored.value(0, 0).unwrap(), 7);
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod io;
pub mod processing;
pub mod tile;

// Re-export commonly used types
pub use config::{CacheConfig, Cli, Command, CreateConfig, InfoConfig, TransformConfig};
pub use error::{ImageError, IoError, TileError};
pub use image::{
    AccessHint, BufferedImage, ConstantImage, Image, ImageAccessor, ImageChunk, Pixel,
    PixelCoordinate, PixelType, SharedImage, TileBuffer, VectorImage, WriteableBufferedImage,
    WriteableImage,
};
pub use io::{
    ImageSource, MemorySource, Metadata, MetadataEntry, MetadataValue, RawFileSource,
    TemporaryFileSource,
};
pub use processing::{
    ClippedImage, FunctionalImage, InterpolatedImage, InterpolatedImageSource, Interpolation,
    MaskOp, MaskedImage, MirrorImage, PaddedImage, Padding, ProcessedImage, RecenterImage,
    ScaledImageSource,
};
pub use tile::{CacheStats, ImageTile, TileManager};
