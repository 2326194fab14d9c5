use thiserror::Error;

/// Errors raised by backing stores when producing or persisting tiles
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the operating system while reading or writing a file
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Backing file does not exist
    #[error("Image not found: {0}")]
    NotFound(String),

    /// Source cannot persist tiles or metadata
    #[error("Source is read-only: {0}")]
    ReadOnly(String),

    /// File exists but does not hold a valid image
    #[error("Invalid image file {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// A synthesized source could not read the images it is computed from
    #[error("Upstream image of {image} failed: {message}")]
    Upstream { image: String, message: String },

    /// Requested tile rectangle exceeds the image bounds
    #[error(
        "Tile out of bounds: {width}x{height} at ({x}, {y}) exceeds image of {image_width}x{image_height}"
    )]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        image_width: usize,
        image_height: usize,
    },
}

impl IoError {
    /// Wrap an OS error together with the path it happened on.
    pub fn from_io(path: impl std::fmt::Display, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return IoError::NotFound(path.to_string());
        }
        IoError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Wrap the failure of an image a source is computed from.
    pub fn upstream(image: impl std::fmt::Display, err: &ImageError) -> Self {
        IoError::Upstream {
            image: image.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors raised by the tile cache
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The backing source failed to produce a tile; nothing was cached
    #[error("Failed to load tile ({x}, {y}) of {image}: {error}")]
    Load {
        image: String,
        x: usize,
        y: usize,
        #[source]
        error: IoError,
    },

    /// A modified tile could not be written back to its source
    #[error("Failed to save tile ({x}, {y}) of {image}: {error}")]
    Save {
        image: String,
        x: usize,
        y: usize,
        #[source]
        error: IoError,
    },

    /// The source returned a tile with the wrong geometry or pixel type
    #[error("Source {image} returned an invalid tile: {reason}")]
    InvalidTile { image: String, reason: String },
}

/// Errors surfaced through the [`Image`](crate::image::Image) interface
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Cache failure while resolving tiles
    #[error(transparent)]
    Tile(#[from] TileError),

    /// Backing store failure outside the cache
    #[error(transparent)]
    Io(#[from] IoError),
}
