use super::metadata::Metadata;
use crate::error::IoError;
use crate::image::PixelType;
use crate::tile::ImageTile;

/// Backing store that produces and persists fixed-size tiles.
///
/// Width, height and pixel type never change over the lifetime of a source.
/// The tile cache is the only caller of [`image_tile`](Self::image_tile) and
/// [`save_tile`](Self::save_tile); images read sources through
/// [`BufferedImage`](crate::image::BufferedImage).
pub trait ImageSource: Send + Sync {
    /// Human-readable description used in logs and errors.
    fn repr(&self) -> String;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn pixel_type(&self) -> PixelType;

    /// Produce the fully populated tile covering `width x height` at `(x, y)`.
    ///
    /// The rectangle is already clipped to the image by the caller.
    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError>;

    /// Persist a modified tile. Must be idempotent.
    fn save_tile(&self, tile: &ImageTile) -> Result<(), IoError>;

    fn metadata(&self) -> Metadata {
        Metadata::new()
    }

    fn set_metadata(&self, _metadata: Metadata) -> Result<(), IoError> {
        Err(IoError::ReadOnly(self.repr()))
    }
}

/// Error unless the rectangle fits inside `source`.
pub(crate) fn check_tile_bounds(
    source: &dyn ImageSource,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Result<(), IoError> {
    let (image_width, image_height) = (source.width(), source.height());
    if x + width > image_width || y + height > image_height {
        return Err(IoError::OutOfBounds {
            x,
            y,
            width,
            height,
            image_width,
            image_height,
        });
    }
    Ok(())
}
