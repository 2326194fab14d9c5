//! Resampling an image to an arbitrary size.

use std::marker::PhantomData;

use super::interpolation::{Interpolant, Interpolation};
use crate::error::{ImageError, IoError};
use crate::image::{Image, Pixel, PixelType};
use crate::io::{check_tile_bounds, ImageSource};
use crate::tile::ImageTile;

/// Source producing a resized copy of an image.
///
/// Upstream pixel `i` is treated as a sample at the centre of its cell in
/// the target grid, `(i + 0.5) * scale - 0.5`. Construction reads the whole
/// upstream image and builds one interpolant per column; each tile then
/// builds one interpolant per row from the column interpolants. Values past
/// the outermost samples are extrapolated.
///
/// The source is read-only. Buffer it with a
/// [`BufferedImage`](crate::image::BufferedImage) to read it.
pub struct ScaledImageSource<T: Pixel> {
    upstream: String,
    width: usize,
    height: usize,
    interpolation: Interpolation,
    x_coords: Vec<f64>,
    columns: Vec<Interpolant>,
    _pixel: PhantomData<fn() -> T>,
}

impl<T: Pixel> ScaledImageSource<T> {
    /// # Panics
    ///
    /// Panics if the upstream image or the target size is empty.
    pub fn new(
        image: &dyn Image<T>,
        width: usize,
        height: usize,
        interpolation: Interpolation,
    ) -> Result<Self, ImageError> {
        let (src_width, src_height) = (image.width(), image.height());
        assert!(
            src_width > 0 && src_height > 0 && width > 0 && height > 0,
            "cannot scale {} of {src_width}x{src_height} to {width}x{height}",
            image.repr()
        );

        let x_coords = sample_coords(src_width, width);
        let y_coords = sample_coords(src_height, height);

        let pixels = image.full_chunk()?;
        let columns = (0..src_width)
            .map(|x| {
                let values = (0..src_height).map(|y| pixels.get(x, y).as_f64()).collect();
                Interpolant::new(y_coords.clone(), values, interpolation)
            })
            .collect();

        Ok(Self {
            upstream: image.repr(),
            width,
            height,
            interpolation,
            x_coords,
            columns,
            _pixel: PhantomData,
        })
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

/// Target-grid positions of the `src` upstream samples.
fn sample_coords(src: usize, target: usize) -> Vec<f64> {
    let scale = target as f64 / src as f64;
    (0..src).map(|i| (i as f64 + 0.5) * scale - 0.5).collect()
}

impl<T: Pixel> ImageSource for ScaledImageSource<T> {
    fn repr(&self) -> String {
        format!(
            "ScaledImageSource<{}x{}>({})",
            self.width, self.height, self.upstream
        )
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        T::TYPE
    }

    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError> {
        check_tile_bounds(self, x, y, width, height)?;
        let mut data = Vec::with_capacity(width * height);
        for row in y..y + height {
            let values = self
                .columns
                .iter()
                .map(|column| column.eval(row as f64))
                .collect();
            let fx = Interpolant::new(self.x_coords.clone(), values, self.interpolation);
            data.extend((x..x + width).map(|col| T::from_f64(fx.eval(col as f64))));
        }
        Ok(ImageTile::from_vec(x, y, width, height, data))
    }

    fn save_tile(&self, _tile: &ImageTile) -> Result<(), IoError> {
        Err(IoError::ReadOnly(self.repr()))
    }
}
