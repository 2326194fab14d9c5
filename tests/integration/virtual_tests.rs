//! Virtual image integration tests.
//!
//! Tests verify the pixel rules of the composing image types against
//! reference tables, alone and stacked on buffered sources.

use std::sync::Arc;

use approx::assert_abs_diff_eq;

use skyframe::{
    BufferedImage, ClippedImage, FunctionalImage, Image, ImageSource, InterpolatedImage,
    InterpolatedImageSource, Interpolation, MaskOp, MaskedImage, MemorySource, MirrorImage,
    PaddedImage, Padding, PixelCoordinate, ProcessedImage, RecenterImage, ScaledImageSource,
    SharedImage, VectorImage,
};

use super::test_utils::{manager, pixels};

fn one_to_nine() -> SharedImage<f32> {
    Arc::new(VectorImage::from_vec(
        3,
        3,
        (1..=9).map(|v| v as f32).collect(),
    ))
}

fn padded(size: usize, padding: Padding<f32>) -> Vec<f32> {
    pixels(&PaddedImage::new(one_to_nine(), size, size, padding))
}

/// Read through a private cache with small tiles.
fn buffered(source: impl ImageSource + 'static, tile: usize) -> BufferedImage<f32> {
    BufferedImage::with_manager(Arc::new(source), manager(tile, tile, 1 << 20))
}

// =============================================================================
// Padding
// =============================================================================

#[test]
fn test_reflect101_padding() {
    #[rustfmt::skip]
    let expected = vec![
        5., 4., 5., 6., 5.,
        2., 1., 2., 3., 2.,
        5., 4., 5., 6., 5.,
        8., 7., 8., 9., 8.,
        5., 4., 5., 6., 5.,
    ];
    assert_eq!(padded(5, Padding::Reflect101), expected);
}

#[test]
fn test_constant_padding() {
    #[rustfmt::skip]
    let expected = vec![
        0., 0., 0., 0., 0.,
        0., 1., 2., 3., 0.,
        0., 4., 5., 6., 0.,
        0., 7., 8., 9., 0.,
        0., 0., 0., 0., 0.,
    ];
    assert_eq!(padded(5, Padding::Constant(0.0)), expected);
}

#[test]
fn test_replicate_padding() {
    #[rustfmt::skip]
    let expected = vec![
        1., 1., 1., 2., 3., 3., 3.,
        1., 1., 1., 2., 3., 3., 3.,
        1., 1., 1., 2., 3., 3., 3.,
        4., 4., 4., 5., 6., 6., 6.,
        7., 7., 7., 8., 9., 9., 9.,
        7., 7., 7., 8., 9., 9., 9.,
        7., 7., 7., 8., 9., 9., 9.,
    ];
    assert_eq!(padded(7, Padding::Replicate), expected);
}

#[test]
fn test_reflect_padding() {
    #[rustfmt::skip]
    let expected = vec![
        5., 4., 4., 5., 6., 6., 5.,
        2., 1., 1., 2., 3., 3., 2.,
        2., 1., 1., 2., 3., 3., 2.,
        5., 4., 4., 5., 6., 6., 5.,
        8., 7., 7., 8., 9., 9., 8.,
        8., 7., 7., 8., 9., 9., 8.,
        5., 4., 4., 5., 6., 6., 5.,
    ];
    assert_eq!(padded(7, Padding::Reflect), expected);
}

#[test]
fn test_wrap_padding() {
    #[rustfmt::skip]
    let expected = vec![
        9., 7., 8., 9., 7.,
        3., 1., 2., 3., 1.,
        6., 4., 5., 6., 4.,
        9., 7., 8., 9., 7.,
        3., 1., 2., 3., 1.,
    ];
    assert_eq!(padded(5, Padding::Wrap), expected);
}

#[test]
fn test_padding_sub_chunks_match_full_image() {
    let image = PaddedImage::new(one_to_nine(), 7, 7, Padding::Reflect101);
    let full = pixels(&image);
    for (x, y, w, h) in [(0, 0, 2, 2), (1, 3, 5, 2), (5, 5, 2, 2), (2, 2, 3, 3)] {
        let chunk = image.chunk(x, y, w, h).unwrap();
        for cy in 0..h {
            for cx in 0..w {
                assert_eq!(chunk.get(cx, cy), full[(y + cy) * 7 + x + cx]);
            }
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

#[test]
fn test_mirror_twice_is_identity() {
    let data: Vec<f32> = (0..15).map(|v| v as f32 * 1.5).collect();
    let image: SharedImage<f32> = Arc::new(VectorImage::from_vec(5, 3, data.clone()));
    let once: SharedImage<f32> = Arc::new(MirrorImage::new(image));
    let twice = MirrorImage::new(once.clone());

    assert_eq!(pixels(&twice), data);
    assert_eq!(once.value(0, 0).unwrap(), 21.0);
    assert_eq!(
        twice.chunk(1, 1, 3, 2).unwrap().to_vec(),
        vec![9.0, 10.5, 12.0, 16.5, 18.0, 19.5]
    );
}

#[test]
fn test_recenter_over_buffered_source() {
    let source = MemorySource::from_vec(4, 3, (0..12).map(|v| v as f32).collect());
    let image: SharedImage<f32> = Arc::new(buffered(source, 2));
    let recentered = RecenterImage::new(image, PixelCoordinate::new(1, 2));

    #[rustfmt::skip]
    let expected = vec![
        9., 10., 11., 8.,
        1., 2., 3., 0.,
        5., 6., 7., 4.,
    ];
    assert_eq!(pixels(&recentered), expected);
}

#[test]
fn test_clipped_then_mirrored() {
    let image: SharedImage<f32> = Arc::new(ClippedImage::new(one_to_nine(), 1, 0, 2, 3));
    let mirrored = MirrorImage::new(image);
    assert_eq!(pixels(&mirrored), vec![9., 8., 6., 5., 3., 2.]);
}

// =============================================================================
// Masking and Arithmetic
// =============================================================================

#[test]
fn test_masked_image_counts() {
    let mask: SharedImage<u32> = Arc::new(VectorImage::from_vec(3, 3, (0..9u32).collect()));
    let masked = MaskedImage::new(one_to_nine(), mask, -1.0, 1u32, MaskOp::BitAnd);

    assert_eq!(pixels(&masked), vec![1., -1., 3., -1., 5., -1., 7., -1., 9.]);
    assert_eq!(masked.masked_count(), 4);
    assert_eq!(masked.unmasked_count(), 5);

    let flags: SharedImage<i32> =
        Arc::new(VectorImage::from_vec(3, 3, vec![0, 2, 0, 0, 2, 0, 0, 0, 0]));
    let equal = MaskedImage::new(one_to_nine(), flags, 0.0, 2, MaskOp::Equal);
    assert_eq!(equal.chunk(0, 0, 3, 2).unwrap().to_vec(), vec![1., 0., 3., 4., 0., 6.]);
}

#[test]
fn test_snr_over_buffered_sources() {
    let signal = buffered(MemorySource::from_vec(2, 2, vec![10.0f32, 20.0, 30.0, 40.0]), 1);
    let variance = buffered(MemorySource::from_vec(2, 2, vec![4.0f32, 16.0, 25.0, 100.0]), 1);
    let snr = ProcessedImage::snr(Arc::new(signal), Arc::new(variance));
    assert_eq!(pixels(&snr), vec![5.0, 5.0, 6.0, 4.0]);
}

#[test]
fn test_functional_on_processed() {
    let sum: SharedImage<f32> = Arc::new(ProcessedImage::add(one_to_nine(), one_to_nine()));
    let offset = FunctionalImage::new(sum, "AddX", |x: usize, _y: usize, v: f32| v + x as f32);
    assert_eq!(pixels(&offset), vec![2., 5., 8., 8., 11., 14., 14., 17., 20.]);
}

// =============================================================================
// Interpolation
// =============================================================================

fn variance_with_bad_column(column: usize) -> SharedImage<f32> {
    let data: Vec<f32> = (0..16)
        .map(|i| if i % 4 == column { 5.0 } else { 1.0 })
        .collect();
    Arc::new(VectorImage::from_vec(4, 4, data))
}

fn four_by_four() -> SharedImage<f32> {
    Arc::new(VectorImage::from_vec(4, 4, (0..16).map(|v| v as f32).collect()))
}

#[test]
fn test_bad_column_takes_left_neighbour() {
    let image = InterpolatedImage::new(four_by_four(), variance_with_bad_column(2), 2.0, 1);
    #[rustfmt::skip]
    let expected = vec![
        0., 1., 1., 3.,
        4., 5., 5., 7.,
        8., 9., 9., 11.,
        12., 13., 13., 15.,
    ];
    assert_eq!(pixels(&image), expected);
}

#[test]
fn test_interpolated_source_through_cache() {
    let source = InterpolatedImageSource::new(four_by_four(), variance_with_bad_column(2), 2.0, 1);
    let image = buffered(source, 2);
    assert_eq!(image.chunk(2, 0, 1, 4).unwrap().to_vec(), vec![1., 5., 9., 13.]);
    assert_eq!(image.value(3, 3).unwrap(), 15.0);
}

// =============================================================================
// Scaling
// =============================================================================

#[test]
fn test_bilinear_scaling_reference() {
    let image = VectorImage::from_vec(3, 3, vec![1.0f32, 4.0, 3.0, 2.0, 3.0, 2.0, 3.0, 4.0, 5.0]);
    let source = ScaledImageSource::new(&image, 9, 9, Interpolation::Linear).unwrap();
    let scaled = pixels(&buffered(source, 4));

    #[rustfmt::skip]
    let expected = [
        -0.55555556, 0.66666667, 1.88888889, 3.11111111, 4.33333333, 4., 3.66666667, 3.33333333, 3.,
        0., 1., 2., 3., 4., 3.66666667, 3.33333333, 3., 2.66666667,
        0.55555556, 1.33333333, 2.11111111, 2.88888889, 3.66666667, 3.33333333, 3., 2.66666667, 2.33333333,
        1.11111111, 1.66666667, 2.22222222, 2.77777778, 3.33333333, 3., 2.66666667, 2.33333333, 2.,
        1.66666667, 2., 2.33333333, 2.66666667, 3., 2.66666667, 2.33333333, 2., 1.66666667,
        2., 2.33333333, 2.66666667, 3., 3.33333333, 3.22222222, 3.11111111, 3., 2.88888889,
        2.33333333, 2.66666667, 3., 3.33333333, 3.66666667, 3.77777778, 3.88888889, 4., 4.11111111,
        2.66666667, 3., 3.33333333, 3.66666667, 4., 4.33333333, 4.66666667, 5., 5.33333333,
        3., 3.33333333, 3.66666667, 4., 4.33333333, 4.88888889, 5.44444444, 6., 6.55555556,
    ];
    assert_eq!(scaled.len(), expected.len());
    for (got, want) in scaled.iter().zip(expected) {
        assert_abs_diff_eq!(*got, want as f32, epsilon = 1e-5);
    }
}

#[test]
fn test_cubic_scaling_keeps_samples() {
    let data = vec![1.0f64, 4.0, 3.0, 2.0, 3.0, 2.0, 3.0, 4.0, 5.0];
    let image = VectorImage::from_vec(3, 3, data.clone());
    let source = ScaledImageSource::new(&image, 9, 9, Interpolation::Cubic).unwrap();
    let tile = source.image_tile(0, 0, 9, 9).unwrap();
    let scaled = tile.data::<f64>();

    for (i, want) in data.iter().enumerate() {
        let (x, y) = (1 + 3 * (i % 3), 1 + 3 * (i / 3));
        assert_abs_diff_eq!(scaled[y * 9 + x], *want, epsilon = 1e-9);
    }
}

#[test]
fn test_single_pixel_scales_to_constant() {
    let image = VectorImage::from_vec(1, 1, vec![2.5f32]);
    for kind in [Interpolation::Linear, Interpolation::Cubic] {
        let source = ScaledImageSource::new(&image, 5, 3, kind).unwrap();
        assert_eq!(pixels(&buffered(source, 2)), vec![2.5; 15]);
    }
}

#[test]
fn test_downscaling_linear_ramp() {
    // A linear ramp stays linear under linear resampling
    let image = VectorImage::from_vec(8, 1, (0..8).map(|v| v as f32).collect());
    let source = ScaledImageSource::new(&image, 4, 1, Interpolation::Linear).unwrap();
    let scaled = pixels(&buffered(source, 4));
    for (got, want) in scaled.iter().zip([0.5f32, 2.5, 4.5, 6.5]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
    }
}
