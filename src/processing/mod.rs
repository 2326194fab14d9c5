//! Virtual images.
//!
//! Each type wraps one or more upstream images and computes its pixels on
//! request. Nothing is stored except for [`ScaledImageSource`], which keeps
//! its column interpolants, and the `*Source` types, which are meant to be
//! read through a [`BufferedImage`](crate::image::BufferedImage) so their
//! results land in the tile cache.
//!
//! | Type | Pixel |
//! |---|---|
//! | [`FunctionalImage`] | `f(x, y, upstream(x, y))` |
//! | [`PaddedImage`] | upstream centred, borders from a [`Padding`] policy |
//! | [`MaskedImage`] | replacement where the mask matches the flag |
//! | [`MirrorImage`] | `upstream(W-1-x, H-1-y)` |
//! | [`RecenterImage`] | cyclic shift |
//! | [`InterpolatedImage`] | high-variance pixels from a good neighbour |
//! | [`ScaledImageSource`] | resized by separable interpolation |
//! | [`ProcessedImage`] | `op(a(x, y), b(x, y))` |
//! | [`ClippedImage`] | window into the upstream |
//!
//! Dimension mismatches between operands panic at construction.

mod clipped;
mod functional;
mod interpolated;
mod interpolation;
mod masked;
mod mirror;
mod padded;
mod processed;
mod recenter;
mod scaled;

pub use clipped::ClippedImage;
pub use functional::FunctionalImage;
pub use interpolated::{InterpolatedImage, InterpolatedImageSource};
pub use interpolation::{Interpolant, Interpolation};
pub use masked::{MaskOp, MaskedImage};
pub use mirror::MirrorImage;
pub use padded::{PaddedImage, Padding};
pub use processed::{BinaryOp, ProcessedImage};
pub use recenter::RecenterImage;
pub use scaled::ScaledImageSource;
