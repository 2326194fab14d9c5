//! Closed set of pixel element types.
//!
//! Tiles are stored untyped in the cache, so the element type travels as a
//! [`PixelType`] tag next to a [`TileBuffer`], the tagged buffer variant. The
//! sealed [`Pixel`] trait maps each supported Rust type to its tag and pulls a
//! typed view back out of a buffer.
//!
//! Adding a pixel type means extending [`PixelType`], [`TileBuffer`], the
//! `impl_pixel!` list and [`with_pixel_type!`](crate::with_pixel_type).

use std::fmt;
use std::sync::Arc;

use num_traits::Num;
use serde::{Deserialize, Serialize};

// =============================================================================
// Pixel Type Tag
// =============================================================================

/// Pixel element type tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    /// 32-bit IEEE float
    F32,
    /// 64-bit IEEE float
    F64,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit signed integer
    I64,
}

impl PixelType {
    /// Every supported pixel type.
    pub const ALL: [PixelType; 5] = [
        PixelType::F32,
        PixelType::F64,
        PixelType::I32,
        PixelType::U32,
        PixelType::I64,
    ];

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            PixelType::F32 | PixelType::I32 | PixelType::U32 => 4,
            PixelType::F64 | PixelType::I64 => 8,
        }
    }

    /// Code stored in raw image headers.
    pub const fn code(self) -> u8 {
        match self {
            PixelType::F32 => 1,
            PixelType::F64 => 2,
            PixelType::I32 => 3,
            PixelType::U32 => 4,
            PixelType::I64 => 5,
        }
    }

    /// Decode a header code.
    pub fn from_code(code: u8) -> Option<Self> {
        PixelType::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Short lowercase name (`f32`, `u32`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            PixelType::F32 => "f32",
            PixelType::F64 => "f64",
            PixelType::I32 => "i32",
            PixelType::U32 => "u32",
            PixelType::I64 => "i64",
        }
    }

    /// Allocate a zero-filled buffer of `len` elements of this type.
    pub fn zeroed(self, len: usize) -> TileBuffer {
        crate::with_pixel_type!(self, T => T::into_buffer(vec![T::default(); len]))
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `$body` with `$t` bound to the Rust type behind a [`PixelType`].
///
/// ```
/// use skyframe::{with_pixel_type, Pixel, PixelType};
///
/// let size = with_pixel_type!(PixelType::F64, T => std::mem::size_of::<T>());
/// assert_eq!(size, 8);
/// ```
#[macro_export]
macro_rules! with_pixel_type {
    ($pixel_type:expr, $t:ident => $body:expr) => {
        match $pixel_type {
            $crate::PixelType::F32 => {
                type $t = f32;
                $body
            }
            $crate::PixelType::F64 => {
                type $t = f64;
                $body
            }
            $crate::PixelType::I32 => {
                type $t = i32;
                $body
            }
            $crate::PixelType::U32 => {
                type $t = u32;
                $body
            }
            $crate::PixelType::I64 => {
                type $t = i64;
                $body
            }
        }
    };
}

// =============================================================================
// Tagged Buffer
// =============================================================================

/// Dense pixel buffer tagged with its element type.
///
/// Each variant holds a reference-counted vector so chunks can share tile
/// memory without copying; writers go through `Arc::make_mut`.
#[derive(Debug, Clone)]
pub enum TileBuffer {
    F32(Arc<Vec<f32>>),
    F64(Arc<Vec<f64>>),
    I32(Arc<Vec<i32>>),
    U32(Arc<Vec<u32>>),
    I64(Arc<Vec<i64>>),
}

impl TileBuffer {
    /// Element type of this buffer.
    pub fn pixel_type(&self) -> PixelType {
        match self {
            TileBuffer::F32(_) => PixelType::F32,
            TileBuffer::F64(_) => PixelType::F64,
            TileBuffer::I32(_) => PixelType::I32,
            TileBuffer::U32(_) => PixelType::U32,
            TileBuffer::I64(_) => PixelType::I64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            TileBuffer::F32(d) => d.len(),
            TileBuffer::F64(d) => d.len(),
            TileBuffer::I32(d) => d.len(),
            TileBuffer::U32(d) => d.len(),
            TileBuffer::I64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Footprint in bytes, as counted by the tile cache.
    pub fn memory_size(&self) -> usize {
        self.len() * self.pixel_type().size()
    }
}

// =============================================================================
// Pixel Trait
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A pixel element type from the closed set.
pub trait Pixel:
    sealed::Sealed + Num + Copy + Default + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    /// Tag for this type.
    const TYPE: PixelType;

    /// Typed view of a buffer, `None` when the tags differ.
    fn buffer(buffer: &TileBuffer) -> Option<&Arc<Vec<Self>>>;

    /// Mutable typed view of a buffer, `None` when the tags differ.
    fn buffer_mut(buffer: &mut TileBuffer) -> Option<&mut Arc<Vec<Self>>>;

    /// Wrap a vector into a tagged buffer.
    fn into_buffer(data: Vec<Self>) -> TileBuffer;

    /// Lossy conversion used by interpolation and arithmetic.
    fn as_f64(self) -> f64;

    /// Lossy (saturating for integers) conversion back from `f64`.
    fn from_f64(value: f64) -> Self;

    /// Append the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from the first `TYPE.size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident) => {
        impl sealed::Sealed for $t {}

        impl Pixel for $t {
            const TYPE: PixelType = PixelType::$variant;

            #[inline]
            fn buffer(buffer: &TileBuffer) -> Option<&Arc<Vec<Self>>> {
                match buffer {
                    TileBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }

            #[inline]
            fn buffer_mut(buffer: &mut TileBuffer) -> Option<&mut Arc<Vec<Self>>> {
                match buffer {
                    TileBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }

            fn into_buffer(data: Vec<Self>) -> TileBuffer {
                TileBuffer::$variant(Arc::new(data))
            }

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                const SIZE: usize = std::mem::size_of::<$t>();
                let mut raw = [0u8; SIZE];
                raw.copy_from_slice(&bytes[..SIZE]);
                <$t>::from_le_bytes(raw)
            }
        }
    };
}

impl_pixel!(f32, F32);
impl_pixel!(f64, F64);
impl_pixel!(i32, I32);
impl_pixel!(u32, U32);
impl_pixel!(i64, I64);
