//! Uncompressed on-disk image format.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//!      0     8  magic "SKYRAW01"
//!      8     1  pixel type code (see PixelType::code)
//!      9     3  reserved, zero
//!     12     4  width, u32 LE
//!     16     4  height, u32 LE
//!     20     4  metadata length in bytes, u32 LE
//!     24     n  metadata, JSON object of key -> {value, comment}
//!   24+n     .  pixels, row-major, little-endian
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::metadata::Metadata;
use super::source::{check_tile_bounds, ImageSource};
use crate::error::IoError;
use crate::image::{Pixel, PixelType};
use crate::tile::ImageTile;
use crate::with_pixel_type;

/// File signature
pub const RAW_MAGIC: &[u8; 8] = b"SKYRAW01";

/// Size of the fixed header preceding the metadata
pub const RAW_HEADER_SIZE: usize = 24;

/// Image stored in a raw file.
///
/// Tiles are read and written row by row with positioned I/O on a single
/// handle guarded by a mutex. Metadata is fixed at creation.
pub struct RawFileSource {
    path: PathBuf,
    file: Mutex<File>,
    pixel_type: PixelType,
    width: usize,
    height: usize,
    metadata: Metadata,
    data_offset: u64,
}

impl RawFileSource {
    /// Create (or truncate) a zero-filled image file.
    pub fn create(
        path: impl AsRef<Path>,
        width: usize,
        height: usize,
        pixel_type: PixelType,
        metadata: Metadata,
    ) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| IoError::from_io(path.display(), e))?;
        Self::initialize(file, path, width, height, pixel_type, metadata)
    }

    /// Write a fresh header and zeroed pixels into an open, empty file.
    pub(crate) fn initialize(
        mut file: File,
        path: PathBuf,
        width: usize,
        height: usize,
        pixel_type: PixelType,
        metadata: Metadata,
    ) -> Result<Self, IoError> {
        let display = path.display().to_string();
        let json = serde_json::to_vec(&metadata).map_err(|e| IoError::InvalidFormat {
            path: display.clone(),
            reason: format!("cannot encode metadata: {e}"),
        })?;
        let too_large = || IoError::InvalidFormat {
            path: display.clone(),
            reason: format!("{width}x{height} image or metadata too large for the header"),
        };
        let header =
            encode_header(pixel_type, width, height, json.len()).ok_or_else(too_large)?;

        let data_offset = (RAW_HEADER_SIZE + json.len()) as u64;
        let total = file_size(data_offset, width, height, pixel_type).ok_or_else(too_large)?;
        let io = |e: std::io::Error| IoError::from_io(&display, e);
        file.set_len(0).map_err(io)?;
        file.write_all(&header).map_err(io)?;
        file.write_all(&json).map_err(io)?;
        // Extending the file zero-fills the pixel area
        file.set_len(total).map_err(io)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            pixel_type,
            width,
            height,
            metadata,
            data_offset,
        })
    }

    /// Open an existing image file and validate its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        let io = |e: std::io::Error| IoError::from_io(&display, e);
        let invalid = |reason: String| IoError::InvalidFormat {
            path: display.clone(),
            reason,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io)?;
        let file_len = file.metadata().map_err(io)?.len();

        let mut header = [0u8; RAW_HEADER_SIZE];
        if file_len < RAW_HEADER_SIZE as u64 {
            return Err(invalid(format!("file is only {file_len} bytes long")));
        }
        file.read_exact(&mut header).map_err(io)?;

        if &header[0..8] != RAW_MAGIC {
            return Err(invalid("bad magic".to_string()));
        }
        let pixel_type = PixelType::from_code(header[8])
            .ok_or_else(|| invalid(format!("unknown pixel type code {}", header[8])))?;
        let width = read_u32(&header[12..16]) as usize;
        let height = read_u32(&header[16..20]) as usize;
        let metadata_len = read_u32(&header[20..24]) as usize;

        let data_offset = (RAW_HEADER_SIZE + metadata_len) as u64;
        let expected = file_size(data_offset, width, height, pixel_type).ok_or_else(|| {
            invalid(format!("{width}x{height} {pixel_type} image does not fit in 64 bits"))
        })?;
        if file_len < expected {
            return Err(invalid(format!(
                "{width}x{height} {pixel_type} image needs {expected} bytes, file has {file_len}"
            )));
        }

        let mut json = vec![0u8; metadata_len];
        file.read_exact(&mut json).map_err(io)?;
        let metadata: Metadata = if json.is_empty() {
            Metadata::new()
        } else {
            serde_json::from_slice(&json).map_err(|e| invalid(format!("bad metadata: {e}")))?
        };

        Ok(Self {
            path,
            file: Mutex::new(file),
            pixel_type,
            width,
            height,
            metadata,
            data_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite every pixel with `value`.
    ///
    /// Bypasses the tile cache; flush it first if tiles of this file may be
    /// resident.
    pub fn fill<T: Pixel>(&self, value: T) -> Result<(), IoError> {
        self.check_type(T::TYPE)?;
        let mut row = Vec::with_capacity(self.width * T::TYPE.size());
        for _ in 0..self.width {
            value.write_le(&mut row);
        }
        let mut file = self.file.lock();
        for y in 0..self.height {
            self.write_at(&mut file, self.pixel_offset(0, y), &row)?;
        }
        Ok(())
    }

    fn pixel_offset(&self, x: usize, y: usize) -> u64 {
        self.data_offset + ((y * self.width + x) * self.pixel_type.size()) as u64
    }

    fn check_type(&self, pixel_type: PixelType) -> Result<(), IoError> {
        if pixel_type != self.pixel_type {
            return Err(IoError::InvalidFormat {
                path: self.path.display().to_string(),
                reason: format!("file holds {} pixels, got {pixel_type}", self.pixel_type),
            });
        }
        Ok(())
    }

    fn read_at(&self, file: &mut File, offset: u64, buf: &mut [u8]) -> Result<(), IoError> {
        let io = |e: std::io::Error| IoError::from_io(self.path.display(), e);
        file.seek(SeekFrom::Start(offset)).map_err(io)?;
        file.read_exact(buf).map_err(io)
    }

    fn write_at(&self, file: &mut File, offset: u64, buf: &[u8]) -> Result<(), IoError> {
        let io = |e: std::io::Error| IoError::from_io(self.path.display(), e);
        file.seek(SeekFrom::Start(offset)).map_err(io)?;
        file.write_all(buf).map_err(io)
    }
}

impl fmt::Debug for RawFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFileSource")
            .field("path", &self.path)
            .field("pixel_type", &self.pixel_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl ImageSource for RawFileSource {
    fn repr(&self) -> String {
        format!("RawFileSource({})", self.path.display())
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn image_tile(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageTile, IoError> {
        check_tile_bounds(self, x, y, width, height)?;
        let size = self.pixel_type.size();
        let row_bytes = width * size;
        let mut bytes = vec![0u8; row_bytes * height];
        {
            let mut file = self.file.lock();
            for (row, buf) in bytes.chunks_exact_mut(row_bytes.max(1)).enumerate() {
                self.read_at(&mut file, self.pixel_offset(x, y + row), buf)?;
            }
        }
        let buffer = with_pixel_type!(self.pixel_type, T => {
            T::into_buffer(bytes.chunks_exact(size).map(T::read_le).collect())
        });
        Ok(ImageTile::from_buffer(x, y, width, height, buffer))
    }

    fn save_tile(&self, tile: &ImageTile) -> Result<(), IoError> {
        check_tile_bounds(self, tile.x(), tile.y(), tile.width(), tile.height())?;
        self.check_type(tile.pixel_type())?;
        let row_bytes = tile.width() * self.pixel_type.size();
        let mut bytes = Vec::with_capacity(row_bytes * tile.height());
        with_pixel_type!(self.pixel_type, T => {
            for &value in tile.data::<T>().iter() {
                value.write_le(&mut bytes);
            }
        });

        let mut file = self.file.lock();
        for (row, buf) in bytes.chunks_exact(row_bytes.max(1)).enumerate() {
            self.write_at(&mut file, self.pixel_offset(tile.x(), tile.y() + row), buf)?;
        }
        Ok(())
    }

    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }
}

fn encode_header(
    pixel_type: PixelType,
    width: usize,
    height: usize,
    metadata_len: usize,
) -> Option<[u8; RAW_HEADER_SIZE]> {
    let mut header = [0u8; RAW_HEADER_SIZE];
    header[0..8].copy_from_slice(RAW_MAGIC);
    header[8] = pixel_type.code();
    header[12..16].copy_from_slice(&u32::try_from(width).ok()?.to_le_bytes());
    header[16..20].copy_from_slice(&u32::try_from(height).ok()?.to_le_bytes());
    header[20..24].copy_from_slice(&u32::try_from(metadata_len).ok()?.to_le_bytes());
    Some(header)
}

/// Total file length for a pixel area starting at `data_offset`.
fn file_size(data_offset: u64, width: usize, height: usize, pixel_type: PixelType) -> Option<u64> {
    (width as u64)
        .checked_mul(height as u64)?
        .checked_mul(pixel_type.size() as u64)?
        .checked_add(data_offset)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
