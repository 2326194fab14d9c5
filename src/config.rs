//! Configuration management for the skyframe command-line tool.
//!
//! Arguments are parsed with clap. The cache settings can also come from
//! environment variables with the `SKYFRAME_` prefix:
//!
//! - `SKYFRAME_TILE_WIDTH` - Tile width in pixels (default: 256)
//! - `SKYFRAME_TILE_HEIGHT` - Tile height in pixels (default: 256)
//! - `SKYFRAME_CACHE_MB` - Tile cache budget in megabytes (default: 100)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use skyframe::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Info(config) = cli.command {
//!     println!("Inspecting {}", config.path.display());
//! }
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::image::{Pixel, PixelCoordinate, PixelType};
use crate::io::{Metadata, MetadataEntry, MetadataValue};
use crate::processing::{Interpolation, Padding};
use crate::tile::{DEFAULT_MAX_MEMORY, DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH};

// =============================================================================
// Default Values
// =============================================================================

/// Default cache budget in megabytes.
pub const DEFAULT_CACHE_MB: usize = DEFAULT_MAX_MEMORY / (1024 * 1024);

// =============================================================================
// CLI Arguments
// =============================================================================

/// skyframe - tile-cached images for astronomical pipelines.
///
/// Creates, inspects and transforms raw image files through a bounded tile
/// cache, so images larger than memory can be processed.
#[derive(Parser, Debug, Clone)]
#[command(name = "skyframe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a raw image file.
    Create(CreateConfig),
    /// Print dimensions, metadata and pixel statistics of a raw image file.
    Info(InfoConfig),
    /// Apply a chain of transformations and write the result to a new file.
    Transform(TransformConfig),
}

impl Command {
    /// Validate the selected subcommand.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Command::Create(config) => config.validate(),
            Command::Info(config) => config.validate(),
            Command::Transform(config) => config.validate(),
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// Tile cache settings shared by the subcommands that read images.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Tile width in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_WIDTH, env = "SKYFRAME_TILE_WIDTH")]
    pub tile_width: usize,

    /// Tile height in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_HEIGHT, env = "SKYFRAME_TILE_HEIGHT")]
    pub tile_height: usize,

    /// Tile cache budget in megabytes.
    #[arg(long, default_value_t = DEFAULT_CACHE_MB, env = "SKYFRAME_CACHE_MB")]
    pub cache_mb: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            cache_mb: DEFAULT_CACHE_MB,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err("tile_width and tile_height must be greater than 0".to_string());
        }
        if self.cache_mb == 0 {
            return Err("cache_mb must be at least 1".to_string());
        }
        Ok(())
    }

    /// Cache budget in bytes.
    pub fn max_memory(&self) -> usize {
        self.cache_mb.saturating_mul(1024 * 1024)
    }
}

// =============================================================================
// Create Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CreateConfig {
    /// Path of the file to create. An existing file is overwritten.
    pub path: PathBuf,

    /// Image width in pixels.
    #[arg(long)]
    pub width: usize,

    /// Image height in pixels.
    #[arg(long)]
    pub height: usize,

    /// Pixel element type.
    #[arg(long, value_enum, default_value_t = PixelType::F32)]
    pub pixel_type: PixelType,

    /// Value every pixel is set to. Pixels are zero otherwise.
    #[arg(long)]
    pub fill: Option<f64>,

    /// Metadata entry as KEY=VALUE. Can be repeated.
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,
}

impl CreateConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        self.metadata().map(|_| ())
    }

    /// Metadata from the `--meta` entries.
    ///
    /// `true`/`false` become booleans, then integers and floats are tried
    /// before falling back to a string.
    pub fn metadata(&self) -> Result<Metadata, String> {
        let mut metadata = Metadata::new();
        for entry in &self.meta {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| format!("invalid metadata entry '{}': expected KEY=VALUE", entry))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("invalid metadata entry '{}': empty key", entry));
            }
            metadata.insert(key.to_string(), MetadataEntry::new(parse_value(value), ""));
        }
        Ok(metadata)
    }
}

fn parse_value(value: &str) -> MetadataValue {
    if let Ok(b) = value.parse::<bool>() {
        MetadataValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        MetadataValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        MetadataValue::Float(f)
    } else {
        MetadataValue::Str(value.to_string())
    }
}

// =============================================================================
// Info Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Raw image file to inspect.
    pub path: PathBuf,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub cache: CacheConfig,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()
    }
}

// =============================================================================
// Transform Configuration
// =============================================================================

/// Pair of sizes given as `W,H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = split_pair(s)?;
        let parse = |v: &str| {
            v.parse::<usize>()
                .map_err(|_| format!("invalid size '{}' in '{}'", v, s))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

/// Parse a `CX,CY` pixel coordinate; negative values are allowed.
pub fn parse_coordinate(s: &str) -> Result<PixelCoordinate, String> {
    let (x, y) = split_pair(s)?;
    let parse = |v: &str| {
        v.parse::<i64>()
            .map_err(|_| format!("invalid coordinate '{}' in '{}'", v, s))
    };
    Ok(PixelCoordinate::new(parse(x)?, parse(y)?))
}

fn split_pair(s: &str) -> Result<(&str, &str), String> {
    s.split_once(',')
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| format!("expected two comma-separated values, got '{}'", s))
}

/// Padding policy selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PaddingArg {
    /// Fill with --pad-value
    #[default]
    Constant,
    Replicate,
    Reflect,
    Reflect101,
    Wrap,
}

impl PaddingArg {
    pub fn to_padding<T: Pixel>(self, value: f64) -> Padding<T> {
        match self {
            PaddingArg::Constant => Padding::Constant(T::from_f64(value)),
            PaddingArg::Replicate => Padding::Replicate,
            PaddingArg::Reflect => Padding::Reflect,
            PaddingArg::Reflect101 => Padding::Reflect101,
            PaddingArg::Wrap => Padding::Wrap,
        }
    }
}

/// Transformations are applied in the order mirror, recenter, pad, scale.
#[derive(Args, Debug, Clone)]
pub struct TransformConfig {
    /// Raw image file to read.
    pub input: PathBuf,

    /// Raw image file to write. An existing file is overwritten.
    pub output: PathBuf,

    /// Rotate the image by 180 degrees.
    #[arg(long, default_value_t = false)]
    pub mirror: bool,

    /// Cyclically shift the image so CX,CY becomes the origin.
    #[arg(long, value_name = "CX,CY", value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub recenter: Option<PixelCoordinate>,

    /// Pad the image to W,H, centred.
    #[arg(long, value_name = "W,H")]
    pub pad: Option<Dimensions>,

    /// How padded pixels are produced.
    #[arg(long, value_enum, default_value_t = PaddingArg::Constant)]
    pub padding: PaddingArg,

    /// Fill value for constant padding.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub pad_value: f64,

    /// Resample the image to W,H.
    #[arg(long, value_name = "W,H")]
    pub scale: Option<Dimensions>,

    /// Interpolation used by --scale.
    #[arg(long, value_enum, default_value_t = Interpolation::Cubic)]
    pub interpolation: Interpolation,

    #[command(flatten)]
    pub cache: CacheConfig,
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        if self.input == self.output {
            return Err("input and output must be different files".to_string());
        }
        for (name, dims) in [("pad", self.pad), ("scale", self.scale)] {
            if let Some(d) = dims {
                if d.width == 0 || d.height == 0 {
                    return Err(format!("{} size must be greater than 0", name));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
