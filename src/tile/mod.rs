//! Tile storage and the tile cache.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     BufferedImage / virtual images      │
//! └────────────────────┬────────────────────┘
//!                      │ tile_for_pixel
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileManager                │
//! │  (source, x, y) -> Arc<ImageTile>       │
//! │  byte budget, insertion-order eviction  │
//! └────────────────────┬────────────────────┘
//!                      │ image_tile / save_tile
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              ImageSource                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! - [`TileManager`]: the cache, usually reached through [`TileManager::global`]
//! - [`ImageTile`]: one typed block of pixels with a modified flag
//! - [`TileKey`]: cache key, compared by source identity
//! - [`CacheStats`]: counters for hits, misses, evictions and saves

mod cache;
mod image_tile;

pub use cache::{
    CacheStats, TileKey, TileManager, DEFAULT_MAX_MEMORY, DEFAULT_TILE_HEIGHT,
    DEFAULT_TILE_WIDTH,
};
pub use image_tile::ImageTile;
