//! Process-wide tile cache.
//!
//! [`TileManager`] maps `(source, tile origin)` to resident [`ImageTile`]s
//! under a byte budget. Every image backed by an [`ImageSource`] reads its
//! pixels through this cache.
//!
//! # Cache Key
//!
//! Tiles are keyed by:
//! - Source identity (the `Arc` pointer, never the contents)
//! - Tile X origin, aligned down to the tile grid
//! - Tile Y origin, aligned down to the tile grid
//!
//! # Eviction
//!
//! Tiles are evicted in insertion order: a hit does not refresh a tile.
//! Whenever the resident bytes exceed the budget, the oldest tiles are saved
//! (if modified) and dropped until usage fits again. The newest tile is never
//! evicted, so a single tile larger than the budget is still served.
//!
//! # Locking
//!
//! Lookups take a shared lock. A miss then takes a per-source mutex so that
//! concurrent misses on one source collapse into one load, re-checks the map
//! and loads outside of the global lock. Insertion and eviction run under the
//! exclusive lock, which is where modified tiles are written back.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::ImageTile;
use crate::error::TileError;
use crate::io::ImageSource;

/// Default tile width in pixels
pub const DEFAULT_TILE_WIDTH: usize = 256;

/// Default tile height in pixels
pub const DEFAULT_TILE_HEIGHT: usize = 256;

/// Default cache budget: 100MB
pub const DEFAULT_MAX_MEMORY: usize = 100 * 1024 * 1024;

// =============================================================================
// Cache Key
// =============================================================================

/// Identity of a cached tile.
///
/// Holds a strong reference to the source so a cached tile can always be
/// saved. Equality and hashing use the source's address.
#[derive(Clone)]
pub struct TileKey {
    source: Arc<dyn ImageSource>,
    x: usize,
    y: usize,
}

impl TileKey {
    fn new(source: &Arc<dyn ImageSource>, x: usize, y: usize) -> Self {
        Self {
            source: Arc::clone(source),
            x,
            y,
        }
    }

    pub fn source(&self) -> &Arc<dyn ImageSource> {
        &self.source
    }

    /// Tile origin on the grid.
    pub fn origin(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    fn source_id(&self) -> usize {
        source_id(&self.source)
    }
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.source_id() == other.source_id() && self.x == other.x && self.y == other.y
    }
}

impl Eq for TileKey {}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_id().hash(state);
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl fmt::Debug for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{:#x} ({}, {})",
            self.source.repr(),
            self.source_id(),
            self.x,
            self.y
        )
    }
}

fn source_id(source: &Arc<dyn ImageSource>) -> usize {
    Arc::as_ptr(source) as *const () as usize
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters accumulated since the manager was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub saves: u64,
    pub tiles: usize,
    pub memory_used: usize,
    pub peak_memory: usize,
    pub max_memory: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// =============================================================================
// Tile Manager
// =============================================================================

struct CacheState {
    tile_width: usize,
    tile_height: usize,
    max_memory: usize,
    /// Unbounded; the byte budget drives eviction. Only `peek` is used for
    /// lookups so the order stays the insertion order.
    tiles: LruCache<TileKey, Arc<ImageTile>>,
    memory_used: usize,
    peak_memory: usize,
}

/// Bounded, thread-safe cache of image tiles.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use skyframe::{ImageSource, MemorySource, TileManager};
///
/// let manager = TileManager::with_options(2, 2, 1024);
/// let source: Arc<dyn ImageSource> = Arc::new(MemorySource::from_vec(4, 4, vec![1.0f32; 16]));
///
/// let first = manager.tile_for_pixel(3, 1, &source).unwrap();
/// let second = manager.tile_for_pixel(2, 0, &source).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!((first.x(), first.y()), (2, 0));
/// ```
pub struct TileManager {
    state: RwLock<CacheState>,
    source_locks: Mutex<HashMap<usize, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    saves: AtomicU64,
}

impl TileManager {
    /// Manager with 256x256 tiles and a 100MB budget.
    pub fn new() -> Self {
        Self::with_options(DEFAULT_TILE_WIDTH, DEFAULT_TILE_HEIGHT, DEFAULT_MAX_MEMORY)
    }

    /// Manager with the given tile geometry and budget in bytes.
    ///
    /// # Panics
    ///
    /// Panics if a tile dimension is zero.
    pub fn with_options(tile_width: usize, tile_height: usize, max_memory: usize) -> Self {
        assert!(
            tile_width > 0 && tile_height > 0,
            "tile size must be non-zero, got {tile_width}x{tile_height}"
        );
        Self {
            state: RwLock::new(CacheState {
                tile_width,
                tile_height,
                max_memory,
                tiles: LruCache::unbounded(),
                memory_used: 0,
                peak_memory: 0,
            }),
            source_locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            saves: AtomicU64::new(0),
        }
    }

    /// The process-wide manager, created with default options on first use.
    pub fn global() -> Arc<TileManager> {
        static GLOBAL: OnceLock<Arc<TileManager>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TileManager::new())))
    }

    /// Change tile geometry and budget.
    ///
    /// Flushes every tile first since the old tile boundaries no longer
    /// apply. Must not race with other users of the cache. Returns the first
    /// save failure of the flush; the new options are applied regardless.
    ///
    /// # Panics
    ///
    /// Panics if a tile dimension is zero.
    pub fn set_options(
        &self,
        tile_width: usize,
        tile_height: usize,
        max_memory: usize,
    ) -> Result<(), TileError> {
        assert!(
            tile_width > 0 && tile_height > 0,
            "tile size must be non-zero, got {tile_width}x{tile_height}"
        );
        let flushed = self.flush();
        {
            let mut state = self.state.write();
            state.tile_width = tile_width;
            state.tile_height = tile_height;
            state.max_memory = max_memory;
        }
        self.source_locks.lock().clear();
        info!(
            tile_width,
            tile_height, max_memory, "Tile cache reconfigured"
        );
        flushed
    }

    /// Tile containing pixel `(x, y)` of `source`, loading it on a miss.
    ///
    /// Concurrent callers asking for the same uncached tile observe a single
    /// load and the same `Arc`. A load failure leaves the cache untouched.
    /// If admitting the tile forced an eviction whose save failed, that
    /// error is returned even though the tile itself is now cached.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the source.
    pub fn tile_for_pixel(
        &self,
        x: usize,
        y: usize,
        source: &Arc<dyn ImageSource>,
    ) -> Result<Arc<ImageTile>, TileError> {
        let (width, height) = (source.width(), source.height());
        assert!(
            x < width && y < height,
            "pixel ({x}, {y}) outside {} of {width}x{height}",
            source.repr()
        );

        // Fast path: shared lock only
        let (key, tile_width, tile_height) = {
            let state = self.state.read();
            let key = TileKey::new(
                source,
                x / state.tile_width * state.tile_width,
                y / state.tile_height * state.tile_height,
            );
            if let Some(tile) = state.tiles.peek(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(tile));
            }
            (key, state.tile_width, state.tile_height)
        };

        // Slow path: one loader per source
        let lock = self.source_lock(source);
        let _guard = lock.lock();

        if let Some(tile) = self.state.read().tiles.peek(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(tile));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let (tx, ty) = key.origin();
        let load_width = tile_width.min(width - tx);
        let load_height = tile_height.min(height - ty);
        debug!(
            source = %source.repr(),
            x = tx,
            y = ty,
            width = load_width,
            height = load_height,
            "Tile cache miss"
        );

        let tile = source
            .image_tile(tx, ty, load_width, load_height)
            .map_err(|error| TileError::Load {
                image: source.repr(),
                x: tx,
                y: ty,
                error,
            })?;
        check_loaded_tile(source.as_ref(), &tile, tx, ty, load_width, load_height)?;

        let tile = Arc::new(tile);
        tile.attach(source);
        self.admit(key, Arc::clone(&tile))?;
        Ok(tile)
    }

    /// Save every modified tile and empty the cache.
    ///
    /// A tile whose save fails is still dropped, with its modifications
    /// lost. Returns the first failure.
    pub fn flush(&self) -> Result<(), TileError> {
        let mut first_error = None;
        let mut retired = Vec::new();
        let count;
        {
            let mut state = self.state.write();
            count = state.tiles.len();
            while let Some((key, tile)) = state.tiles.pop_lru() {
                self.retire(&key, &tile, &mut first_error);
                state.memory_used = state.memory_used.saturating_sub(tile.memory_size());
                retired.push(tile);
            }
            self.prune_source_locks(&state);
        }
        drop(retired);

        if count > 0 {
            info!(tiles = count, failed = first_error.is_some(), "Flushed tile cache");
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Save every modified tile, keeping all tiles resident.
    ///
    /// Tiles whose save fails stay modified. Returns the first failure.
    pub fn save_all_tiles(&self) -> Result<(), TileError> {
        let state = self.state.read();
        let mut first_error = None;
        let mut saved = 0usize;
        for (key, tile) in state.tiles.iter() {
            match tile.save_if_modified(key.source.as_ref()) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(error) => {
                    error!(
                        source = %key.source.repr(),
                        x = key.x,
                        y = key.y,
                        error = %error,
                        "Failed to save tile"
                    );
                    first_error.get_or_insert(TileError::Save {
                        image: key.source.repr(),
                        x: key.x,
                        y: key.y,
                        error,
                    });
                }
            }
        }
        self.saves.fetch_add(saved as u64, Ordering::Relaxed);
        if saved > 0 {
            debug!(tiles = saved, "Saved modified tiles");
        }
        first_error.map_or(Ok(()), Err)
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn tile_width(&self) -> usize {
        self.state.read().tile_width
    }

    pub fn tile_height(&self) -> usize {
        self.state.read().tile_height
    }

    /// Budget in bytes.
    pub fn max_memory(&self) -> usize {
        self.state.read().max_memory
    }

    /// Bytes held by resident tiles.
    pub fn memory_used(&self) -> usize {
        self.state.read().memory_used
    }

    /// Number of resident tiles.
    pub fn len(&self) -> usize {
        self.state.read().tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().tiles.is_empty()
    }

    /// True if the tile holding pixel `(x, y)` of `source` is resident.
    pub fn contains(&self, x: usize, y: usize, source: &Arc<dyn ImageSource>) -> bool {
        let state = self.state.read();
        let key = TileKey::new(
            source,
            x / state.tile_width * state.tile_width,
            y / state.tile_height * state.tile_height,
        );
        state.tiles.contains(&key)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
            tiles: state.tiles.len(),
            memory_used: state.memory_used,
            peak_memory: state.peak_memory,
            max_memory: state.max_memory,
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn source_lock(&self, source: &Arc<dyn ImageSource>) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock();
        Arc::clone(locks.entry(source_id(source)).or_default())
    }

    /// Forget loader locks of sources with no resident tile.
    ///
    /// A lock still held by a loader is kept.
    fn prune_source_locks(&self, state: &CacheState) {
        let resident: HashSet<usize> = state.tiles.iter().map(|(key, _)| key.source_id()).collect();
        self.source_locks
            .lock()
            .retain(|id, lock| resident.contains(id) || Arc::strong_count(lock) > 1);
    }

    /// Insert a freshly loaded tile and evict down to the budget.
    fn admit(&self, key: TileKey, tile: Arc<ImageTile>) -> Result<(), TileError> {
        let size = tile.memory_size();
        let mut first_error = None;
        let mut evicted = Vec::new();
        {
            let mut state = self.state.write();
            if size > state.max_memory {
                warn!(
                    source = %key.source.repr(),
                    tile_bytes = size,
                    max_memory = state.max_memory,
                    "Tile exceeds the cache budget on its own"
                );
            }
            state.tiles.push(key, tile);
            state.memory_used += size;
            state.peak_memory = state.peak_memory.max(state.memory_used);

            while state.memory_used > state.max_memory && state.tiles.len() > 1 {
                let Some((old_key, old_tile)) = state.tiles.pop_lru() else {
                    break;
                };
                debug!(
                    source = %old_key.source.repr(),
                    x = old_key.x,
                    y = old_key.y,
                    modified = old_tile.is_modified(),
                    "Evicting tile"
                );
                self.retire(&old_key, &old_tile, &mut first_error);
                state.memory_used = state.memory_used.saturating_sub(old_tile.memory_size());
                self.evictions.fetch_add(1, Ordering::Relaxed);
                evicted.push(old_tile);
            }
            if !evicted.is_empty() {
                self.prune_source_locks(&state);
            }
        }
        drop(evicted);
        first_error.map_or(Ok(()), Err)
    }

    /// Save a tile leaving the cache. On failure its writes are dropped.
    fn retire(&self, key: &TileKey, tile: &ImageTile, first_error: &mut Option<TileError>) {
        tile.mark_evicted();
        match tile.save_if_modified(key.source.as_ref()) {
            Ok(true) => {
                self.saves.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(error) => {
                error!(
                    source = %key.source.repr(),
                    x = key.x,
                    y = key.y,
                    error = %error,
                    "Failed to save evicted tile, modifications lost"
                );
                tile.discard_modifications();
                first_error.get_or_insert(TileError::Save {
                    image: key.source.repr(),
                    x: key.x,
                    y: key.y,
                    error,
                });
            }
        }
    }
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TileManager {
    fn drop(&mut self) {
        if let Err(err) = self.save_all_tiles() {
            error!(error = %err, "Failed to save tiles while dropping the tile cache");
        }
        for (_, tile) in self.state.get_mut().tiles.iter() {
            tile.mark_evicted();
        }
    }
}

impl fmt::Debug for TileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("TileManager")
            .field("tile_width", &self.tile_width())
            .field("tile_height", &self.tile_height())
            .field("stats", &stats)
            .finish()
    }
}

fn check_loaded_tile(
    source: &dyn ImageSource,
    tile: &ImageTile,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Result<(), TileError> {
    let reason = if tile.pixel_type() != source.pixel_type() {
        format!(
            "pixel type {} does not match source type {}",
            tile.pixel_type(),
            source.pixel_type()
        )
    } else if (tile.x(), tile.y(), tile.width(), tile.height()) != (x, y, width, height) {
        format!(
            "got {}x{} at ({}, {}), expected {width}x{height} at ({x}, {y})",
            tile.width(),
            tile.height(),
            tile.x(),
            tile.y()
        )
    } else {
        return Ok(());
    };
    Err(TileError::InvalidTile {
        image: source.repr(),
        reason,
    })
}

// =============================================================================
// Tests
// =============================================================================
