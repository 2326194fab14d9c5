//! Tile cache integration tests.
//!
//! Tests verify:
//! - Tiles are shared while resident and loaded once under contention
//! - The byte budget holds and eviction follows insertion order
//! - Dirty tiles are saved on eviction, flush, checkpoint and drop
//! - Load and save failures leave the cache consistent

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use skyframe::{TileError, WriteableBufferedImage, WriteableImage};

use super::test_utils::{manager, shared, MockSource};

/// Bytes of a 4x4 `f32` tile.
const TILE_BYTES: usize = 4 * 4 * 4;

// =============================================================================
// Sharing and Loading
// =============================================================================

#[test]
fn test_same_tile_returns_same_instance() {
    let (mock, source) = shared(MockSource::new("p1", 8, 8));
    let manager = manager(4, 4, 1 << 20);

    let first = manager.tile_for_pixel(1, 1, &source).unwrap();
    let second = manager.tile_for_pixel(3, 2, &source).unwrap();
    let other = manager.tile_for_pixel(4, 0, &source).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!((other.x(), other.y()), (4, 0));
    assert_eq!(mock.load_count(), 2);
}

#[test]
fn test_edge_tiles_are_clipped() {
    let (_, source) = shared(MockSource::new("edge", 10, 6));
    let manager = manager(4, 4, 1 << 20);

    let tile = manager.tile_for_pixel(9, 5, &source).unwrap();
    assert_eq!((tile.x(), tile.y()), (8, 4));
    assert_eq!((tile.width(), tile.height()), (2, 2));
    assert_eq!(tile.value::<f32>(9, 5), 59.0);
}

#[test]
fn test_concurrent_misses_load_once() {
    let (mock, source) =
        shared(MockSource::new("p2", 16, 16).with_delay(Duration::from_millis(50)));
    let manager = manager(8, 8, 1 << 20);
    let callers = 8;
    let barrier = Barrier::new(callers);

    let tiles: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..callers)
            .map(|i| {
                let (manager, source, barrier) = (&manager, &source, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    manager.tile_for_pixel(i % 8, 7 - i % 8, source).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(mock.load_count(), 1);
    assert!(tiles.iter().all(|tile| Arc::ptr_eq(tile, &tiles[0])));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_concurrent_readers_of_distinct_tiles() {
    let (mock, source) = shared(MockSource::new("grid", 32, 32));
    let manager = manager(8, 8, 1 << 20);

    thread::scope(|scope| {
        for t in 0..4 {
            let (manager, source) = (&manager, &source);
            scope.spawn(move || {
                for y in 0..32 {
                    for x in (t * 8)..(t * 8 + 8) {
                        let tile = manager.tile_for_pixel(x, y, source).unwrap();
                        assert_eq!(tile.value::<f32>(x, y), (y * 32 + x) as f32);
                    }
                }
            });
        }
    });

    assert_eq!(mock.load_count(), 16);
    assert_eq!(manager.len(), 16);
}

#[test]
fn test_sources_are_keyed_by_identity() {
    let (_, a) = shared(MockSource::new("same", 4, 4));
    let (_, b) = shared(MockSource::new("same", 4, 4));
    let manager = manager(4, 4, 1 << 20);

    let ta = manager.tile_for_pixel(0, 0, &a).unwrap();
    let tb = manager.tile_for_pixel(0, 0, &b).unwrap();
    assert!(!Arc::ptr_eq(&ta, &tb));
    assert_eq!(manager.len(), 2);
}

// =============================================================================
// Budget and Eviction
// =============================================================================

#[test]
fn test_memory_stays_within_budget() {
    let (_, source) = shared(MockSource::new("p3", 16, 16));
    let budget = 3 * TILE_BYTES + 10;
    let manager = manager(4, 4, budget);

    // Deterministic scatter over the image
    let mut state = 7usize;
    for _ in 0..500 {
        state = (state * 1103515245 + 12345) % (1 << 31);
        let (x, y) = (state % 16, (state / 16) % 16);
        manager.tile_for_pixel(x, y, &source).unwrap();
        assert!(manager.memory_used() <= budget);
        assert!(manager.len() <= 3);
    }
    assert!(manager.stats().evictions > 0);
}

#[test]
fn test_oversized_tile_is_admitted_alone() {
    let (_, source) = shared(MockSource::new("big", 16, 8));
    let manager = manager(8, 8, 100);

    manager.tile_for_pixel(0, 0, &source).unwrap();
    assert_eq!(manager.len(), 1);
    assert_eq!(manager.memory_used(), 8 * 8 * 4);

    manager.tile_for_pixel(8, 0, &source).unwrap();
    assert_eq!(manager.len(), 1);
    assert!(!manager.contains(0, 0, &source));
    assert!(manager.contains(8, 0, &source));
}

#[test]
fn test_eviction_follows_insertion_order() {
    let (mock, source) = shared(MockSource::new("fifo", 16, 4));
    let manager = manager(4, 4, 3 * TILE_BYTES);

    for x in [0, 4, 8] {
        manager.tile_for_pixel(x, 0, &source).unwrap();
    }
    // A hit does not protect the oldest tile
    manager.tile_for_pixel(1, 1, &source).unwrap();
    manager.tile_for_pixel(12, 0, &source).unwrap();

    assert!(!manager.contains(0, 0, &source));
    for x in [4, 8, 12] {
        assert!(manager.contains(x, 0, &source));
    }
    assert_eq!(mock.load_count(), 4);

    let stats = manager.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.memory_used, 3 * TILE_BYTES);
}

#[test]
fn test_dirty_tile_saved_on_eviction() {
    let (mock, source) = shared(MockSource::new("evict", 8, 4));
    let manager = manager(4, 4, TILE_BYTES);

    let tile = manager.tile_for_pixel(2, 2, &source).unwrap();
    tile.set_value(2, 2, -1.0f32);
    assert_eq!(mock.stored(2, 2), 18.0);

    manager.tile_for_pixel(4, 0, &source).unwrap();
    assert_eq!(mock.saved(), vec![(0, 0)]);
    assert_eq!(mock.stored(2, 2), -1.0);
    assert!(!tile.is_modified());
    assert!(!tile.is_resident());
}

// =============================================================================
// Saving
// =============================================================================

#[test]
fn test_save_all_tiles_saves_each_dirty_tile_once() {
    let (mock, source) = shared(MockSource::new("p5", 8, 8));
    let manager = manager(4, 4, 1 << 20);
    let writer = WriteableBufferedImage::<f32>::with_manager(source.clone(), manager.clone());

    writer.set_value(0, 0, 100.0).unwrap();
    writer.set_value(1, 0, 101.0).unwrap();
    writer.set_value(5, 6, 102.0).unwrap();
    // Clean tile that is resident but never written
    manager.tile_for_pixel(4, 0, &source).unwrap();

    manager.save_all_tiles().unwrap();
    let mut saved = mock.saved();
    saved.sort();
    assert_eq!(saved, vec![(0, 0), (4, 4)]);
    assert_eq!(manager.len(), 3);
    for (x, y) in [(0, 0), (4, 0), (4, 4)] {
        assert!(!manager.tile_for_pixel(x, y, &source).unwrap().is_modified());
    }
    assert_eq!(mock.stored(5, 6), 102.0);

    manager.save_all_tiles().unwrap();
    assert_eq!(mock.saved().len(), 2);
}

#[test]
fn test_flush_saves_and_empties() {
    let (mock, source) = shared(MockSource::new("flush", 8, 8));
    let manager = manager(4, 4, 1 << 20);

    manager.tile_for_pixel(0, 0, &source).unwrap().set_value(3, 3, 7.5f32);
    manager.tile_for_pixel(7, 7, &source).unwrap();

    manager.flush().unwrap();
    assert!(manager.is_empty());
    assert_eq!(manager.memory_used(), 0);
    assert_eq!(mock.saved(), vec![(0, 0)]);
    assert_eq!(mock.stored(3, 3), 7.5);

    // Reloaded from the source afterwards
    let tile = manager.tile_for_pixel(3, 3, &source).unwrap();
    assert_eq!(tile.value::<f32>(3, 3), 7.5);
    assert_eq!(mock.load_count(), 3);
}

#[test]
fn test_set_options_flushes_first() {
    let (mock, source) = shared(MockSource::new("reconfigure", 8, 8));
    let manager = manager(4, 4, 1 << 20);
    manager.tile_for_pixel(1, 1, &source).unwrap().set_value(1, 1, 0.5f32);

    manager.set_options(2, 2, 1024).unwrap();
    assert!(manager.is_empty());
    assert_eq!(mock.saved(), vec![(0, 0)]);
    assert_eq!((manager.tile_width(), manager.tile_height()), (2, 2));
    assert_eq!(manager.max_memory(), 1024);

    let tile = manager.tile_for_pixel(3, 3, &source).unwrap();
    assert_eq!((tile.x(), tile.y(), tile.width(), tile.height()), (2, 2, 2, 2));
}

#[test]
fn test_drop_saves_dirty_tiles() {
    let (mock, source) = shared(MockSource::new("drop", 4, 4));
    let manager = manager(4, 4, 1 << 20);
    manager.tile_for_pixel(0, 0, &source).unwrap().set_value(0, 0, 42.0f32);

    drop(manager);
    assert_eq!(mock.saved(), vec![(0, 0)]);
    assert_eq!(mock.stored(0, 0), 42.0);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_load_inserts_nothing() {
    let (mock, source) = shared(MockSource::new("broken", 8, 8));
    let manager = manager(4, 4, 1 << 20);

    mock.set_fail_loads(true);
    let err = manager.tile_for_pixel(5, 1, &source).unwrap_err();
    match &err {
        TileError::Load { image, x, y, .. } => {
            assert_eq!(image, "Mock(broken)");
            assert_eq!((*x, *y), (4, 0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(manager.is_empty());

    mock.set_fail_loads(false);
    manager.tile_for_pixel(5, 1, &source).unwrap();
    assert_eq!(mock.load_count(), 2);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_failed_save_on_flush_drops_tile() {
    let (mock, source) = shared(MockSource::new("readonly", 8, 4));
    let manager = manager(4, 4, 1 << 20);

    let dirty = manager.tile_for_pixel(0, 0, &source).unwrap();
    dirty.set_value(0, 0, 9.0f32);
    manager.tile_for_pixel(4, 0, &source).unwrap();

    mock.set_fail_saves(true);
    let err = manager.flush().unwrap_err();
    assert!(matches!(err, TileError::Save { x: 0, y: 0, .. }));
    assert!(manager.is_empty());
    // Modifications are declared lost: no retry when the tile goes away
    assert!(!dirty.is_modified());
    mock.set_fail_saves(false);
    drop(dirty);
    assert!(mock.saved().is_empty());
    assert_eq!(mock.stored(0, 0), 0.0);
}

#[test]
fn test_failed_checkpoint_keeps_tile_dirty() {
    let (mock, source) = shared(MockSource::new("retry", 4, 4));
    let manager = manager(4, 4, 1 << 20);
    let tile = manager.tile_for_pixel(0, 0, &source).unwrap();
    tile.set_value(1, 1, 3.25f32);

    mock.set_fail_saves(true);
    assert!(manager.save_all_tiles().is_err());
    assert!(tile.is_modified());

    mock.set_fail_saves(false);
    manager.save_all_tiles().unwrap();
    assert!(!tile.is_modified());
    assert_eq!(mock.saved(), vec![(0, 0)]);
    assert_eq!(mock.stored(1, 1), 3.25);
}

#[test]
#[should_panic(expected = "outside")]
fn test_pixel_outside_source_panics() {
    let (_, source) = shared(MockSource::new("small", 4, 4));
    let manager = manager(4, 4, 1 << 20);
    let _ = manager.tile_for_pixel(4, 0, &source);
}

#[test]
fn test_flush_releases_sources() {
    let (mock, source) = shared(MockSource::new("refs", 4, 4));
    let manager = manager(4, 4, 1 << 20);
    manager.tile_for_pixel(0, 0, &source).unwrap();
    assert_eq!(Arc::strong_count(&mock), 3);
    manager.flush().unwrap();
    // Only the test handles remain once the cache is empty
    assert_eq!(Arc::strong_count(&mock), 2);
}
