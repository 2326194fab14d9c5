//! Backing stores.
//!
//! An [`ImageSource`] produces fixed-size tiles on demand and persists the
//! ones the cache hands back as modified. Three stores ship with the crate:
//!
//! - [`MemorySource`]: row-major vector, any pixel type
//! - [`RawFileSource`]: uncompressed little-endian file with JSON metadata
//! - [`TemporaryFileSource`]: raw file deleted on drop
//!
//! Virtual sources that synthesize tiles live in [`crate::processing`].

mod memory;
mod metadata;
mod raw_file;
mod source;
mod temporary;

pub use memory::MemorySource;
pub use metadata::{Metadata, MetadataEntry, MetadataValue};
pub use raw_file::{RawFileSource, RAW_HEADER_SIZE, RAW_MAGIC};
pub(crate) use source::check_tile_bounds;
pub use source::ImageSource;
pub use temporary::TemporaryFileSource;
