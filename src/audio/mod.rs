// Audio module - source metadata, cover art and level analysis

pub mod cover;
pub mod levels;
pub mod metadata;

pub use cover::transplant;
pub use levels::measure_levels;
pub use metadata::{SourceInfo, TrackMetadata, probe_source};
