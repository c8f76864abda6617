//! Read-Through Cache Configuration
//!
//! The cache has no capacity or eviction knobs: entries live as long as the
//! cache does. The only tunable is how many segments the key space is split
//! into. Each segment is a separately locked map, so more segments means less
//! contention on the short bookkeeping critical sections.
//!
//! Segment count never affects correctness. Even with a single segment the
//! lock is released while the data source is being called, so slow fetches
//! for different keys still run in parallel.
//!
//! # Examples
//!
//! ```
//! use dbcache::config::ReadThroughCacheConfig;
//!
//! // Segment count derived from available parallelism
//! let config = ReadThroughCacheConfig::new();
//! assert!(config.segments() >= 4);
//!
//! // Explicit segment count
//! let config = ReadThroughCacheConfig::new().with_segments(32);
//! assert_eq!(config.segments(), 32);
//! ```

use core::fmt;

/// Returns the default number of segments based on available parallelism.
fn default_segment_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get() * 4)
        .unwrap_or(16)
        .clamp(4, 64)
}

/// Configuration for a [`ReadThroughCache`](crate::ReadThroughCache).
///
/// # Optional Parameters (Builder Methods)
///
/// - `segments`: Number of independently locked segments
///   (default: `available_parallelism * 4`, clamped to `4..=64`)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReadThroughCacheConfig {
    segments: usize,
}

impl ReadThroughCacheConfig {
    /// Creates a configuration with the default segment count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: default_segment_count(),
        }
    }

    /// Sets the number of segments.
    ///
    /// Use a power of 2 for an even hash distribution.
    ///
    /// # Panics
    ///
    /// Panics if `segments` is 0.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        assert!(segments > 0, "segments must be > 0");
        self.segments = segments;
        self
    }

    /// Returns the number of segments.
    #[inline]
    pub fn segments(&self) -> usize {
        self.segments
    }
}

impl Default for ReadThroughCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadThroughCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughCacheConfig")
            .field("segments", &self.segments)
            .finish()
    }
}
