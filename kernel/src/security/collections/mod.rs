//! Security Collections
//!
//! Bounded data structures for security bookkeeping:
//! - LruCache: AVC decision caching
//! - RingBuffer: overwrite-oldest audit trail

pub mod lru_cache;
pub mod ring_buffer;

pub use lru_cache::LruCache;
pub use ring_buffer::RingBuffer;
