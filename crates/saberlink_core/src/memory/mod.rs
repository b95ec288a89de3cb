//! # Memory Management
//!
//! Pre-allocated pools for game objects that are spawned every few frames.
//! During gameplay pooled objects are recycled, never created or destroyed.

mod pool;

pub use pool::{ObjectPool, PoolHandle, Poolable};
