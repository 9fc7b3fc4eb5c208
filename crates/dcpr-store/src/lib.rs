//! DCPR Store - Vector index port and adapters
//!
//! This crate defines the vector index port used by retrieval, an in-memory
//! cosine-similarity implementation, its on-disk persistence format, and a
//! shared handle that lets a rebuilt index replace the serving one.

pub mod memory;
pub mod persist;
pub mod ports;
pub mod shared;

pub use memory::MemoryVectorIndex;
pub use persist::{load_index, save_index, IndexManifest};
pub use ports::VectorIndex;
pub use shared::SharedIndex;
