//! Planar geometry helpers: vectors, polylines, buffers and a spatial index

pub mod buffer;
pub mod index;
pub mod polyline;
pub mod vector;

pub use buffer::Buffer;
pub use index::LineIndex;
