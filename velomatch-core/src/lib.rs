//! Matching, snapping and aggregation of cycling infrastructure.
//!
//! Source ways from community mapping are matched onto the edges of an
//! authoritative target network. Each target edge is cut into fixed-length
//! segments, every segment takes the attributes of the best-aligned matched
//! way, and runs of equal attributes are merged back into aggregated edges.

pub mod aggregation;
mod error;
pub mod geometry;
pub mod matching;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod snapping;
pub mod translate;

pub use error::Error;
