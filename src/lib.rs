//! File formats around `velomatch_core`: GeoJSON inputs and outputs, manual
//! override lists and audit tables.

mod error;
pub mod io;

pub use error::Error;
pub use velomatch_core;
