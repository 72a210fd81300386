//! Models Module - Data Structures
//!
//! Error taxonomy and the response payloads shared by services, cache and
//! the HTTP edge.

pub mod errors;
pub mod responses;

pub use errors::*;
pub use responses::*;
