//! Conversions from remote-call failures into domain errors.

pub mod conversions;

pub use conversions::{transport_error, IntoFeiraError};
