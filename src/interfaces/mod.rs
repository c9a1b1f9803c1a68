//! Boundary between the outside world and the application layer.

pub mod api;
pub mod csv;
