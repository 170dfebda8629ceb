//! # Domain
//!
//! Pure types with minimal dependencies (`serde`, `bitflags`).
//! No I/O, networking, or heavy logic lives here.

pub mod access;
pub mod config;
pub mod constants;
pub mod registry;
