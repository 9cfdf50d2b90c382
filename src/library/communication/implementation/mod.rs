//! Implementations of traits from this module using third-party crates

pub mod redis;
