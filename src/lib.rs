//! Midweave: a curated library of Midjourney style references.
//!
//! The binary wires the `mw-*` crates together and exposes the library
//! through a small command-line surface.

pub mod bootstrap;
pub mod cli;
