//! Demo data used by `stepwise demo`.

pub mod sample;

pub use sample::*;
